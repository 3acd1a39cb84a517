//! Bit matrix transposition
//!
//! [`transpose`] implements Eklundh's algorithm: the matrix is cut into
//! square blocks whose side is the shorter dimension, each block is transposed
//! in place by swapping off-diagonal sub-blocks of doubling size, and the
//! transposed blocks are stitched back together. The block side must be a power
//! of two. [`transpose_naive`] is the element-by-element reference.

use tracing::{debug, trace};
use zeroize::Zeroize;

use crate::{bits::BitMatrix, Error, Result};

/// Transpose element by element
pub fn transpose_naive(matrix: &BitMatrix) -> BitMatrix {
    let (rows, cols) = matrix.shape();
    let mut out = BitMatrix::zeros(cols, rows);
    for r in 0..rows {
        for (c, &bit) in matrix.row(r).iter().enumerate() {
            out.set(c, r, bit);
        }
    }
    out
}

/// Transpose with Eklundh's algorithm
///
/// The shorter dimension is the block size and must be a power of two. When
/// the longer dimension is not a multiple of it, the last block is padded with
/// zeros and the padding is dropped from the result. With `multithreaded`, each
/// block is transposed as its own task and all tasks finish before reassembly.
pub fn transpose(matrix: &BitMatrix, multithreaded: bool) -> Result<BitMatrix> {
    let (rows, cols) = matrix.shape();
    let dim = rows.min(cols);
    if dim == 0 {
        return Err(Error::EmptyInput("matrix"));
    }
    if !dim.is_power_of_two() {
        return Err(Error::InvalidDimension(dim));
    }

    let wide = cols >= rows;
    let mut blocks = split_blocks(matrix, dim, wide);
    trace!(rows, cols, dim, blocks = blocks.len(), "Eklundh transpose");

    transpose_blocks(&mut blocks, dim, multithreaded);

    let out = assemble(&blocks, rows, cols, dim, wide);
    blocks.zeroize();
    Ok(out)
}

/// Transpose a flat row-major `dim`×`dim` block in place
pub fn transpose_square(block: &mut [u8], dim: usize) -> Result<()> {
    if dim == 0 || !dim.is_power_of_two() {
        return Err(Error::InvalidDimension(dim));
    }
    if block.len() != dim * dim {
        return Err(Error::LengthMismatch {
            expected: dim * dim,
            actual: block.len(),
        });
    }
    eklundh_in_place(block, dim);
    Ok(())
}

/// Swap the upper-right and lower-left `s`×`s` sub-blocks of every
/// `2s`×`2s` tile, for s = 1, 2, 4, .. until s reaches `dim`.
///
/// `dim` must be a power of two.
fn eklundh_in_place(block: &mut [u8], dim: usize) {
    let mut s = 1;
    while s < dim {
        for r0 in (0..dim).step_by(2 * s) {
            for c0 in (0..dim).step_by(2 * s) {
                for j in 0..s {
                    let upper = (r0 + j) * dim + c0 + s;
                    let lower = (r0 + s + j) * dim + c0;
                    let (head, tail) = block.split_at_mut(lower);
                    head[upper..upper + s].swap_with_slice(&mut tail[..s]);
                }
            }
        }
        s *= 2;
    }
}

fn transpose_blocks(blocks: &mut [Vec<u8>], dim: usize, multithreaded: bool) {
    #[cfg(feature = "multi-thread")]
    if multithreaded {
        use rayon::prelude::*;
        blocks
            .par_iter_mut()
            .for_each(|block| eklundh_in_place(block, dim));
        return;
    }

    #[cfg(not(feature = "multi-thread"))]
    if multithreaded {
        debug!("multi-thread feature disabled, transposing blocks sequentially");
    }

    for block in blocks.iter_mut() {
        eklundh_in_place(block, dim);
    }
}

/// Cut the matrix into zero-padded `dim`×`dim` blocks along its longer side
fn split_blocks(matrix: &BitMatrix, dim: usize, wide: bool) -> Vec<Vec<u8>> {
    let (rows, cols) = matrix.shape();
    let long = if wide { cols } else { rows };
    let count = (long + dim - 1) / dim;

    if long % dim != 0 {
        debug!(padding = dim - long % dim, "Padding final transpose block");
    }

    (0..count)
        .map(|b| {
            let mut block = vec![0u8; dim * dim];
            let start = b * dim;
            for r in 0..dim {
                let dst = &mut block[r * dim..(r + 1) * dim];
                if wide {
                    let end = (start + dim).min(cols);
                    dst[..end - start].copy_from_slice(&matrix.row(r)[start..end]);
                } else if start + r < rows {
                    dst.copy_from_slice(matrix.row(start + r));
                }
            }
            block
        })
        .collect()
}

/// Stitch transposed blocks into the `cols`×`rows` result, dropping padding
fn assemble(blocks: &[Vec<u8>], rows: usize, cols: usize, dim: usize, wide: bool) -> BitMatrix {
    let mut out = BitMatrix::zeros(cols, rows);
    for (b, block) in blocks.iter().enumerate() {
        let start = b * dim;
        for r in 0..dim {
            let src = &block[r * dim..(r + 1) * dim];
            if wide {
                // stack vertically
                if start + r < cols {
                    out.row_mut(start + r).copy_from_slice(src);
                }
            } else {
                // place side by side
                let end = (start + dim).min(rows);
                out.row_mut(r)[start..end].copy_from_slice(&src[..end - start]);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    fn random_matrix(rows: usize, cols: usize, seed: u64) -> BitMatrix {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let bits = (0..rows * cols).map(|_| rng.gen::<bool>() as u8).collect();
        BitMatrix::from_bits(rows, cols, bits).unwrap()
    }

    #[test]
    fn test_small_example() {
        let matrix = BitMatrix::from_rows(vec![vec![1, 0, 1, 0], vec![1, 1, 0, 0]]).unwrap();
        let expected =
            BitMatrix::from_rows(vec![vec![1, 1], vec![0, 1], vec![1, 0], vec![0, 0]]).unwrap();
        assert_eq!(transpose(&matrix, false).unwrap(), expected);
        assert_eq!(transpose_naive(&matrix), expected);
    }

    #[test]
    fn test_square_blocks_match_naive() {
        let mut dim = 1;
        while dim <= 64 {
            let matrix = random_matrix(dim, dim, dim as u64);
            assert_eq!(transpose(&matrix, false).unwrap(), transpose_naive(&matrix));
            dim *= 2;
        }
    }

    #[test]
    fn test_wide_and_tall_match_naive() {
        for (rows, cols) in [(8, 64), (8, 20), (16, 17), (32, 8), (20, 8), (4, 4), (1, 5), (5, 1)] {
            let matrix = random_matrix(rows, cols, (rows * 1000 + cols) as u64);
            let transposed = transpose(&matrix, false).unwrap();
            assert_eq!(transposed.shape(), (cols, rows));
            assert_eq!(transposed, transpose_naive(&matrix), "{}x{}", rows, cols);
        }
    }

    #[test]
    fn test_round_trip() {
        for (rows, cols) in [(128, 1024), (16, 100), (64, 64), (100, 32)] {
            let matrix = random_matrix(rows, cols, 42);
            let back = transpose(&transpose(&matrix, false).unwrap(), false).unwrap();
            assert_eq!(back, matrix);
        }
    }

    #[test]
    fn test_multithreaded_matches_sequential() {
        for (rows, cols) in [(128, 2048), (64, 1000), (300, 16)] {
            let matrix = random_matrix(rows, cols, 7);
            assert_eq!(
                transpose(&matrix, true).unwrap(),
                transpose(&matrix, false).unwrap()
            );
        }
    }

    #[test]
    fn test_one_row_is_unchanged() {
        let matrix = BitMatrix::from_rows(vec![vec![1, 0, 0, 1, 1]]).unwrap();
        let transposed = transpose(&matrix, false).unwrap();
        assert_eq!(transposed.as_bits(), matrix.as_bits());
        assert_eq!(transposed.shape(), (5, 1));
    }

    #[test]
    fn test_non_power_of_two_block_fails() {
        let matrix = random_matrix(3, 6, 1);
        let err = transpose(&matrix, false).unwrap_err();
        assert!(matches!(err, Error::InvalidDimension(3)));
        assert!(err.is_configuration());

        let mut block = vec![0u8; 9];
        assert!(transpose_square(&mut block, 3).unwrap_err().is_configuration());
    }

    #[test]
    fn test_transpose_square_in_place() {
        let matrix = random_matrix(16, 16, 5);
        let mut block = matrix.as_bits().to_vec();
        transpose_square(&mut block, 16).unwrap();
        assert_eq!(block, transpose_naive(&matrix).as_bits());
        assert!(transpose_square(&mut block, 8).is_err());
    }

    #[test]
    fn test_empty_matrix_fails() {
        assert!(transpose(&BitMatrix::zeros(0, 8), false).is_err());
    }
}
