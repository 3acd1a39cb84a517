//! Bit matrices and bit packing helpers

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Error, Result};

/// A row-major bit matrix storing one bit per byte
///
/// Every element is `0` or `1`. Matrices hold secret correlations (T, Q), so
/// they are wiped when dropped. Deserialization goes through
/// [`BitMatrix::from_bits`], so a received matrix always has `rows * cols`
/// elements.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(try_from = "RawBitMatrix")]
pub struct BitMatrix {
    rows: usize,
    cols: usize,
    bits: Vec<u8>,
}

impl BitMatrix {
    /// All-zero matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            bits: vec![0u8; rows * cols],
        }
    }

    /// Build a matrix from a flat row-major buffer of 0/1 values
    pub fn from_bits(rows: usize, cols: usize, bits: Vec<u8>) -> Result<Self> {
        let expected = rows.checked_mul(cols).ok_or_else(|| {
            Error::InvalidConfig(format!("Matrix {}x{} is too large", rows, cols))
        })?;
        if bits.len() != expected {
            return Err(Error::LengthMismatch {
                expected,
                actual: bits.len(),
            });
        }
        if let Some(pos) = bits.iter().position(|&b| b > 1) {
            return Err(Error::InvalidConfig(format!(
                "Matrix element {} is not a bit",
                pos
            )));
        }
        Ok(Self { rows, cols, bits })
    }

    /// Build a matrix from equally long rows
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut bits = Vec::with_capacity(n_rows * n_cols);
        for row in &rows {
            if row.len() != n_cols {
                return Err(Error::LengthMismatch {
                    expected: n_cols,
                    actual: row.len(),
                });
            }
            bits.extend_from_slice(row);
        }
        Self::from_bits(n_rows, n_cols, bits)
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Element at (row, col)
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.bits[row * self.cols + col]
    }

    /// Set the element at (row, col)
    pub fn set(&mut self, row: usize, col: usize, bit: u8) {
        self.bits[row * self.cols + col] = bit & 1;
    }

    /// Row `index` as a slice of bits
    pub fn row(&self, index: usize) -> &[u8] {
        &self.bits[index * self.cols..(index + 1) * self.cols]
    }

    /// Row `index` as a mutable slice of bits
    pub fn row_mut(&mut self, index: usize) -> &mut [u8] {
        &mut self.bits[index * self.cols..(index + 1) * self.cols]
    }

    /// Iterate over rows
    pub fn iter_rows(&self) -> std::slice::Chunks<'_, u8> {
        // chunks(0) panics; an empty matrix has no rows to yield
        self.bits.chunks(self.cols.max(1))
    }

    /// Flat row-major storage
    pub fn as_bits(&self) -> &[u8] {
        &self.bits
    }

    /// Fail unless the matrix has the given shape
    pub fn expect_shape(&self, rows: usize, cols: usize) -> Result<()> {
        if self.shape() != (rows, cols) {
            return Err(Error::DimensionMismatch {
                expected: (rows, cols),
                actual: self.shape(),
            });
        }
        Ok(())
    }
}

/// Unchecked wire form of [`BitMatrix`]
#[derive(Deserialize)]
struct RawBitMatrix {
    rows: usize,
    cols: usize,
    bits: Vec<u8>,
}

impl TryFrom<RawBitMatrix> for BitMatrix {
    type Error = Error;

    fn try_from(raw: RawBitMatrix) -> Result<Self> {
        Self::from_bits(raw.rows, raw.cols, raw.bits)
    }
}

impl std::fmt::Debug for BitMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitMatrix")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish_non_exhaustive()
    }
}

/// XOR `other` into `acc` element-wise
pub(crate) fn xor_in_place(acc: &mut [u8], other: &[u8]) {
    for (a, b) in acc.iter_mut().zip(other) {
        *a ^= b;
    }
}

/// Pack bits (one per byte) into bytes, MSB first
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; (bits.len() + 7) / 8];
    for (i, bit) in bits.iter().enumerate() {
        bytes[i / 8] |= (bit & 1) << (7 - (i % 8));
    }
    bytes
}

/// Unpack the first `len` bits of `bytes`, MSB first
pub fn unpack_bits(bytes: &[u8], len: usize) -> Vec<u8> {
    (0..len).map(|i| (bytes[i / 8] >> (7 - (i % 8))) & 1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows() {
        let m = BitMatrix::from_rows(vec![vec![1, 0, 1], vec![0, 1, 1]]).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.get(1, 2), 1);
        assert_eq!(m.row(0), &[1, 0, 1]);
        assert_eq!(m.iter_rows().count(), 2);
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = BitMatrix::from_rows(vec![vec![1, 0], vec![1]]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_rejects_non_bits() {
        assert!(BitMatrix::from_bits(1, 2, vec![0, 2]).is_err());
    }

    #[test]
    fn test_deserialize_checks_elements() {
        let m: BitMatrix =
            serde_json::from_str(r#"{"rows":2,"cols":2,"bits":[1,0,0,1]}"#).unwrap();
        assert_eq!(m.row(1), &[0, 1]);

        let err = serde_json::from_str::<BitMatrix>(r#"{"rows":8,"cols":8,"bits":[]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("Length mismatch: expected 64, got 0"));

        assert!(serde_json::from_str::<BitMatrix>(r#"{"rows":1,"cols":2,"bits":[0,7]}"#).is_err());
        assert!(serde_json::from_str::<BitMatrix>(
            r#"{"rows":18446744073709551615,"cols":2,"bits":[]}"#
        )
        .is_err());
    }

    #[test]
    fn test_expect_shape() {
        let m = BitMatrix::zeros(4, 8);
        assert!(m.expect_shape(4, 8).is_ok());
        assert!(matches!(
            m.expect_shape(8, 4),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_pack_unpack() {
        let bits = vec![1, 0, 1, 1, 0, 0, 0, 1, 1, 1];
        let packed = pack_bits(&bits);
        assert_eq!(packed, vec![0b1011_0001, 0b1100_0000]);
        assert_eq!(unpack_bits(&packed, bits.len()), bits);
    }
}
