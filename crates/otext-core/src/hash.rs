//! Correlation-robust hash
//!
//! Compresses a κ-bit matrix row and its OT index into an l-bit pad. The sender
//! evaluates it on correlated inputs (`q_j` and `q_j ⊕ s`), so SHA-256 is
//! modelled as correlation robust here.

use sha2::{Digest, Sha256};

use crate::{
    bits::pack_bits,
    types::{byte_len, tail_mask},
    Error, Result,
};

const CRH_TAG: &[u8] = b"otext/crh/v1";

/// Hash a row of bits (one bit per byte) for OT index `index` into an
/// `out_bits`-bit pad
///
/// The pad has `ceil(out_bits / 8)` bytes; bits past `out_bits` are zero.
pub fn hash_row(row: &[u8], index: usize, out_bits: usize) -> Result<Vec<u8>> {
    if out_bits == 0 {
        return Err(Error::InvalidLength(0));
    }
    let packed = pack_bits(row);
    let len = byte_len(out_bits);

    let mut pad = Vec::with_capacity(len + Sha256::output_size());
    let mut counter = 0u32;
    while pad.len() < len {
        let digest = Sha256::new()
            .chain_update(CRH_TAG)
            .chain_update((index as u64).to_be_bytes())
            .chain_update((row.len() as u32).to_be_bytes())
            .chain_update(&packed)
            .chain_update(counter.to_be_bytes())
            .finalize();
        pad.extend_from_slice(&digest);
        counter += 1;
    }
    pad.truncate(len);

    if let Some(last) = pad.last_mut() {
        *last &= tail_mask(out_bits);
    }
    Ok(pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_length_and_determinism() {
        let row = vec![1, 0, 1, 1, 0, 0, 1, 0];
        for bits in [1usize, 7, 8, 9, 255, 256, 257, 1000] {
            let a = hash_row(&row, 3, bits).unwrap();
            assert_eq!(a.len(), byte_len(bits));
            assert_eq!(a, hash_row(&row, 3, bits).unwrap());
        }
    }

    #[test]
    fn test_hash_masks_tail_bits() {
        let row = vec![1; 16];
        for index in 0..32 {
            let pad = hash_row(&row, index, 12).unwrap();
            assert_eq!(pad[1] & 0xF0, 0);
        }
    }

    #[test]
    fn test_hash_separates_indices_and_rows() {
        let row = vec![0, 1, 1, 0];
        let mut flipped = row.clone();
        flipped[0] ^= 1;

        assert_ne!(hash_row(&row, 0, 128).unwrap(), hash_row(&row, 1, 128).unwrap());
        assert_ne!(hash_row(&row, 0, 128).unwrap(), hash_row(&flipped, 0, 128).unwrap());
    }

    #[test]
    fn test_hash_zero_length() {
        assert!(matches!(hash_row(&[1], 0, 0), Err(Error::InvalidLength(0))));
    }
}
