//! Seed expansion
//!
//! Expands a κ-bit seed into an arbitrarily long bit string by hashing the
//! seed together with a running block counter under SHA-256 and concatenating
//! the digests.

use sha2::{Digest, Sha256};

use crate::{types::Seed, Error, Result};

const PRG_TAG: &[u8] = b"otext/prg/v1";

/// Expand `seed` into `bit_len` pseudorandom bits (one bit per byte)
pub fn expand(seed: &Seed, bit_len: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; bit_len];
    expand_into(seed, &mut out)?;
    Ok(out)
}

/// Expand `seed` into `out`, writing one bit per byte
pub fn expand_into(seed: &Seed, out: &mut [u8]) -> Result<()> {
    if out.is_empty() {
        return Err(Error::InvalidLength(0));
    }

    for (counter, chunk) in out.chunks_mut(Sha256::output_size() * 8).enumerate() {
        let block = Sha256::new()
            .chain_update(PRG_TAG)
            .chain_update((seed.as_bytes().len() as u32).to_be_bytes())
            .chain_update(seed.as_bytes())
            .chain_update((counter as u64).to_be_bytes())
            .finalize();

        for (i, bit) in chunk.iter_mut().enumerate() {
            *bit = (block[i / 8] >> (7 - (i % 8))) & 1;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn seed(value: u8) -> Seed {
        Seed::from_bytes(vec![0, 0, 0, value], 32).unwrap()
    }

    #[test]
    fn test_prg_lengths_and_determinism() {
        for value in [0u8, 1, 123, 200] {
            for len in [1usize, 10, 50, 256, 257, 500, 2048] {
                let a = expand(&seed(value), len).unwrap();
                let b = expand(&seed(value), len).unwrap();
                assert_eq!(a.len(), len);
                assert_eq!(a, b);
                assert!(a.iter().all(|&bit| bit <= 1));
            }
        }
    }

    #[test]
    fn test_prg_prefix_consistency() {
        let short = expand(&seed(9), 300).unwrap();
        let long = expand(&seed(9), 1000).unwrap();
        assert_eq!(short[..], long[..300]);
    }

    #[test]
    fn test_prg_distinct_seeds() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let a = Seed::random(&mut rng, 128);
        let b = Seed::random(&mut rng, 128);
        assert_ne!(expand(&a, 512).unwrap(), expand(&b, 512).unwrap());
    }

    #[test]
    fn test_prg_zero_length() {
        assert!(matches!(expand(&seed(1), 0), Err(Error::InvalidLength(0))));
    }
}
