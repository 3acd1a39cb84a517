//! Ideal base OT functionality.
//!
//! Choices travel in the clear and the sender hands over only the chosen
//! strings. Offers no privacy at all; it exists to isolate the cost of the
//! extension from the cost of public key operations.

use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::BaseOt;
use crate::{Error, Result};

/// The ideal OT functionality
#[derive(Debug, Clone, Copy, Default)]
pub struct IdealBaseOt;

impl IdealBaseOt {
    /// Create a new ideal OT functionality
    pub fn new() -> Self {
        Self
    }
}

/// Choices forwarded to the sender
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdealChoices {
    pub choices: Vec<bool>,
}

/// Chosen strings, already in the clear
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdealTransfer {
    pub chosen: Vec<Vec<u8>>,
}

impl BaseOt for IdealBaseOt {
    type SenderState = ();
    type SenderSetup = ();
    type ChooserState = usize;
    type ChooserKeys = IdealChoices;
    type Ciphertexts = IdealTransfer;

    fn sender_setup<R: RngCore + CryptoRng>(&self, _rng: &mut R) -> Result<((), ())> {
        Ok(((), ()))
    }

    fn choose<R: RngCore + CryptoRng>(
        &self,
        _setup: &(),
        choices: &[bool],
        _rng: &mut R,
    ) -> Result<(usize, IdealChoices)> {
        Ok((
            choices.len(),
            IdealChoices {
                choices: choices.to_vec(),
            },
        ))
    }

    fn encrypt(
        &self,
        _state: &(),
        keys: &IdealChoices,
        pairs: &[(&[u8], &[u8])],
    ) -> Result<IdealTransfer> {
        if keys.choices.len() != pairs.len() {
            return Err(Error::LengthMismatch {
                expected: pairs.len(),
                actual: keys.choices.len(),
            });
        }

        let chosen = pairs
            .iter()
            .zip(&keys.choices)
            .map(|((m0, m1), &choice)| if choice { m1.to_vec() } else { m0.to_vec() })
            .collect();

        Ok(IdealTransfer { chosen })
    }

    fn decrypt(&self, count: &usize, ciphertexts: &IdealTransfer) -> Result<Vec<Vec<u8>>> {
        if ciphertexts.chosen.len() != *count {
            return Err(Error::LengthMismatch {
                expected: *count,
                actual: ciphertexts.chosen.len(),
            });
        }
        Ok(ciphertexts.chosen.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oblivious::test_utils::{assert_chosen, run_base_ot};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_ideal_ot_transfers_chosen_strings() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let pairs: Vec<(Vec<u8>, Vec<u8>)> = (0u8..16).map(|i| (vec![i; 4], vec![!i; 4])).collect();
        let choices: Vec<bool> = (0..16).map(|i| i % 3 == 0).collect();

        let output = run_base_ot(&IdealBaseOt::new(), &pairs, &choices, &mut rng).unwrap();
        assert_chosen(&pairs, &choices, &output);
    }

    #[test]
    fn test_ideal_ot_count_mismatch() {
        let ot = IdealBaseOt::new();
        let keys = IdealChoices {
            choices: vec![true],
        };
        let m = [0u8; 2];
        assert!(ot.encrypt(&(), &keys, &[]).is_err());
        assert!(ot.encrypt(&(), &keys, &[(&m[..], &m[..])]).is_ok());

        let transfer = IdealTransfer { chosen: vec![] };
        assert!(matches!(
            ot.decrypt(&1, &transfer),
            Err(Error::LengthMismatch { expected: 1, actual: 0 })
        ));
    }
}
