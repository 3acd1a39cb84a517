//! Extension receiver
//!
//! Holds the selection bits, plays the base OT sender over κ seed pairs, builds
//! T and U, and finally opens the chosen message of every pair.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use subtle::{Choice, ConditionallySelectable};
use tracing::debug;
use zeroize::Zeroizing;

use super::{transpose_with, MaskedCiphertextPair, UMatrix};
use crate::{
    bits::{xor_in_place, BitMatrix},
    hash::hash_row,
    oblivious::BaseOt,
    prg,
    types::{tail_mask, MatrixStrategy, ProtocolConfig, SeedPair},
    Error, Result,
};

enum Phase<B: BaseOt> {
    Idle,
    SeedsChosen {
        seeds: Vec<SeedPair>,
        base: Option<B::SenderState>,
    },
    KeysReceived {
        seeds: Vec<SeedPair>,
        base: B::SenderState,
        keys: B::ChooserKeys,
    },
    SeedsEncrypted {
        seeds: Vec<SeedPair>,
    },
    MatrixBuilt {
        t: BitMatrix,
    },
    Done,
    Aborted,
}

impl<B: BaseOt> Phase<B> {
    fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::SeedsChosen { .. } => "SeedsChosen",
            Phase::KeysReceived { .. } => "KeysReceived",
            Phase::SeedsEncrypted { .. } => "SeedsEncrypted",
            Phase::MatrixBuilt { .. } => "MatrixBuilt",
            Phase::Done => "Done",
            Phase::Aborted => "Aborted",
        }
    }
}

/// OT extension receiver
pub struct Receiver<B: BaseOt> {
    config: ProtocolConfig,
    base_ot: B,
    selection_bits: Vec<bool>,
    rng: ChaCha20Rng,
    phase: Phase<B>,
}

impl<B: BaseOt> Receiver<B> {
    /// Create a receiver for `selection_bits`, one per OT instance
    pub fn new(config: ProtocolConfig, base_ot: B, selection_bits: Vec<bool>) -> Result<Self> {
        Self::with_rng(config, base_ot, selection_bits, ChaCha20Rng::from_entropy())
    }

    /// Create a receiver whose randomness is derived from `seed`
    pub fn new_with_seed(
        config: ProtocolConfig,
        base_ot: B,
        selection_bits: Vec<bool>,
        seed: [u8; 32],
    ) -> Result<Self> {
        Self::with_rng(config, base_ot, selection_bits, ChaCha20Rng::from_seed(seed))
    }

    fn with_rng(
        config: ProtocolConfig,
        base_ot: B,
        selection_bits: Vec<bool>,
        rng: ChaCha20Rng,
    ) -> Result<Self> {
        if selection_bits.is_empty() {
            return Err(Error::EmptyInput("selection bits"));
        }
        config.validate_count(selection_bits.len())?;

        Ok(Self {
            config,
            base_ot,
            selection_bits,
            rng,
            phase: Phase::Idle,
        })
    }

    /// Number of OT instances m
    pub fn count(&self) -> usize {
        self.selection_bits.len()
    }

    /// Current protocol phase
    pub fn phase(&self) -> &'static str {
        self.phase.name()
    }

    /// Sample κ independent seed pairs
    pub fn choose_seeds(&mut self) -> Result<()> {
        self.take_phase("Idle")?;
        let bits = self.config.security_parameter;
        let seeds = (0..bits)
            .map(|_| SeedPair::random(&mut self.rng, bits))
            .collect();
        self.phase = Phase::SeedsChosen { seeds, base: None };
        Ok(())
    }

    /// Base OT setup message for the sender's chooser role
    pub fn public_material(&mut self) -> Result<B::SenderSetup> {
        match &mut self.phase {
            Phase::SeedsChosen { base: base @ None, .. } => {
                let (state, setup) = self.base_ot.sender_setup(&mut self.rng)?;
                *base = Some(state);
                Ok(setup)
            }
            other => Err(Error::InvalidState {
                expected: "SeedsChosen",
                actual: other.name(),
            }),
        }
    }

    /// Accept the sender's base OT keys
    pub fn receive_keys(&mut self, keys: B::ChooserKeys) -> Result<()> {
        match self.take_phase("SeedsChosen")? {
            Phase::SeedsChosen {
                seeds,
                base: Some(base),
            } => {
                self.phase = Phase::KeysReceived { seeds, base, keys };
                Ok(())
            }
            Phase::SeedsChosen { seeds, base: None } => {
                self.phase = Phase::SeedsChosen { seeds, base: None };
                Err(Error::InvalidState {
                    expected: "public material sent",
                    actual: "SeedsChosen",
                })
            }
            _ => Err(self.unexpected("SeedsChosen")),
        }
    }

    /// Encrypt seed pair i under the sender's key i
    pub fn encrypt_seeds(&mut self) -> Result<B::Ciphertexts> {
        let Phase::KeysReceived { seeds, base, keys } = self.take_phase("KeysReceived")? else {
            return Err(self.unexpected("KeysReceived"));
        };

        let ciphertexts = {
            let pairs: Vec<(&[u8], &[u8])> = seeds
                .iter()
                .map(|pair| (pair.seed0.as_bytes(), pair.seed1.as_bytes()))
                .collect();
            self.base_ot.encrypt(&base, &keys, &pairs)?
        };
        debug!(instances = seeds.len(), "Encrypted base OT seeds");

        self.phase = Phase::SeedsEncrypted { seeds };
        Ok(ciphertexts)
    }

    /// Compute T and U (both m×κ) and return U for the sender
    pub fn build_u_matrix(&mut self) -> Result<UMatrix> {
        let Phase::SeedsEncrypted { seeds } = self.take_phase("SeedsEncrypted")? else {
            return Err(self.unexpected("SeedsEncrypted"));
        };

        let (t, u) = match self.config.strategy {
            MatrixStrategy::Naive => self.build_naive(&seeds)?,
            MatrixStrategy::Transpose | MatrixStrategy::Eklundh => self.build_transposed(&seeds)?,
        };
        debug!(rows = u.rows(), cols = u.cols(), "Built U matrix");

        self.phase = Phase::MatrixBuilt { t };
        Ok(UMatrix { matrix: u })
    }

    /// Open the chosen message of every pair
    ///
    /// Yields all m messages or fails; T and the selection bits are wiped
    /// either way once the ciphertexts have been checked against m.
    pub fn decrypt_ciphertexts(&mut self, pairs: &[MaskedCiphertextPair]) -> Result<Vec<Vec<u8>>> {
        if !matches!(self.phase, Phase::MatrixBuilt { .. }) {
            return Err(self.unexpected("MatrixBuilt"));
        }
        if pairs.len() != self.count() {
            return Err(Error::LengthMismatch {
                expected: self.count(),
                actual: pairs.len(),
            });
        }
        let Phase::MatrixBuilt { t } = self.take_phase("MatrixBuilt")? else {
            return Err(self.unexpected("MatrixBuilt"));
        };

        let bits = self.config.message_bits;
        let len = self.config.message_bytes();
        let mask = tail_mask(bits);

        let messages = pairs
            .iter()
            .zip(&self.selection_bits)
            .enumerate()
            .map(|(j, (pair, &bit))| {
                if pair.y0.len() != len || pair.y1.len() != len {
                    return Err(Error::DecryptionFailure(format!(
                        "Ciphertext {} is not {} bytes long",
                        j, len
                    )));
                }
                let pad = Zeroizing::new(hash_row(t.row(j), j, bits)?);
                let choice = Choice::from(bit as u8);
                let message: Vec<u8> = pair
                    .y0
                    .iter()
                    .zip(&pair.y1)
                    .zip(pad.iter())
                    .map(|((y0, y1), p)| u8::conditional_select(y0, y1, choice) ^ p)
                    .collect();
                if message.last().map_or(false, |last| last & !mask != 0) {
                    return Err(Error::DecryptionFailure(format!(
                        "Message {} has bits set beyond the message length",
                        j
                    )));
                }
                Ok(message)
            })
            .collect::<Result<Vec<_>>>();

        drop(t);
        self.selection_bits.iter_mut().for_each(|bit| *bit = false);
        let messages = messages?;

        self.phase = Phase::Done;
        debug!(messages = messages.len(), "Decrypted chosen messages");
        Ok(messages)
    }

    /// T and U filled column by column, straight in m×κ layout
    fn build_naive(&self, seeds: &[SeedPair]) -> Result<(BitMatrix, BitMatrix)> {
        let m = self.count();
        let kappa = self.config.security_parameter;
        let mut t = BitMatrix::zeros(m, kappa);
        let mut u = BitMatrix::zeros(m, kappa);

        for (i, pair) in seeds.iter().enumerate() {
            let g0 = Zeroizing::new(prg::expand(&pair.seed0, m)?);
            let g1 = Zeroizing::new(prg::expand(&pair.seed1, m)?);
            for (j, &bit) in self.selection_bits.iter().enumerate() {
                t.set(j, i, g0[j]);
                u.set(j, i, g0[j] ^ g1[j] ^ bit as u8);
            }
        }
        Ok((t, u))
    }

    /// T and U built as κ×m rows, one per seed pair, then transposed
    fn build_transposed(&self, seeds: &[SeedPair]) -> Result<(BitMatrix, BitMatrix)> {
        let m = self.count();
        let kappa = self.config.security_parameter;
        let choices: Zeroizing<Vec<u8>> =
            Zeroizing::new(self.selection_bits.iter().map(|&b| b as u8).collect());

        let mut t_cols = BitMatrix::zeros(kappa, m);
        let mut u_cols = BitMatrix::zeros(kappa, m);
        for (i, pair) in seeds.iter().enumerate() {
            prg::expand_into(&pair.seed0, t_cols.row_mut(i))?;
            let u_row = u_cols.row_mut(i);
            prg::expand_into(&pair.seed1, u_row)?;
            xor_in_place(u_row, t_cols.row(i));
            xor_in_place(u_row, &choices);
        }

        let t = transpose_with(&t_cols, &self.config)?;
        let u = transpose_with(&u_cols, &self.config)?;
        Ok((t, u))
    }

    /// Move out of the current phase if it is `expected`
    ///
    /// The receiver is left `Aborted` until the caller installs the next phase.
    fn take_phase(&mut self, expected: &'static str) -> Result<Phase<B>> {
        if self.phase.name() != expected {
            return Err(self.unexpected(expected));
        }
        Ok(std::mem::replace(&mut self.phase, Phase::Aborted))
    }

    fn unexpected(&self, expected: &'static str) -> Error {
        Error::InvalidState {
            expected,
            actual: self.phase.name(),
        }
    }

    #[cfg(test)]
    pub(crate) fn t_matrix(&self) -> Option<&BitMatrix> {
        match &self.phase {
            Phase::MatrixBuilt { t } => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oblivious::IdealBaseOt;
    use crate::ErrorKind;

    fn receiver(count: usize) -> Receiver<IdealBaseOt> {
        let config = ProtocolConfig::new(8, 16).unwrap();
        Receiver::new_with_seed(config, IdealBaseOt::new(), vec![true; count], [0; 32]).unwrap()
    }

    #[test]
    fn test_receiver_rejects_bad_inputs() {
        let config = ProtocolConfig::new(8, 16).unwrap();
        let err = Receiver::new(config.clone(), IdealBaseOt::new(), vec![]).err().unwrap();
        assert!(matches!(err, Error::EmptyInput(_)));

        // κ > m
        let err = Receiver::new(config, IdealBaseOt::new(), vec![false; 4]).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_receiver_sequencing() {
        let mut receiver = receiver(8);
        assert_eq!(receiver.phase(), "Idle");

        let err = receiver.build_u_matrix().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Sequencing);
        assert!(receiver.public_material().is_err());
        assert!(receiver.decrypt_ciphertexts(&[]).is_err());
        assert_eq!(receiver.phase(), "Idle");

        receiver.choose_seeds().unwrap();
        assert!(receiver.choose_seeds().is_err());
        assert!(receiver.encrypt_seeds().is_err());

        // keys before public material
        let keys = crate::oblivious::ideal::IdealChoices {
            choices: vec![false; 8],
        };
        assert!(receiver.receive_keys(keys.clone()).is_err());
        assert_eq!(receiver.phase(), "SeedsChosen");

        receiver.public_material().unwrap();
        assert!(receiver.public_material().is_err());
        receiver.receive_keys(keys).unwrap();
        receiver.encrypt_seeds().unwrap();
        assert_eq!(receiver.phase(), "SeedsEncrypted");

        let u = receiver.build_u_matrix().unwrap();
        assert_eq!(u.count(), 8);
        assert_eq!(u.matrix.shape(), (8, 8));
        assert!(receiver.t_matrix().is_some());
    }

    #[test]
    fn test_receiver_rejects_wrong_ciphertext_count() {
        let mut receiver = receiver(8);
        receiver.choose_seeds().unwrap();
        receiver.public_material().unwrap();
        receiver
            .receive_keys(crate::oblivious::ideal::IdealChoices {
                choices: vec![true; 8],
            })
            .unwrap();
        receiver.encrypt_seeds().unwrap();
        receiver.build_u_matrix().unwrap();

        let pair = MaskedCiphertextPair {
            y0: vec![0; 2],
            y1: vec![0; 2],
        };
        let err = receiver.decrypt_ciphertexts(&vec![pair.clone(); 7]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { expected: 8, actual: 7 }));
        // a count mismatch leaves T in place
        assert_eq!(receiver.phase(), "MatrixBuilt");

        let short = MaskedCiphertextPair {
            y0: vec![0; 1],
            y1: vec![0; 2],
        };
        let mut pairs = vec![pair; 8];
        pairs[3] = short;
        let err = receiver.decrypt_ciphertexts(&pairs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecryptionFailure);
        assert_eq!(receiver.phase(), "Aborted");
    }
}
