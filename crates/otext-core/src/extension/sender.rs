//! Extension sender
//!
//! Holds the message pairs, plays the base OT chooser with its secret mask s,
//! rebuilds Q from the received U and masks every message pair.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::debug;
use zeroize::Zeroizing;

use super::{transpose_with, MaskedCiphertextPair, UMatrix};
use crate::{
    bits::{xor_in_place, BitMatrix},
    hash::hash_row,
    oblivious::BaseOt,
    prg,
    types::{tail_mask, MatrixStrategy, MessagePair, ProtocolConfig, Seed},
    Error, Result,
};

enum Phase<B: BaseOt> {
    Idle,
    RandomMaskChosen {
        mask: Zeroizing<Vec<u8>>,
    },
    KeysSent {
        mask: Zeroizing<Vec<u8>>,
        base: B::ChooserState,
    },
    SeedsDecrypted {
        mask: Zeroizing<Vec<u8>>,
        seeds: Vec<Seed>,
    },
    MatrixReconstructed {
        mask: Zeroizing<Vec<u8>>,
        q: BitMatrix,
    },
    Done,
    Aborted,
}

impl<B: BaseOt> Phase<B> {
    fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::RandomMaskChosen { .. } => "RandomMaskChosen",
            Phase::KeysSent { .. } => "KeysSent",
            Phase::SeedsDecrypted { .. } => "SeedsDecrypted",
            Phase::MatrixReconstructed { .. } => "MatrixReconstructed",
            Phase::Done => "Done",
            Phase::Aborted => "Aborted",
        }
    }
}

/// OT extension sender
pub struct Sender<B: BaseOt> {
    config: ProtocolConfig,
    base_ot: B,
    messages: Vec<MessagePair>,
    rng: ChaCha20Rng,
    phase: Phase<B>,
}

impl<B: BaseOt> Sender<B> {
    /// Create a sender offering `messages`, one pair per OT instance
    ///
    /// Every message must be exactly `ceil(l / 8)` bytes with the bits past l
    /// cleared.
    pub fn new(config: ProtocolConfig, base_ot: B, messages: Vec<MessagePair>) -> Result<Self> {
        Self::with_rng(config, base_ot, messages, ChaCha20Rng::from_entropy())
    }

    /// Create a sender whose randomness is derived from `seed`
    pub fn new_with_seed(
        config: ProtocolConfig,
        base_ot: B,
        messages: Vec<MessagePair>,
        seed: [u8; 32],
    ) -> Result<Self> {
        Self::with_rng(config, base_ot, messages, ChaCha20Rng::from_seed(seed))
    }

    fn with_rng(
        config: ProtocolConfig,
        base_ot: B,
        messages: Vec<MessagePair>,
        rng: ChaCha20Rng,
    ) -> Result<Self> {
        if messages.is_empty() {
            return Err(Error::EmptyInput("message pairs"));
        }
        config.validate_count(messages.len())?;

        let len = config.message_bytes();
        let mask = tail_mask(config.message_bits);
        for (j, pair) in messages.iter().enumerate() {
            for message in [&pair.message0, &pair.message1] {
                if message.len() != len {
                    return Err(Error::InvalidConfig(format!(
                        "Message {} has {} bytes, expected {}",
                        j,
                        message.len(),
                        len
                    )));
                }
                if message.last().map_or(false, |last| last & !mask != 0) {
                    return Err(Error::InvalidConfig(format!(
                        "Message {} is longer than {} bits",
                        j, config.message_bits
                    )));
                }
            }
        }

        Ok(Self {
            config,
            base_ot,
            messages,
            rng,
            phase: Phase::Idle,
        })
    }

    /// Number of OT instances m
    pub fn count(&self) -> usize {
        self.messages.len()
    }

    /// Current protocol phase
    pub fn phase(&self) -> &'static str {
        self.phase.name()
    }

    /// Sample the κ-bit mask s
    pub fn choose_random_mask(&mut self) -> Result<()> {
        self.take_phase("Idle")?;
        let mask = (0..self.config.security_parameter)
            .map(|_| self.rng.gen::<bool>() as u8)
            .collect();
        self.phase = Phase::RandomMaskChosen {
            mask: Zeroizing::new(mask),
        };
        Ok(())
    }

    /// Base OT chooser keys selecting seed_{s_i} of every pair
    pub fn choose_keys(&mut self, setup: &B::SenderSetup) -> Result<B::ChooserKeys> {
        let Phase::RandomMaskChosen { mask } = self.take_phase("RandomMaskChosen")? else {
            return Err(self.unexpected("RandomMaskChosen"));
        };

        let choices: Vec<bool> = mask.iter().map(|&bit| bit == 1).collect();
        let (base, keys) = self.base_ot.choose(setup, &choices, &mut self.rng)?;

        self.phase = Phase::KeysSent { mask, base };
        Ok(keys)
    }

    /// Open one seed of every pair
    pub fn decrypt_seeds(&mut self, ciphertexts: &B::Ciphertexts) -> Result<()> {
        let Phase::KeysSent { mask, base } = self.take_phase("KeysSent")? else {
            return Err(self.unexpected("KeysSent"));
        };

        let kappa = self.config.security_parameter;
        let opened = self.base_ot.decrypt(&base, ciphertexts)?;
        if opened.len() != kappa {
            return Err(Error::DecryptionFailure(format!(
                "Expected {} seeds, got {}",
                kappa,
                opened.len()
            )));
        }
        let seeds = opened
            .into_iter()
            .map(|bytes| Seed::from_bytes(bytes, kappa))
            .collect::<Result<Vec<_>>>()?;
        debug!(instances = seeds.len(), "Decrypted base OT seeds");

        self.phase = Phase::SeedsDecrypted { mask, seeds };
        Ok(())
    }

    /// Rebuild Q (m×κ) from the seeds, s and U
    pub fn reconstruct_q_matrix(&mut self, u: &UMatrix) -> Result<()> {
        if !matches!(self.phase, Phase::SeedsDecrypted { .. }) {
            return Err(self.unexpected("SeedsDecrypted"));
        }
        u.matrix
            .expect_shape(self.count(), self.config.security_parameter)?;

        let Phase::SeedsDecrypted { mask, seeds } = self.take_phase("SeedsDecrypted")? else {
            return Err(self.unexpected("SeedsDecrypted"));
        };

        let q = match self.config.strategy {
            MatrixStrategy::Naive => self.rebuild_naive(&mask, &seeds, &u.matrix)?,
            MatrixStrategy::Transpose | MatrixStrategy::Eklundh => {
                self.rebuild_transposed(&mask, &seeds, &u.matrix)?
            }
        };
        debug!(rows = q.rows(), cols = q.cols(), "Reconstructed Q matrix");

        self.phase = Phase::MatrixReconstructed { mask, q };
        Ok(())
    }

    /// Mask every message pair with H(j, q_j) and H(j, q_j ⊕ s)
    ///
    /// Q and s are wiped afterwards.
    pub fn make_ciphertexts(&mut self) -> Result<Vec<MaskedCiphertextPair>> {
        let Phase::MatrixReconstructed { mask, q } = self.take_phase("MatrixReconstructed")? else {
            return Err(self.unexpected("MatrixReconstructed"));
        };

        let bits = self.config.message_bits;
        let ciphertexts = self
            .messages
            .iter()
            .enumerate()
            .map(|(j, pair)| {
                let row = q.row(j);
                let pad0 = Zeroizing::new(hash_row(row, j, bits)?);
                let mut shifted = Zeroizing::new(row.to_vec());
                xor_in_place(&mut shifted, &mask);
                let pad1 = Zeroizing::new(hash_row(&shifted, j, bits)?);

                let mut y0 = pair.message0.clone();
                let mut y1 = pair.message1.clone();
                xor_in_place(&mut y0, &pad0);
                xor_in_place(&mut y1, &pad1);
                Ok(MaskedCiphertextPair { y0, y1 })
            })
            .collect::<Result<Vec<_>>>()?;

        self.phase = Phase::Done;
        debug!(pairs = ciphertexts.len(), "Masked message pairs");
        Ok(ciphertexts)
    }

    fn rebuild_naive(&self, mask: &[u8], seeds: &[Seed], u: &BitMatrix) -> Result<BitMatrix> {
        let m = self.count();
        let mut q = BitMatrix::zeros(m, self.config.security_parameter);

        for (i, (seed, &s_i)) in seeds.iter().zip(mask).enumerate() {
            let g = Zeroizing::new(prg::expand(seed, m)?);
            for j in 0..m {
                q.set(j, i, g[j] ^ (s_i & u.get(j, i)));
            }
        }
        Ok(q)
    }

    fn rebuild_transposed(&self, mask: &[u8], seeds: &[Seed], u: &BitMatrix) -> Result<BitMatrix> {
        let m = self.count();
        let u_cols = transpose_with(u, &self.config)?;
        let mut q_cols = BitMatrix::zeros(self.config.security_parameter, m);

        for (i, (seed, &s_i)) in seeds.iter().zip(mask).enumerate() {
            let row = q_cols.row_mut(i);
            prg::expand_into(seed, row)?;
            for (q, bit) in row.iter_mut().zip(u_cols.row(i)) {
                *q ^= s_i & bit;
            }
        }

        transpose_with(&q_cols, &self.config)
    }

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
    pub(crate) fn q_matrix(&self) -> Option<&BitMatrix> {
        match &self.phase {
            Phase::MatrixReconstructed { q, .. } => Some(q),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn mask(&self) -> Option<&[u8]> {
        match &self.phase {
            Phase::MatrixReconstructed { mask, .. } => Some(mask.as_slice()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oblivious::ideal::IdealTransfer;
    use crate::oblivious::IdealBaseOt;
    use crate::ErrorKind;

    fn messages(count: usize) -> Vec<MessagePair> {
        (0..count as u8)
            .map(|i| MessagePair::new(vec![i, 0], vec![0, i]))
            .collect()
    }

    fn sender(count: usize) -> Sender<IdealBaseOt> {
        let config = ProtocolConfig::new(8, 16).unwrap();
        Sender::new_with_seed(config, IdealBaseOt::new(), messages(count), [3; 32]).unwrap()
    }

    #[test]
    fn test_sender_rejects_bad_messages() {
        let config = ProtocolConfig::new(8, 12).unwrap();
        let ot = IdealBaseOt::new();

        let err = Sender::new(config.clone(), ot, vec![]).err().unwrap();
        assert!(matches!(err, Error::EmptyInput(_)));

        let mut pairs = vec![MessagePair::new(vec![0, 0x0F], vec![1, 0]); 8];
        assert!(Sender::new(config.clone(), ot, pairs.clone()).is_ok());

        pairs[2] = MessagePair::new(vec![0, 0x10], vec![1, 0]);
        let err = Sender::new(config.clone(), ot, pairs).err().unwrap();
        assert!(err.is_configuration());

        let pairs = vec![MessagePair::new(vec![0], vec![1, 0]); 8];
        assert!(Sender::new(config, ot, pairs).is_err());
    }

    #[test]
    fn test_sender_sequencing() {
        let mut sender = sender(8);
        assert_eq!(sender.make_ciphertexts().unwrap_err().kind(), ErrorKind::Sequencing);
        assert!(sender.choose_keys(&()).is_err());
        assert_eq!(sender.phase(), "Idle");

        sender.choose_random_mask().unwrap();
        assert!(sender.choose_random_mask().is_err());
        let keys = sender.choose_keys(&()).unwrap();
        assert_eq!(keys.choices.len(), 8);
        assert_eq!(sender.phase(), "KeysSent");

        let u = UMatrix {
            matrix: BitMatrix::zeros(8, 8),
        };
        assert!(sender.reconstruct_q_matrix(&u).is_err());
        assert_eq!(sender.phase(), "KeysSent");
    }

    #[test]
    fn test_sender_rejects_malformed_seeds() {
        let mut sender = sender(8);
        sender.choose_random_mask().unwrap();
        sender.choose_keys(&()).unwrap();

        // 2-byte seeds for κ = 8
        let transfer = IdealTransfer {
            chosen: vec![vec![0, 0]; 8],
        };
        let err = sender.decrypt_seeds(&transfer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecryptionFailure);
    }

    #[test]
    fn test_sender_rejects_wrong_u_shape() {
        let mut sender = sender(8);
        sender.choose_random_mask().unwrap();
        sender.choose_keys(&()).unwrap();
        sender
            .decrypt_seeds(&IdealTransfer {
                chosen: vec![vec![0x5A]; 8],
            })
            .unwrap();

        // U received with fewer elements than its claimed 8×8 shape
        let truncated = serde_json::json!({
            "matrix": { "rows": 8, "cols": 8, "bits": vec![0u8; 63] }
        });
        assert!(serde_json::from_value::<UMatrix>(truncated).is_err());
        assert_eq!(sender.phase(), "SeedsDecrypted");

        let transposed = UMatrix {
            matrix: BitMatrix::zeros(8, 16),
        };
        let err = sender.reconstruct_q_matrix(&transposed).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: (8, 8),
                actual: (8, 16)
            }
        ));
        assert_eq!(sender.phase(), "SeedsDecrypted");

        let wire = serde_json::to_string(&UMatrix {
            matrix: BitMatrix::zeros(8, 8),
        })
        .unwrap();
        let u: UMatrix = serde_json::from_str(&wire).unwrap();
        sender.reconstruct_q_matrix(&u).unwrap();
        let ciphertexts = sender.make_ciphertexts().unwrap();
        assert_eq!(ciphertexts.len(), 8);
        assert!(ciphertexts.iter().all(|c| c.y0.len() == 2 && c.y1.len() == 2));
        assert_eq!(sender.phase(), "Done");
    }
}
