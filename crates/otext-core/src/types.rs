//! Core types for the OT extension protocol

use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Error, Result};

/// Default security parameter κ
pub const DEFAULT_SECURITY_PARAMETER: usize = 128;

/// Number of bytes needed to hold `bits` bits
pub fn byte_len(bits: usize) -> usize {
    (bits + 7) / 8
}

/// Mask keeping the valid bits of the last byte of a `bits`-bit string.
///
/// Bits are kept in the low positions, matching the masking of hash pads.
pub(crate) fn tail_mask(bits: usize) -> u8 {
    match bits % 8 {
        0 => 0xFF,
        rem => (1u8 << rem) - 1,
    }
}

/// How the receiver builds T/U and the sender rebuilds Q
///
/// All strategies produce bit-identical matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixStrategy {
    /// Fill the m×κ matrices column by column
    Naive,
    /// Build κ×m rows, then transpose element by element
    Transpose,
    /// Build κ×m rows, then transpose with Eklundh's block swap
    #[default]
    Eklundh,
}

impl std::fmt::Display for MatrixStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatrixStrategy::Naive => write!(f, "naive"),
            MatrixStrategy::Transpose => write!(f, "transpose"),
            MatrixStrategy::Eklundh => write!(f, "eklundh"),
        }
    }
}

impl std::str::FromStr for MatrixStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "naive" => Ok(MatrixStrategy::Naive),
            "transpose" => Ok(MatrixStrategy::Transpose),
            "eklundh" => Ok(MatrixStrategy::Eklundh),
            other => Err(Error::InvalidConfig(format!("Unknown strategy: {}", other))),
        }
    }
}

/// Parameters of one OT extension run
///
/// Immutable once a run starts; both parties must hold the same values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Security parameter κ (number of base OTs, seed bit length)
    pub security_parameter: usize,

    /// Bit length l of every transferred message
    pub message_bits: usize,

    /// Matrix construction strategy
    #[serde(default)]
    pub strategy: MatrixStrategy,

    /// Transpose Eklundh blocks concurrently
    #[serde(default)]
    pub multithreaded: bool,
}

impl ProtocolConfig {
    /// Create a new configuration with the default strategy
    pub fn new(security_parameter: usize, message_bits: usize) -> Result<Self> {
        let config = Self {
            security_parameter,
            message_bits,
            strategy: MatrixStrategy::default(),
            multithreaded: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the matrix strategy
    pub fn with_strategy(mut self, strategy: MatrixStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enable or disable the parallel transpose
    pub fn with_multithreaded(mut self, multithreaded: bool) -> Self {
        self.multithreaded = multithreaded;
        self
    }

    /// Check the parameters that do not depend on the message count
    pub fn validate(&self) -> Result<()> {
        if self.security_parameter == 0 {
            return Err(Error::InvalidConfig(
                "Security parameter must be positive".into(),
            ));
        }
        // κ is the Eklundh block dimension
        if !self.security_parameter.is_power_of_two() {
            return Err(Error::InvalidDimension(self.security_parameter));
        }
        if self.message_bits == 0 {
            return Err(Error::InvalidConfig("Message length must be positive".into()));
        }
        Ok(())
    }

    /// Check a message count m against this configuration
    pub fn validate_count(&self, count: usize) -> Result<()> {
        self.validate()?;
        if count == 0 {
            return Err(Error::EmptyInput("OT instances"));
        }
        if self.security_parameter > count {
            return Err(Error::InvalidConfig(format!(
                "Security parameter {} exceeds message count {}",
                self.security_parameter, count
            )));
        }
        Ok(())
    }

    /// Bytes per κ-bit seed
    pub fn seed_bytes(&self) -> usize {
        byte_len(self.security_parameter)
    }

    /// Bytes per l-bit message
    pub fn message_bytes(&self) -> usize {
        byte_len(self.message_bits)
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            security_parameter: DEFAULT_SECURITY_PARAMETER,
            message_bits: 128,
            strategy: MatrixStrategy::default(),
            multithreaded: false,
        }
    }
}

/// A κ-bit PRG seed
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Seed(Vec<u8>);

impl Seed {
    /// Sample a uniformly random `bits`-bit seed
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R, bits: usize) -> Self {
        let mut bytes = vec![0u8; byte_len(bits)];
        rng.fill_bytes(&mut bytes);
        if let Some(last) = bytes.last_mut() {
            *last &= tail_mask(bits);
        }
        Self(bytes)
    }

    /// Wrap decrypted seed bytes, checking they encode exactly `bits` bits
    pub fn from_bytes(bytes: Vec<u8>, bits: usize) -> Result<Self> {
        if bytes.len() != byte_len(bits) {
            return Err(Error::DecryptionFailure(format!(
                "Seed has {} bytes, expected {}",
                bytes.len(),
                byte_len(bits)
            )));
        }
        if let Some(last) = bytes.last() {
            if last & !tail_mask(bits) != 0 {
                return Err(Error::DecryptionFailure(
                    "Seed has bits set beyond the security parameter".into(),
                ));
            }
        }
        Ok(Self(bytes))
    }

    /// Raw seed bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// The two seeds of one base OT column, owned by the receiver
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SeedPair {
    /// Seed expanded into column i of T
    pub seed0: Seed,
    /// Seed masking column i of U
    pub seed1: Seed,
}

impl SeedPair {
    /// Sample both seeds
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R, bits: usize) -> Self {
        Self {
            seed0: Seed::random(rng, bits),
            seed1: Seed::random(rng, bits),
        }
    }
}

/// The two l-bit messages the sender offers for one OT instance
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct MessagePair {
    /// Delivered when the selection bit is 0
    pub message0: Vec<u8>,
    /// Delivered when the selection bit is 1
    pub message1: Vec<u8>,
}

impl MessagePair {
    /// Create a new message pair
    pub fn new(message0: impl Into<Vec<u8>>, message1: impl Into<Vec<u8>>) -> Self {
        Self {
            message0: message0.into(),
            message1: message1.into(),
        }
    }

    /// Message selected by `bit`
    pub fn get(&self, bit: bool) -> &[u8] {
        if bit {
            &self.message1
        } else {
            &self.message0
        }
    }
}

impl std::fmt::Debug for MessagePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagePair")
            .field("len", &self.message0.len())
            .finish_non_exhaustive()
    }
}

/// Decode selection bits given as one byte per bit
pub fn selection_bits_from_bytes(bytes: &[u8]) -> Result<Vec<bool>> {
    bytes
        .iter()
        .enumerate()
        .map(|(index, &value)| match value {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::InvalidSelectionBit { index, value }),
        })
        .collect()
}

/// Sample `count` uniformly random selection bits
pub fn random_selection_bits<R: RngCore>(rng: &mut R, count: usize) -> Vec<bool> {
    use rand::Rng;
    (0..count).map(|_| rng.gen()).collect()
}

/// Sample `count` random message pairs of `bits` bits each
pub fn random_message_pairs<R: RngCore>(rng: &mut R, count: usize, bits: usize) -> Vec<MessagePair> {
    let len = byte_len(bits);
    let mask = tail_mask(bits);
    let sample = |rng: &mut R| {
        let mut bytes = vec![0u8; len];
        rng.fill_bytes(&mut bytes);
        if let Some(last) = bytes.last_mut() {
            *last &= mask;
        }
        bytes
    };
    (0..count)
        .map(|_| {
            let message0 = sample(rng);
            let message1 = sample(rng);
            MessagePair { message0, message1 }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_config_validation() {
        assert!(ProtocolConfig::new(128, 8).is_ok());
        assert!(ProtocolConfig::new(0, 8).unwrap_err().is_configuration());
        assert!(matches!(
            ProtocolConfig::new(96, 8),
            Err(Error::InvalidDimension(96))
        ));
        assert!(ProtocolConfig::new(128, 0).unwrap_err().is_configuration());
    }

    #[test]
    fn test_validate_count() {
        let config = ProtocolConfig::new(8, 8).unwrap();
        assert!(config.validate_count(8).is_ok());
        assert!(config.validate_count(100).is_ok());
        assert!(matches!(config.validate_count(0), Err(Error::EmptyInput(_))));
        assert!(config.validate_count(4).unwrap_err().is_configuration());
    }

    #[test]
    fn test_config_json() {
        let json = r#"{"security_parameter":256,"message_bits":64,"strategy":"naive"}"#;
        let config: ProtocolConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.security_parameter, 256);
        assert_eq!(config.strategy, MatrixStrategy::Naive);
        assert!(!config.multithreaded);
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("eklundh".parse::<MatrixStrategy>().unwrap(), MatrixStrategy::Eklundh);
        assert!("quadrant".parse::<MatrixStrategy>().is_err());
    }

    #[test]
    fn test_seed_tail_bits() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        for _ in 0..32 {
            let seed = Seed::random(&mut rng, 4);
            assert_eq!(seed.as_bytes().len(), 1);
            assert_eq!(seed.as_bytes()[0] & 0xF0, 0);
        }
        assert!(Seed::from_bytes(vec![0x10], 4).is_err());
        assert!(Seed::from_bytes(vec![0x0F, 0x00], 4).is_err());
        assert!(Seed::from_bytes(vec![0x0F], 4).is_ok());
    }

    #[test]
    fn test_selection_bits_from_bytes() {
        assert_eq!(
            selection_bits_from_bytes(&[0, 1, 1, 0]).unwrap(),
            vec![false, true, true, false]
        );
        assert!(matches!(
            selection_bits_from_bytes(&[0, 2]),
            Err(Error::InvalidSelectionBit { index: 1, value: 2 })
        ));
    }

    #[test]
    fn test_random_message_pairs() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let pairs = random_message_pairs(&mut rng, 5, 12);
        assert_eq!(pairs.len(), 5);
        for pair in &pairs {
            assert_eq!(pair.message0.len(), 2);
            assert_eq!(pair.message1[1] & 0xF0, 0);
        }
    }

    #[test]
    fn test_message_pair_debug_hides_messages() {
        let pair = MessagePair::new(b"secret-zero".to_vec(), b"secret-one".to_vec());
        let printed = format!("{:?}", pair);
        assert!(printed.starts_with("MessagePair"));
        assert!(!printed.contains("115"));
        assert!(!printed.contains("secret"));
    }
}
