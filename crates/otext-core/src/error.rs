//! Error types for OT extension runs

use thiserror::Error;

/// Result type alias for OT extension operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during an OT extension run
///
/// Every error is fatal for the run that produced it. Nothing is retried and
/// no partial output is ever handed back to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid protocol configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An input that must be non-empty was empty
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    /// Requested output length is zero
    #[error("Invalid output length: {0}")]
    InvalidLength(usize),

    /// Transpose block dimension is not a power of two
    #[error("Invalid dimension: block dimension {0} is not a power of two")]
    InvalidDimension(usize),

    /// A selection bit was encoded with something other than 0 or 1
    #[error("Invalid selection bit {value} at index {index}")]
    InvalidSelectionBit { index: usize, value: u8 },

    /// Matrix shapes disagree between protocol phases
    #[error("Dimension mismatch: expected {}x{}, got {}x{}", .expected.0, .expected.1, .actual.0, .actual.1)]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Number of items disagrees with the number of OT instances
    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A base OT or final ciphertext did not decode to a valid value
    #[error("Decryption failure: {0}")]
    DecryptionFailure(String),

    /// Operation called out of protocol order
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Cryptographic operation failed
    #[error("Cryptographic error: {0}")]
    Crypto(String),
}

/// Coarse classification of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad parameters or inputs, detected before any key material exists
    Configuration,
    /// Shapes disagree between phases
    DimensionMismatch,
    /// Base OT or final ciphertext failed to decode
    DecryptionFailure,
    /// Operations were driven in the wrong order
    Sequencing,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidConfig(_)
            | Error::EmptyInput(_)
            | Error::InvalidLength(_)
            | Error::InvalidDimension(_)
            | Error::InvalidSelectionBit { .. } => ErrorKind::Configuration,
            Error::DimensionMismatch { .. } | Error::LengthMismatch { .. } => {
                ErrorKind::DimensionMismatch
            }
            Error::DecryptionFailure(_) | Error::Crypto(_) => ErrorKind::DecryptionFailure,
            Error::InvalidState { .. } => ErrorKind::Sequencing,
        }
    }

    /// Returns `true` for configuration errors
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}
