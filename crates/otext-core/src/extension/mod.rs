//! IKNP OT extension
//!
//! Turns κ base OTs into m OTs of l-bit messages. The base OTs run with the
//! roles reversed: the extension [`Receiver`] offers κ seed pairs and the
//! extension [`Sender`] picks one seed of every pair according to its secret
//! mask s.
//!
//! Flow:
//! 1. Receiver samples seed pairs, Sender samples s
//! 2. κ base OTs deliver seed_{s_i} of pair i to the Sender
//! 3. Receiver expands the seeds into T and U = T ⊕ G(seed1) ⊕ r and sends U
//! 4. Sender rebuilds Q = T ⊕ (r·s) from its seeds and U
//! 5. Sender masks every message pair with H(j, q_j) and H(j, q_j ⊕ s)
//! 6. Receiver unmasks the chosen message of every pair with H(j, t_j)

mod messages;
mod receiver;
mod sender;

pub use messages::*;
pub use receiver::Receiver;
pub use sender::Sender;

use crate::{
    bits::BitMatrix,
    transpose::{transpose, transpose_naive},
    types::{MatrixStrategy, ProtocolConfig},
    Result,
};

/// Transpose with the routine `config.strategy` names
///
/// Only used by the strategies that build κ×m matrices first.
pub(crate) fn transpose_with(matrix: &BitMatrix, config: &ProtocolConfig) -> Result<BitMatrix> {
    match config.strategy {
        MatrixStrategy::Eklundh => transpose(matrix, config.multithreaded),
        MatrixStrategy::Naive | MatrixStrategy::Transpose => Ok(transpose_naive(matrix)),
    }
}
