//! Extension message types

use serde::{Deserialize, Serialize};

use crate::bits::BitMatrix;

/// Receiver to sender: the masked matrix U (m×κ)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UMatrix {
    /// Row j holds t_j ⊕ g_j ⊕ r_j·1
    pub matrix: BitMatrix,
}

impl UMatrix {
    /// Number of OT instances (rows)
    pub fn count(&self) -> usize {
        self.matrix.rows()
    }
}

/// Sender to receiver: both messages of one OT instance, masked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedCiphertextPair {
    /// message0 ⊕ H(j, q_j)
    pub y0: Vec<u8>,
    /// message1 ⊕ H(j, q_j ⊕ s)
    pub y1: Vec<u8>,
}
