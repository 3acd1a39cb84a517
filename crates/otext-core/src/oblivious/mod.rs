//! Base oblivious transfer
//!
//! The extension only needs κ instances of 1-out-of-2 OT on short strings.
//! [`BaseOt`] is that boundary; any construction that delivers exactly one of
//! two strings per instance, without revealing the choice to the sender or the
//! other string to the chooser, can sit behind it.
//!
//! - [`SimplestOt`]: Chou-Orlandi OT over secp256k1
//! - [`IdealBaseOt`]: insecure ideal functionality for tests and benchmarks

pub mod ideal;
pub mod simplest;

pub use ideal::IdealBaseOt;
pub use simplest::SimplestOt;

use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use crate::Result;

/// A 1-out-of-2 base OT protocol
///
/// Message flow: the sender publishes its setup, the chooser answers with one
/// public key per instance, the sender encrypts both strings of every pair and
/// the chooser decrypts the chosen one.
pub trait BaseOt {
    /// Secret state kept by the sender
    type SenderState;
    /// Sender's public setup message
    type SenderSetup: Clone;
    /// Secret state kept by the chooser
    type ChooserState;
    /// Chooser's public keys, one per instance
    type ChooserKeys;
    /// Encrypted string pairs, one per instance
    type Ciphertexts;

    /// Sender: produce the setup message
    fn sender_setup<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(Self::SenderState, Self::SenderSetup)>;

    /// Chooser: commit to `choices`, one per instance
    fn choose<R: RngCore + CryptoRng>(
        &self,
        setup: &Self::SenderSetup,
        choices: &[bool],
        rng: &mut R,
    ) -> Result<(Self::ChooserState, Self::ChooserKeys)>;

    /// Sender: encrypt both strings of every pair under the chooser's keys
    fn encrypt(
        &self,
        state: &Self::SenderState,
        keys: &Self::ChooserKeys,
        pairs: &[(&[u8], &[u8])],
    ) -> Result<Self::Ciphertexts>;

    /// Chooser: recover the chosen string of every pair
    fn decrypt(
        &self,
        state: &Self::ChooserState,
        ciphertexts: &Self::Ciphertexts,
    ) -> Result<Vec<Vec<u8>>>;
}

/// XOR `data` with a SHA-256 key stream derived from `key`
pub(crate) fn apply_key_stream(key: &[u8; 32], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for (counter, chunk) in data.chunks(32).enumerate() {
        let block = Sha256::new()
            .chain_update(b"otext/base-ot/stream/v1")
            .chain_update(key)
            .chain_update((counter as u64).to_be_bytes())
            .finalize();
        out.extend(chunk.iter().zip(block.iter()).map(|(d, k)| d ^ k));
    }
    out
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;

    /// Run one full base OT and return the chooser's output
    pub fn run_base_ot<B: BaseOt, R: RngCore + CryptoRng>(
        ot: &B,
        pairs: &[(Vec<u8>, Vec<u8>)],
        choices: &[bool],
        rng: &mut R,
    ) -> Result<Vec<Vec<u8>>> {
        let (sender_state, setup) = ot.sender_setup(rng)?;
        let (chooser_state, keys) = ot.choose(&setup, choices, rng)?;
        let borrowed: Vec<(&[u8], &[u8])> = pairs
            .iter()
            .map(|(m0, m1)| (m0.as_slice(), m1.as_slice()))
            .collect();
        let ciphertexts = ot.encrypt(&sender_state, &keys, &borrowed)?;
        ot.decrypt(&chooser_state, &ciphertexts)
    }

    /// Assert the chooser got exactly the chosen strings
    pub fn assert_chosen(pairs: &[(Vec<u8>, Vec<u8>)], choices: &[bool], output: &[Vec<u8>]) {
        assert_eq!(output.len(), pairs.len());
        for ((pair, &choice), got) in pairs.iter().zip(choices).zip(output) {
            let expected = if choice { &pair.1 } else { &pair.0 };
            assert_eq!(got, expected);
        }
    }
}
