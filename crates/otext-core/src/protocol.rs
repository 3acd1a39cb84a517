//! Protocol orchestration
//!
//! Drives a [`Receiver`] and a [`Sender`] through one OT extension run with
//! messages exchanged as plain function calls:
//! base OT → U → Q → ciphertexts → decryption.

use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::{
    extension::{Receiver, Sender},
    oblivious::BaseOt,
    types::{MatrixStrategy, MessagePair, ProtocolConfig},
    Error, Result,
};

/// Wall clock time spent in each phase of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Security parameter κ
    pub security_parameter: usize,
    /// Number of OT instances m
    pub count: usize,
    /// Message length l in bits
    pub message_bits: usize,
    /// Matrix strategy used by both parties
    pub strategy: MatrixStrategy,
    /// Seed sampling and the κ base OTs
    pub base_ot: Duration,
    /// Building T/U and rebuilding Q
    pub matrix: Duration,
    /// Masking and unmasking the message pairs
    pub ciphertexts: Duration,
    /// Whole run
    pub total: Duration,
}

/// Run one OT extension
///
/// # Arguments
/// * `config` - Parameters shared by both parties
/// * `base_ot` - Base OT used for the κ seed transfers
/// * `selection_bits` - Receiver's choices, one per instance
/// * `messages` - Sender's message pairs, one per instance
///
/// # Returns
/// The receiver's output: `messages[j].get(selection_bits[j])` for every j
#[instrument(skip(base_ot, selection_bits, messages), fields(m = selection_bits.len()))]
pub fn run_ot_extension<B: BaseOt + Clone>(
    config: &ProtocolConfig,
    base_ot: &B,
    selection_bits: &[bool],
    messages: &[MessagePair],
) -> Result<Vec<Vec<u8>>> {
    let (output, _) = execute(config, base_ot, selection_bits, messages, None)?;
    Ok(output)
}

/// Run one OT extension with both parties' randomness fixed
///
/// Two runs with the same seeds draw the same seed pairs and mask, so every
/// strategy yields the same T, U and Q.
#[instrument(skip(base_ot, selection_bits, messages, receiver_seed, sender_seed))]
pub fn run_ot_extension_with_seeds<B: BaseOt + Clone>(
    config: &ProtocolConfig,
    base_ot: &B,
    selection_bits: &[bool],
    messages: &[MessagePair],
    receiver_seed: [u8; 32],
    sender_seed: [u8; 32],
) -> Result<Vec<Vec<u8>>> {
    let seeds = Some((receiver_seed, sender_seed));
    let (output, _) = execute(config, base_ot, selection_bits, messages, seeds)?;
    Ok(output)
}

/// Run one OT extension and report how long each phase took
#[instrument(skip(base_ot, selection_bits, messages), fields(m = selection_bits.len()))]
pub fn run_ot_extension_timed<B: BaseOt + Clone>(
    config: &ProtocolConfig,
    base_ot: &B,
    selection_bits: &[bool],
    messages: &[MessagePair],
) -> Result<(Vec<Vec<u8>>, RunReport)> {
    execute(config, base_ot, selection_bits, messages, None)
}

fn execute<B: BaseOt + Clone>(
    config: &ProtocolConfig,
    base_ot: &B,
    selection_bits: &[bool],
    messages: &[MessagePair],
    seeds: Option<([u8; 32], [u8; 32])>,
) -> Result<(Vec<Vec<u8>>, RunReport)> {
    if selection_bits.len() != messages.len() {
        return Err(Error::LengthMismatch {
            expected: messages.len(),
            actual: selection_bits.len(),
        });
    }

    info!(
        kappa = config.security_parameter,
        m = selection_bits.len(),
        l = config.message_bits,
        strategy = %config.strategy,
        multithreaded = config.multithreaded,
        "Starting OT extension"
    );

    let (mut receiver, mut sender) = match seeds {
        Some((receiver_seed, sender_seed)) => (
            Receiver::new_with_seed(
                config.clone(),
                base_ot.clone(),
                selection_bits.to_vec(),
                receiver_seed,
            )?,
            Sender::new_with_seed(config.clone(), base_ot.clone(), messages.to_vec(), sender_seed)?,
        ),
        None => (
            Receiver::new(config.clone(), base_ot.clone(), selection_bits.to_vec())?,
            Sender::new(config.clone(), base_ot.clone(), messages.to_vec())?,
        ),
    };

    let start = Instant::now();

    // Phase 1: base OTs, roles reversed
    debug!("Base OT phase");
    receiver.choose_seeds()?;
    sender.choose_random_mask()?;
    let setup = receiver.public_material()?;
    let keys = sender.choose_keys(&setup)?;
    receiver.receive_keys(keys)?;
    let seed_ciphertexts = receiver.encrypt_seeds()?;
    sender.decrypt_seeds(&seed_ciphertexts)?;
    let base_ot_time = start.elapsed();

    // Phase 2: U and Q
    debug!("Matrix phase");
    let phase_start = Instant::now();
    let u = receiver.build_u_matrix()?;
    sender.reconstruct_q_matrix(&u)?;
    let matrix_time = phase_start.elapsed();

    // Phase 3: masked messages
    debug!("Ciphertext phase");
    let phase_start = Instant::now();
    let ciphertexts = sender.make_ciphertexts()?;
    let output = receiver.decrypt_ciphertexts(&ciphertexts)?;
    let ciphertext_time = phase_start.elapsed();

    let report = RunReport {
        security_parameter: config.security_parameter,
        count: output.len(),
        message_bits: config.message_bits,
        strategy: config.strategy,
        base_ot: base_ot_time,
        matrix: matrix_time,
        ciphertexts: ciphertext_time,
        total: start.elapsed(),
    };

    info!(
        m = report.count,
        total_us = report.total.as_micros() as u64,
        "OT extension complete"
    );
    Ok((output, report))
}

/// Transfer every message pair with its own base OT
///
/// Baseline for comparing against the extension: m public key OTs instead of
/// κ. Messages are taken as they are, without a length check against a
/// configuration.
#[instrument(skip(base_ot, selection_bits, messages), fields(m = selection_bits.len()))]
pub fn run_basic_ot<B: BaseOt>(
    base_ot: &B,
    selection_bits: &[bool],
    messages: &[MessagePair],
) -> Result<Vec<Vec<u8>>> {
    if selection_bits.is_empty() {
        return Err(Error::EmptyInput("selection bits"));
    }
    if selection_bits.len() != messages.len() {
        return Err(Error::LengthMismatch {
            expected: messages.len(),
            actual: selection_bits.len(),
        });
    }

    let mut rng = ChaCha20Rng::from_entropy();
    let (sender_state, setup) = base_ot.sender_setup(&mut rng)?;
    let (chooser_state, keys) = base_ot.choose(&setup, selection_bits, &mut rng)?;
    let pairs: Vec<(&[u8], &[u8])> = messages
        .iter()
        .map(|pair| (pair.message0.as_slice(), pair.message1.as_slice()))
        .collect();
    let ciphertexts = base_ot.encrypt(&sender_state, &keys, &pairs)?;
    let output = base_ot.decrypt(&chooser_state, &ciphertexts)?;

    debug!(m = output.len(), "Basic OT complete");
    Ok(output)
}
