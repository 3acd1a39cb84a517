//! Simplest OT
//!
//! Chou-Orlandi base OT from https://eprint.iacr.org/2015/267.pdf over
//! secp256k1. The instance index is hashed into every key so that instances
//! sharing the sender's setup point yield independent keys.

use k256::{
    elliptic_curve::{
        sec1::{FromEncodedPoint, ToEncodedPoint},
        subtle::{Choice, ConditionallySelectable},
        Field,
    },
    AffinePoint, ProjectivePoint, Scalar,
};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{apply_key_stream, BaseOt};
use crate::{Error, Result};

/// Simplest OT protocol
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplestOt;

impl SimplestOt {
    /// Create a new Simplest OT instance
    pub fn new() -> Self {
        Self
    }
}

/// Sender's secret `a` and public point `A = a·G`
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SenderState {
    secret: Scalar,
    #[zeroize(skip)]
    public: ProjectivePoint,
}

/// Sender's setup message: compressed `A`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderSetup {
    pub point: Vec<u8>,
}

/// Chooser's derived keys and choices
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ChooserState {
    keys: Vec<[u8; 32]>,
    choices: Vec<bool>,
}

/// Chooser's blinded points `B_i = b_i·G + c_i·A`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChooserKeys {
    pub points: Vec<Vec<u8>>,
}

/// Both encrypted strings of every instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ciphertexts {
    pub pairs: Vec<(Vec<u8>, Vec<u8>)>,
}

impl BaseOt for SimplestOt {
    type SenderState = SenderState;
    type SenderSetup = SenderSetup;
    type ChooserState = ChooserState;
    type ChooserKeys = ChooserKeys;
    type Ciphertexts = Ciphertexts;

    fn sender_setup<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(SenderState, SenderSetup)> {
        let secret = Scalar::random(&mut *rng);
        let public = ProjectivePoint::GENERATOR * secret;
        let setup = SenderSetup {
            point: encode_point(&public),
        };
        Ok((SenderState { secret, public }, setup))
    }

    fn choose<R: RngCore + CryptoRng>(
        &self,
        setup: &SenderSetup,
        choices: &[bool],
        rng: &mut R,
    ) -> Result<(ChooserState, ChooserKeys)> {
        let sender_point = decode_point(&setup.point)?;
        if sender_point == ProjectivePoint::IDENTITY {
            return Err(Error::Crypto("Sender setup point is the identity".into()));
        }

        let mut keys = Vec::with_capacity(choices.len());
        let mut points = Vec::with_capacity(choices.len());

        for (i, &choice) in choices.iter().enumerate() {
            let b = Scalar::random(&mut *rng);
            let offset = ProjectivePoint::conditional_select(
                &ProjectivePoint::IDENTITY,
                &sender_point,
                Choice::from(choice as u8),
            );
            points.push(encode_point(&(ProjectivePoint::GENERATOR * b + offset)));
            keys.push(derive_key(&(sender_point * b), i));
        }

        Ok((
            ChooserState {
                keys,
                choices: choices.to_vec(),
            },
            ChooserKeys { points },
        ))
    }

    fn encrypt(
        &self,
        state: &SenderState,
        keys: &ChooserKeys,
        pairs: &[(&[u8], &[u8])],
    ) -> Result<Ciphertexts> {
        if keys.points.len() != pairs.len() {
            return Err(Error::LengthMismatch {
                expected: pairs.len(),
                actual: keys.points.len(),
            });
        }

        let pairs = keys
            .points
            .iter()
            .zip(pairs)
            .enumerate()
            .map(|(i, (bytes, (m0, m1)))| {
                let chooser_point = decode_point(bytes)?;
                let shared0 = chooser_point * state.secret;
                let shared1 = (chooser_point - state.public) * state.secret;
                let key0 = derive_key(&shared0, i);
                let key1 = derive_key(&shared1, i);
                Ok((apply_key_stream(&key0, m0), apply_key_stream(&key1, m1)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Ciphertexts { pairs })
    }

    fn decrypt(&self, state: &ChooserState, ciphertexts: &Ciphertexts) -> Result<Vec<Vec<u8>>> {
        if ciphertexts.pairs.len() != state.keys.len() {
            return Err(Error::LengthMismatch {
                expected: state.keys.len(),
                actual: ciphertexts.pairs.len(),
            });
        }

        Ok(ciphertexts
            .pairs
            .iter()
            .zip(state.keys.iter().zip(&state.choices))
            .map(|((c0, c1), (key, &choice))| {
                let ciphertext = if choice { c1 } else { c0 };
                apply_key_stream(key, ciphertext)
            })
            .collect())
    }
}

fn encode_point(point: &ProjectivePoint) -> Vec<u8> {
    point.to_affine().to_encoded_point(true).as_bytes().to_vec()
}

fn decode_point(bytes: &[u8]) -> Result<ProjectivePoint> {
    let point = k256::EncodedPoint::from_bytes(bytes).map_err(|e| Error::Crypto(e.to_string()))?;
    let affine_opt = AffinePoint::from_encoded_point(&point);
    let affine: AffinePoint = Option::<AffinePoint>::from(affine_opt)
        .ok_or_else(|| Error::Crypto("Invalid curve point".into()))?;
    Ok(ProjectivePoint::from(affine))
}

/// Key for instance `index` from a Diffie-Hellman point
fn derive_key(point: &ProjectivePoint, index: usize) -> [u8; 32] {
    Sha256::new()
        .chain_update(b"otext/base-ot/simplest/v1")
        .chain_update((index as u64).to_be_bytes())
        .chain_update(encode_point(point))
        .finalize()
        .into()
}
