//! # OText Core
//!
//! Semi-honest IKNP oblivious transfer extension.
//!
//! This crate turns κ public key oblivious transfers into m ≫ κ transfers of
//! l-bit messages using only hashing for the bulk of the work:
//! - Seed expansion (PRG) and a correlation-robust hash
//! - Bit matrix transposition with Eklundh's algorithm, optionally parallel
//! - Base OT behind the [`oblivious::BaseOt`] trait
//! - Extension [`Receiver`] and [`Sender`] state machines
//!
//! ## Protocol Overview
//!
//! The parties run κ base OTs with reversed roles, the receiver sends one
//! masked m×κ matrix U, and the sender answers with m masked message pairs.
//! The receiver opens exactly the message its selection bit names in every
//! pair; the sender learns nothing about the selection bits.
//!
//! ## Example
//!
//! ```rust,ignore
//! use otext_core::{protocol, MessagePair, ProtocolConfig, SimplestOt};
//!
//! let config = ProtocolConfig::new(128, 8)?;
//! let messages = vec![MessagePair::new("A", "a"); 128];
//! let bits = vec![true; 128];
//!
//! let output = protocol::run_ot_extension(&config, &SimplestOt::new(), &bits, &messages)?;
//! ```

pub mod bits;
pub mod error;
pub mod extension;
pub mod hash;
pub mod oblivious;
pub mod prg;
pub mod protocol;
pub mod transpose;
pub mod types;

pub use bits::BitMatrix;
pub use error::{Error, ErrorKind, Result};
pub use extension::{MaskedCiphertextPair, Receiver, Sender, UMatrix};
pub use oblivious::{BaseOt, IdealBaseOt, SimplestOt};
pub use protocol::{run_basic_ot, run_ot_extension, run_ot_extension_timed, RunReport};
pub use types::{MatrixStrategy, MessagePair, ProtocolConfig, Seed, SeedPair};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
