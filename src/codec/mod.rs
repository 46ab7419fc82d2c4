// src/codec/mod.rs
//! Key-material codec boundary
//!
//! The keyring never looks inside the on-disk encoding itself: a
//! [`KeyCodec`] turns bytes into [`Entity`] records and back. Swapping the
//! wire format means swapping the codec, nothing else.

use std::io::Write;
use std::sync::Arc;

use thiserror::Error;

use crate::entity::Entity;
use crate::error::BoxError;

pub use pgp::OpenPgpCodec;

pub mod pgp;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("invalid OpenPGP data: {0}")]
    OpenPgp(#[source] BoxError),

    #[error("unsupported key {fingerprint}: only v4 keys can be indexed")]
    UnsupportedKey { fingerprint: String },

    #[error("entity {identity} has no OpenPGP packets to write")]
    MissingPackets { identity: String },

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Parses and serializes a keyring's entities.
///
/// Implementations must be round-trip stable on identity and fingerprint
/// data, and must report parse failures as [`CodecError`] rather than
/// panicking.
pub trait KeyCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Entity>, CodecError>;

    fn encode(&self, entities: &[Arc<Entity>], out: &mut dyn Write) -> Result<(), CodecError>;
}
