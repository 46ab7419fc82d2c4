// src/error.rs
//! Public error type for the entire crate

use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CodecError;

/// Opaque error handed back by external collaborators (identity loader,
/// synced-key provider, unlocker). Passed through untouched.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, KeyringError>;

#[derive(Error, Debug)]
pub enum KeyringError {
    #[error("no username given for secret keyring lookup")]
    NoUsername,

    #[error("no keyrings configured")]
    NoKeyrings,

    #[error("no secret key available")]
    NoSecretKey,

    #[error("cannot read keyring {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse keyring {}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("cannot load current user: {0}")]
    Subject(#[source] BoxError),

    #[error("error fetching synced secret key for {username}: {source}")]
    Transport {
        username: String,
        #[source]
        source: BoxError,
    },

    #[error("cannot unlock secret key: {0}")]
    Unlock(#[source] BoxError),

    #[error("invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl KeyringError {
    /// True for the terminal "nothing found" outcome, which callers usually
    /// answer by offering to generate a new key rather than reporting a failure.
    pub fn is_no_secret_key(&self) -> bool {
        matches!(self, KeyringError::NoSecretKey)
    }
}
