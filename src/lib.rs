// src/lib.rs
//! secret-keyring — keyring loading and secret key resolution
//!
//! Features:
//! - Public and secret keyring files indexed by key id and fingerprint
//! - Subkeys resolve to their owning entity
//! - Per-user secret keyrings, loaded once and shared across threads
//! - Device key → local search → synced key fallback policy
//! - OpenPGP keyrings, binary or armored, read through sequoia-openpgp
//! - Private material held in zeroizing containers

pub mod aliases;
pub mod cache;
pub mod codec;
pub mod config;
pub mod consts;
pub mod entity;
pub mod keyring;
pub mod keyrings;
pub mod resolver;

pub mod error;

// Re-export everything users need at the crate root
pub use cache::{secret_keyring_path, SecretKeyringCache};
pub use codec::{CodecError, KeyCodec, OpenPgpCodec};
pub use config::load as load_config;
pub use config::{Config, Usage};
pub use entity::{Entity, Fingerprint, Key, KeyFlags, KeyId, LockedKey, PrivateKey, PublicKey};
pub use error::{BoxError, KeyringError, Result};
pub use keyring::{EmptyKeyRing, KeyLookup, KeyRing, KeyringFile, KeyringSet, LoadReport};
pub use keyrings::Keyrings;
pub use resolver::{
    ComputedKeyFamily, KeyUnlocker, Provenance, ResolvedKey, SecretKeyRequest, SecretKeyResolver,
    Subject, SubjectLoader,
};
