// src/keyrings.rs
//! The keyring aggregate: shared public/secret files plus per-user secret
//! keyrings, built from configuration
//!
//! Shared files are loaded once up front and only read afterwards, so a
//! `Keyrings` can sit behind an `Arc` and serve many request threads.

use std::sync::Arc;

use tracing::{debug_span, info, info_span, warn, Span};

use crate::cache::SecretKeyringCache;
use crate::codec::{KeyCodec, OpenPgpCodec};
use crate::config::{Config, Usage};
use crate::entity::{Entity, Fingerprint, Key, KeyId};
use crate::error::{KeyringError, Result};
use crate::keyring::{KeyRing, KeyringFile, KeyringSet, LoadReport};
use crate::resolver::{SecretKeyResolver, SubjectLoader};

#[derive(Debug)]
pub struct Keyrings {
    set: KeyringSet,
    secret_keyrings: Arc<SecretKeyringCache>,
    span: Span,
}

impl Keyrings {
    /// Build (but do not load) the keyrings named by `config`. Shared files
    /// are only opened when `usage.gpg_keyring` is set.
    pub fn new(config: &Config, usage: Usage, codec: Arc<dyn KeyCodec>) -> Result<Self> {
        let span = info_span!("keyrings");

        let (public, secret) = if usage.gpg_keyring {
            (
                config.keyrings.public.clone(),
                config.keyrings.secret.clone(),
            )
        } else {
            (Vec::new(), Vec::new())
        };

        let set = KeyringSet::new(public, secret, Arc::clone(&codec))
            .with_span(debug_span!(parent: &span, "keyring_set"));
        let cache = SecretKeyringCache::new(config.keyrings.secret_keyring_template.clone(), codec)
            .with_span(debug_span!(parent: &span, "secret_keyring_cache"));
        if cache.template().is_none() {
            warn!(parent: &span, "no secret keyring template, per-user keyrings are off");
        }

        Keyrings::from_parts(set, Arc::new(cache)).map(|k| k.with_span(span))
    }

    /// Build from `config` and load every shared file
    pub fn open(config: &Config, codec: Arc<dyn KeyCodec>) -> Result<(Self, LoadReport)> {
        let mut keyrings = Keyrings::new(config, config.usage(), codec)?;
        let report = keyrings.load()?;
        Ok((keyrings, report))
    }

    /// [`Keyrings::open`] with OpenPGP keyring files, the format on disk
    pub fn from_config(config: &Config) -> Result<(Self, LoadReport)> {
        Keyrings::open(config, Arc::new(OpenPgpCodec))
    }

    pub fn from_parts(set: KeyringSet, secret_keyrings: Arc<SecretKeyringCache>) -> Result<Self> {
        if set.is_empty() && secret_keyrings.template().is_none() {
            return Err(KeyringError::NoKeyrings);
        }
        Ok(Keyrings {
            set,
            secret_keyrings,
            span: info_span!("keyrings"),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Load and index the shared files; see [`KeyringSet::load_all`]
    pub fn load(&mut self) -> Result<LoadReport> {
        let report = self.set.load_all()?;
        let _enter = self.span.enter();
        info!(
            public = self.set.public_files().len(),
            secret = self.set.secret_files().len(),
            secret_failures = report.secret_failures.len(),
            "keyrings ready"
        );
        Ok(report)
    }

    pub fn keyring_set(&self) -> &KeyringSet {
        &self.set
    }

    pub fn secret_keyrings(&self) -> &Arc<SecretKeyringCache> {
        &self.secret_keyrings
    }

    pub fn find_key(&self, fp: &Fingerprint, secret: bool) -> Option<Arc<Entity>> {
        self.set.find_key(fp, secret)
    }

    pub fn load_secret_keyring(&self, username: &str) -> Result<Arc<KeyringFile>> {
        self.secret_keyrings.load_for_user(username)
    }

    /// A resolver sharing this aggregate's per-user cache
    pub fn resolver(&self, subjects: Arc<dyn SubjectLoader>) -> SecretKeyResolver {
        SecretKeyResolver::new(Arc::clone(&self.secret_keyrings), subjects)
            .with_span(debug_span!(parent: &self.span, "secret_key_resolver"))
    }
}

impl KeyRing for Keyrings {
    fn keys_by_id(&self, id: KeyId) -> Vec<Key> {
        self.set.keys_by_id(id)
    }

    fn decryption_keys(&self) -> Vec<Key> {
        self.set.decryption_keys()
    }
}
