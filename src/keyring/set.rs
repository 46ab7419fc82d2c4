// src/keyring/set.rs
//! Ordered public + secret keyring files behind one [`KeyRing`]
//!
//! File order is search priority. Fan-out lookups concatenate results from
//! every file, so the same key may come back more than once; de-duplicate
//! by fingerprint downstream if that matters.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn, Span};

use super::{KeyRing, KeyringFile};
use crate::codec::KeyCodec;
use crate::entity::{Entity, Fingerprint, Key, KeyId};
use crate::error::{KeyringError, Result};

/// Secret keyrings that failed during a bulk load. Those files stay empty.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub secret_failures: Vec<KeyringError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.secret_failures.is_empty()
    }
}

#[derive(Debug)]
pub struct KeyringSet {
    public_files: Vec<KeyringFile>,
    secret_files: Vec<KeyringFile>,
    span: Span,
}

impl KeyringSet {
    pub fn new(
        public: impl IntoIterator<Item = PathBuf>,
        secret: impl IntoIterator<Item = PathBuf>,
        codec: Arc<dyn KeyCodec>,
    ) -> Self {
        Self::from_files(
            public
                .into_iter()
                .map(|p| KeyringFile::new(p, true, Arc::clone(&codec)))
                .collect(),
            secret
                .into_iter()
                .map(|p| KeyringFile::new(p, false, Arc::clone(&codec)))
                .collect(),
        )
    }

    pub fn from_files(public_files: Vec<KeyringFile>, secret_files: Vec<KeyringFile>) -> Self {
        KeyringSet {
            public_files,
            secret_files,
            span: tracing::debug_span!("keyring_set"),
        }
    }

    /// Log inside `span`; member files log in child spans of it
    pub fn with_span(mut self, span: Span) -> Self {
        for file in self.public_files.iter_mut().chain(self.secret_files.iter_mut()) {
            let child = tracing::debug_span!(
                parent: &span,
                "keyring_file",
                path = %file.path().display(),
                is_public = file.is_public()
            );
            file.set_span(child);
        }
        self.span = span;
        self
    }

    pub fn public_files(&self) -> &[KeyringFile] {
        &self.public_files
    }

    pub fn secret_files(&self) -> &[KeyringFile] {
        &self.secret_files
    }

    pub fn is_empty(&self) -> bool {
        self.public_files.is_empty() && self.secret_files.is_empty()
    }

    /// Load and index every file. Public failures abort; secret failures are
    /// logged and collected in the report.
    pub fn load_all(&mut self) -> Result<LoadReport> {
        let _enter = self.span.enter();
        debug!("loading keyrings");
        for file in &mut self.public_files {
            file.load_and_index()?;
        }

        let mut report = LoadReport::default();
        for file in &mut self.secret_files {
            if let Err(err) = file.load_and_index() {
                warn!("skipping secret keyring: {err}");
                report.secret_failures.push(err);
            }
        }
        debug!(
            public = self.public_files.len(),
            secret = self.secret_files.len(),
            secret_failures = report.secret_failures.len(),
            "loaded keyrings"
        );
        Ok(report)
    }

    /// First entity with fingerprint `fp`, searching secret files when
    /// `secret` is set (and then only entities carrying private material)
    pub fn find_key(&self, fp: &Fingerprint, secret: bool) -> Option<Arc<Entity>> {
        let files = if secret {
            &self.secret_files
        } else {
            &self.public_files
        };
        files
            .iter()
            .find_map(|file| file.find_by_fingerprint(fp, secret).found())
    }

    fn all_files(&self) -> impl Iterator<Item = &KeyringFile> {
        self.public_files.iter().chain(self.secret_files.iter())
    }
}

impl KeyRing for KeyringSet {
    fn keys_by_id(&self, id: KeyId) -> Vec<Key> {
        self.all_files()
            .flat_map(|file| file.keys_by_id(id))
            .collect()
    }

    fn decryption_keys(&self) -> Vec<Key> {
        self.secret_files
            .iter()
            .flat_map(|file| file.decryption_keys())
            .collect()
    }
}
