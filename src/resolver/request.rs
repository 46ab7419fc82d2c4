// src/resolver/request.rs
//! What a caller wants from the resolver

use std::fmt;
use std::sync::Arc;

use super::identity::Subject;

/// Which sources may satisfy a secret key request, and for whom
#[derive(Clone, Default)]
pub struct SecretKeyRequest {
    /// Use every source below
    pub use_all: bool,
    /// The key bound to the current device
    pub use_device_key: bool,
    /// The server-synced key, unlocked with the account passphrase
    pub use_synced_key: bool,
    /// Any key in the local keyring that is active for the user
    pub search_local: bool,

    /// Why the key is needed, shown while unlocking
    pub reason: String,
    /// Whose keys; the current user is loaded when unset
    pub subject: Option<Arc<dyn Subject>>,
}

impl SecretKeyRequest {
    pub fn all(reason: impl Into<String>) -> Self {
        SecretKeyRequest {
            use_all: true,
            reason: reason.into(),
            ..Default::default()
        }
    }

    pub fn with_subject(mut self, subject: Arc<dyn Subject>) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn wants_device_key(&self) -> bool {
        self.use_all || self.use_device_key
    }

    pub fn wants_synced_key(&self) -> bool {
        self.use_all || self.use_synced_key
    }

    pub fn wants_local_search(&self) -> bool {
        self.use_all || self.search_local
    }
}

impl fmt::Debug for SecretKeyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKeyRequest")
            .field("use_all", &self.use_all)
            .field("use_device_key", &self.use_device_key)
            .field("use_synced_key", &self.use_synced_key)
            .field("search_local", &self.search_local)
            .field("reason", &self.reason)
            .field("subject", &self.subject.as_ref().map(|s| s.username()))
            .finish()
    }
}
