// src/resolver/mod.rs
//! Secret key retrieval policy
//!
//! Sources are tried in a fixed order, first hit wins:
//!
//! 1. the key bound to the current device (per-user secret keyring)
//! 2. any key in the per-user keyring that is active for the user
//! 3. the server-synced key
//!
//! "Not found" at any step falls through to the next one. Only a failure to
//! load the subject or to talk to the synced-key provider aborts early.
//! The key comes back locked; [`SecretKeyResolver::get_secret_key`] hands it
//! to a [`KeyUnlocker`] together with a description of where it came from.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn, Span};

use crate::cache::SecretKeyringCache;
use crate::consts::{PROVENANCE_DEVICE_KEY, PROVENANCE_LOCAL_KEYRING, PROVENANCE_SYNCED_KEY};
use crate::entity::LockedKey;
use crate::error::{KeyringError, Result};

pub use identity::{ComputedKeyFamily, KeyUnlocker, Subject, SubjectLoader};
pub use request::SecretKeyRequest;

pub mod identity;
pub mod request;

/// Which policy step produced a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    DeviceKey,
    LocalKeyring,
    SyncedKey,
}

impl Provenance {
    /// Phrase shown to the user while unlocking
    pub fn description(self) -> &'static str {
        match self {
            Provenance::DeviceKey => PROVENANCE_DEVICE_KEY,
            Provenance::LocalKeyring => PROVENANCE_LOCAL_KEYRING,
            Provenance::SyncedKey => PROVENANCE_SYNCED_KEY,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedKey {
    pub key: LockedKey,
    pub provenance: Provenance,
}

pub struct SecretKeyResolver {
    cache: Arc<SecretKeyringCache>,
    subjects: Arc<dyn SubjectLoader>,
    span: Span,
}

impl SecretKeyResolver {
    pub fn new(cache: Arc<SecretKeyringCache>, subjects: Arc<dyn SubjectLoader>) -> Self {
        SecretKeyResolver {
            cache,
            subjects,
            span: tracing::debug_span!("secret_key_resolver"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Find a locked secret key for the request's subject
    pub fn get_secret_key_locked(&self, request: &SecretKeyRequest) -> Result<ResolvedKey> {
        let _enter = self.span.enter();
        debug!(reason = %request.reason, "resolving locked secret key");

        let subject = match &request.subject {
            Some(subject) => Arc::clone(subject),
            None => self
                .subjects
                .load_current_subject()
                .map_err(KeyringError::Subject)?,
        };

        if let Some(found) = self.locked_local_secret_key(request, subject.as_ref()) {
            debug!(provenance = %found.provenance, key = %found.key.fingerprint(), "using local secret key");
            return Ok(found);
        }

        if !request.wants_synced_key() {
            debug!("skipped synced key (not requested)");
        } else {
            match subject.synced_secret_key() {
                Err(source) => {
                    warn!("error fetching synced secret key: {source}");
                    return Err(KeyringError::Transport {
                        username: subject.username().to_owned(),
                        source,
                    });
                }
                Ok(Some(key)) => {
                    debug!(key = %key.fingerprint(), "using synced secret key");
                    return Ok(ResolvedKey {
                        key,
                        provenance: Provenance::SyncedKey,
                    });
                }
                Ok(None) => debug!("no synced secret key"),
            }
        }

        Err(KeyringError::NoSecretKey)
    }

    /// Device key, then (if asked) a search of the subject's local keyring.
    /// Every failure in here means "nothing local", never an error.
    pub fn locked_local_secret_key(
        &self,
        request: &SecretKeyRequest,
        subject: &dyn Subject,
    ) -> Option<ResolvedKey> {
        let username = subject.username();

        let keyring = match self.cache.load_for_user(username) {
            Ok(keyring) => keyring,
            Err(err) => {
                debug!(username, "no secret keyring found ({err})");
                return None;
            }
        };

        let Some(family) = subject.computed_key_family() else {
            warn!("no computed key family found for {username}");
            return None;
        };

        if !request.wants_device_key() {
            debug!("not using device key (not requested)");
        } else {
            match family.active_device_key() {
                Err(err) => debug!("no key for current device: {err}"),
                Ok(None) => debug!("empty key id for current device"),
                Ok(Some(id)) => {
                    debug!(%id, "found key id for current device");
                    if let Some(key) = keyring.lookup_by_key_id(id) {
                        return Some(ResolvedKey {
                            key,
                            provenance: Provenance::DeviceKey,
                        });
                    }
                }
            }
        }

        if request.wants_local_search() {
            debug!("looking up secret key in local keyring");
            return keyring
                .search_with_key_family(family)
                .map(|key| ResolvedKey {
                    key,
                    provenance: Provenance::LocalKeyring,
                });
        }
        None
    }

    /// Resolve a key and unlock it. Unlock failures are returned as-is.
    pub fn get_secret_key<U>(&self, request: &SecretKeyRequest, unlocker: &U) -> Result<U::Unlocked>
    where
        U: KeyUnlocker + ?Sized,
    {
        let resolved = self.get_secret_key_locked(request)?;
        debug!(provenance = %resolved.provenance, "unlocking secret key");
        unlocker
            .unlock(
                &resolved.key,
                &request.reason,
                resolved.provenance.description(),
            )
            .map_err(KeyringError::Unlock)
    }
}

impl fmt::Debug for SecretKeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKeyResolver")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
