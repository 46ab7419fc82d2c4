// src/cache.rs
//! Per-user secret keyring cache
//!
//! Each username owns a [`OnceCell`]. The map lock is only held long enough
//! to find or create that cell; the load runs outside it, so a slow first
//! load for one user never blocks lookups for another. Concurrent first-time
//! callers for the same user wait on the cell and share the single load.
//!
//! A missing file loads as an empty keyring and is cached like any other
//! success. Hard I/O or format failures leave the cell empty, so the next
//! call retries.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::OnceCell;
use tracing::{debug, Span};

use crate::codec::KeyCodec;
use crate::consts::USERNAME_TOKEN;
use crate::error::{KeyringError, Result};
use crate::keyring::KeyringFile;

type Slot = Arc<OnceCell<Arc<KeyringFile>>>;

/// Path of `username`'s secret keyring. A template without the `%u` token
/// names one file shared by every user.
pub fn secret_keyring_path(template: &str, username: &str) -> PathBuf {
    if template.contains(USERNAME_TOKEN) {
        PathBuf::from(template.replace(USERNAME_TOKEN, username))
    } else {
        PathBuf::from(template)
    }
}

pub struct SecretKeyringCache {
    template: Option<String>,
    codec: Arc<dyn KeyCodec>,
    by_username: Mutex<HashMap<String, Slot>>,
    span: Span,
}

impl SecretKeyringCache {
    pub fn new(template: Option<String>, codec: Arc<dyn KeyCodec>) -> Self {
        SecretKeyringCache {
            template: template.filter(|t| !t.is_empty()),
            codec,
            by_username: Mutex::new(HashMap::new()),
            span: tracing::debug_span!("secret_keyring_cache"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// The loaded (possibly empty) secret keyring for `username`
    pub fn load_for_user(&self, username: &str) -> Result<Arc<KeyringFile>> {
        if username.is_empty() {
            return Err(KeyringError::NoUsername);
        }
        let template = self.template.as_deref().ok_or(KeyringError::NoKeyrings)?;

        let slot = Arc::clone(
            self.lock()
                .entry(username.to_owned())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        );

        slot.get_or_try_init(|| {
            let _enter = self.span.enter();
            let path = secret_keyring_path(template, username);
            debug!(username, path = %path.display(), "loading secret keyring");
            let file_span = tracing::debug_span!(
                parent: &self.span,
                "keyring_file",
                path = %path.display(),
                username
            );
            let mut file =
                KeyringFile::new(path, false, Arc::clone(&self.codec)).with_span(file_span);
            file.load_and_index()?;
            Ok(Arc::new(file))
        })
        .map(Arc::clone)
    }

    /// Drop the cached keyring for `username`; the next lookup reloads it
    pub fn invalidate(&self, username: &str) -> bool {
        self.lock().remove(username).is_some()
    }

    /// Usernames whose keyring is currently loaded
    pub fn cached_usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        // Map updates are single inserts/removes, so a poisoned map is still consistent
        self.by_username
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SecretKeyringCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKeyringCache")
            .field("template", &self.template)
            .field("cached", &self.cached_usernames())
            .finish()
    }
}
