// src/resolver/identity.rs
//! Collaborators the resolver consults but does not implement

use std::sync::Arc;

use crate::entity::{Fingerprint, KeyId, LockedKey};
use crate::error::BoxError;

/// Per-user view of which keys are active and which is bound to this device
pub trait ComputedKeyFamily: Send + Sync {
    /// Id of the active signing key bound to the current device.
    /// `Ok(None)` means this device has no key, which is not an error.
    fn active_device_key(&self) -> Result<Option<KeyId>, BoxError>;

    fn is_active(&self, fingerprint: &Fingerprint) -> bool;
}

/// The identity whose secret keys are being sought
pub trait Subject: Send + Sync {
    fn username(&self) -> &str;

    fn computed_key_family(&self) -> Option<&dyn ComputedKeyFamily>;

    /// Server-synced secret key, if the user has one
    fn synced_secret_key(&self) -> Result<Option<LockedKey>, BoxError>;
}

/// Loads the logged-in user when a request does not name one
pub trait SubjectLoader: Send + Sync {
    fn load_current_subject(&self) -> Result<Arc<dyn Subject>, BoxError>;
}

/// Turns a locked key into a usable one (prompting for a passphrase, say)
pub trait KeyUnlocker {
    type Unlocked;

    fn unlock(
        &self,
        key: &LockedKey,
        reason: &str,
        provenance: &str,
    ) -> Result<Self::Unlocked, BoxError>;
}
