// src/keyring/mod.rs
//! The keyring capability and its on-disk building blocks
//!
//! [`KeyRing`] is the three-operation lookup interface consumers (signature
//! verification, decryption) program against. Plain entity slices, single
//! [`KeyringFile`]s and whole [`KeyringSet`]s all satisfy it.

use std::sync::Arc;

use crate::entity::{Entity, Key, KeyFlags, KeyId};

pub use file::KeyringFile;
pub use set::{KeyringSet, LoadReport};

pub mod file;
pub mod set;

pub trait KeyRing {
    /// Every key (primary or subkey) with the given id
    fn keys_by_id(&self, id: KeyId) -> Vec<Key>;

    /// Like [`KeyRing::keys_by_id`], restricted to keys whose flags allow `usage`
    fn keys_by_id_usage(&self, id: KeyId, usage: KeyFlags) -> Vec<Key> {
        self.keys_by_id(id)
            .into_iter()
            .filter(|key| key.public_key.flags().allows(usage))
            .collect()
    }

    /// Every subkey with private material that may be used for decryption
    fn decryption_keys(&self) -> Vec<Key>;
}

/// Outcome of an indexed lookup
#[derive(Debug, Clone)]
pub enum KeyLookup {
    Found(Arc<Entity>),
    /// Present, but a secret-only lookup was asked for and it has no private material
    NoPrivateMaterial(Arc<Entity>),
    NotFound,
}

impl KeyLookup {
    pub fn found(self) -> Option<Arc<Entity>> {
        match self {
            KeyLookup::Found(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, KeyLookup::Found(_))
    }

    pub(crate) fn classify(entity: Option<&Arc<Entity>>, secret_only: bool) -> Self {
        match entity {
            None => KeyLookup::NotFound,
            Some(e) if secret_only && !e.has_private_material() => {
                KeyLookup::NoPrivateMaterial(Arc::clone(e))
            }
            Some(e) => KeyLookup::Found(Arc::clone(e)),
        }
    }
}

impl KeyRing for [Arc<Entity>] {
    fn keys_by_id(&self, id: KeyId) -> Vec<Key> {
        self.iter()
            .flat_map(|entity| {
                entity
                    .keys()
                    .filter(move |(pk, _)| pk.key_id() == id)
                    .map(move |(pk, sk)| Key {
                        entity: Arc::clone(entity),
                        public_key: pk.clone(),
                        private_key: sk.cloned(),
                    })
            })
            .collect()
    }

    fn decryption_keys(&self) -> Vec<Key> {
        self.iter()
            .flat_map(|entity| {
                entity.subkeys().iter().filter_map(move |sub| {
                    let public = sub.public.as_ref()?;
                    let private = sub.private.as_ref()?;
                    public.flags().allows(KeyFlags::ENCRYPT).then(|| Key {
                        entity: Arc::clone(entity),
                        public_key: public.clone(),
                        private_key: Some(Arc::clone(private)),
                    })
                })
            })
            .collect()
    }
}

/// Keyring that never holds anything
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyKeyRing;

impl KeyRing for EmptyKeyRing {
    fn keys_by_id(&self, _id: KeyId) -> Vec<Key> {
        Vec::new()
    }

    fn decryption_keys(&self) -> Vec<Key> {
        Vec::new()
    }
}
