// src/keyring/file.rs
//! One on-disk keyring, loaded into memory and indexed
//!
//! Lifecycle: [`KeyringFile::new`] → [`KeyringFile::load`] →
//! [`KeyringFile::index`] (or [`KeyringFile::load_and_index`]). A missing file
//! is an empty keyring, not an error. After indexing, every primary key and
//! every subkey id/fingerprint resolves to the owning entity.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{debug, error, info, Span};

use super::{KeyLookup, KeyRing};
use crate::codec::KeyCodec;
use crate::entity::{Entity, Fingerprint, Key, KeyId, LockedKey};
use crate::error::{KeyringError, Result};
use crate::resolver::ComputedKeyFamily;

#[derive(Debug, Default)]
struct KeyIndex {
    by_id: HashMap<KeyId, Arc<Entity>>,
    by_fingerprint: HashMap<Fingerprint, Arc<Entity>>,
}

impl KeyIndex {
    /// Register every key of `entity`; returns (primary, subkey) counts
    fn insert(&mut self, entity: &Arc<Entity>) -> (usize, usize) {
        let mut primaries = 0;
        if let Some(pk) = entity.primary_key() {
            self.by_id.insert(pk.key_id(), Arc::clone(entity));
            self.by_fingerprint.insert(pk.fingerprint(), Arc::clone(entity));
            primaries += 1;
        }
        let mut subkeys = 0;
        for pk in entity.subkeys().iter().filter_map(|sk| sk.public.as_ref()) {
            self.by_id.insert(pk.key_id(), Arc::clone(entity));
            self.by_fingerprint.insert(pk.fingerprint(), Arc::clone(entity));
            subkeys += 1;
        }
        (primaries, subkeys)
    }
}

pub struct KeyringFile {
    path: PathBuf,
    is_public: bool,
    entities: Vec<Arc<Entity>>,
    index: Option<KeyIndex>,
    codec: Arc<dyn KeyCodec>,
    span: Span,
}

impl KeyringFile {
    pub fn new(path: impl Into<PathBuf>, is_public: bool, codec: Arc<dyn KeyCodec>) -> Self {
        let path = path.into();
        let span = tracing::debug_span!("keyring_file", path = %path.display(), is_public);
        KeyringFile {
            path,
            is_public,
            entities: Vec::new(),
            index: None,
            codec,
            span,
        }
    }

    /// Log inside `span` instead of the default per-file span
    pub fn with_span(mut self, span: Span) -> Self {
        self.set_span(span);
        self
    }

    pub(crate) fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_public(&self) -> bool {
        self.is_public
    }

    pub fn entities(&self) -> &[Arc<Entity>] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// Read and parse the file. A missing file leaves the keyring empty.
    pub fn load(&mut self) -> Result<()> {
        let _enter = self.span.enter();
        debug!("loading keyring");
        self.entities.clear();
        self.index = None;

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("no keyring found at {}", self.path.display());
                return Ok(());
            }
            Err(source) => {
                error!("cannot open keyring: {source}");
                return Err(KeyringError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let entities = self.codec.decode(&bytes).map_err(|source| {
            error!("cannot parse keyring: {source}");
            KeyringError::Format {
                path: self.path.clone(),
                source,
            }
        })?;
        self.entities = entities.into_iter().map(Arc::new).collect();
        debug!(entities = self.entities.len(), "loaded keyring");
        Ok(())
    }

    /// Rebuild both lookup maps from the loaded entities
    pub fn index(&mut self) {
        let _enter = self.span.enter();
        let mut index = KeyIndex::default();
        let (mut primaries, mut subkeys) = (0, 0);
        for entity in &self.entities {
            let (p, s) = index.insert(entity);
            primaries += p;
            subkeys += s;
        }
        debug!(primaries, subkeys, "indexed keyring");
        self.index = Some(index);
    }

    pub fn load_and_index(&mut self) -> Result<()> {
        self.load()?;
        self.index();
        Ok(())
    }

    /// Append an entity, keeping the index current if one exists
    pub fn insert(&mut self, entity: Entity) -> Arc<Entity> {
        let entity = Arc::new(entity);
        if let Some(index) = self.index.as_mut() {
            index.insert(&entity);
        }
        self.entities.push(Arc::clone(&entity));
        entity
    }

    pub fn find_by_fingerprint(&self, fp: &Fingerprint, secret_only: bool) -> KeyLookup {
        let entity = self.index.as_ref().and_then(|ix| ix.by_fingerprint.get(fp));
        KeyLookup::classify(entity, secret_only)
    }

    pub fn find_by_id(&self, id: KeyId, secret_only: bool) -> KeyLookup {
        let entity = self.index.as_ref().and_then(|ix| ix.by_id.get(&id));
        KeyLookup::classify(entity, secret_only)
    }

    /// The specific key `id`, provided its private material is present here
    pub fn lookup_by_key_id(&self, id: KeyId) -> Option<LockedKey> {
        let entity = self.index.as_ref()?.by_id.get(&id)?;
        LockedKey::for_key(Arc::clone(entity), id)
    }

    /// First key with private material that the key family considers active
    pub fn search_with_key_family(&self, family: &dyn ComputedKeyFamily) -> Option<LockedKey> {
        self.entities.iter().find_map(|entity| {
            let id = entity
                .keys()
                .filter(|(_, sk)| sk.is_some())
                .map(|(pk, _)| pk)
                .find(|pk| family.is_active(&pk.fingerprint()))?
                .key_id();
            LockedKey::for_key(Arc::clone(entity), id)
        })
    }

    pub fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        self.codec
            .encode(&self.entities, out)
            .map_err(|source| KeyringError::Format {
                path: self.path.clone(),
                source,
            })
    }

    /// Atomically replace the file: write a sibling temp file, then rename
    pub fn save(&self) -> Result<()> {
        let _enter = self.span.enter();
        let io_err = |source: io::Error| KeyringError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_err)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = if self.is_public { 0o644 } else { 0o600 };
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(mode))
                .map_err(io_err)?;
        }
        self.write_to(tmp.as_file_mut())?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        debug!(entities = self.entities.len(), "saved keyring");
        Ok(())
    }
}

impl KeyRing for KeyringFile {
    fn keys_by_id(&self, id: KeyId) -> Vec<Key> {
        self.entities.keys_by_id(id)
    }

    fn decryption_keys(&self) -> Vec<Key> {
        self.entities.decryption_keys()
    }
}

impl std::fmt::Debug for KeyringFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringFile")
            .field("path", &self.path)
            .field("is_public", &self.is_public)
            .field("entities", &self.entities.len())
            .field("indexed", &self.index.is_some())
            .finish()
    }
}
