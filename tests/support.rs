// tests/support.rs
//! Test utilities — entity builders and fake collaborators
#![allow(dead_code)] // each test binary uses a different subset

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use secret_keyring::{
    BoxError, CodecError, ComputedKeyFamily, Entity, Fingerprint, KeyCodec, KeyId, KeyUnlocker,
    KeyringFile, LockedKey, OpenPgpCodec, Subject, SubjectLoader,
};
use sequoia_openpgp as openpgp;
use openpgp::cert::prelude::*;
use openpgp::parse::Parse;
use openpgp::serialize::SerializeInto;

pub fn codec() -> Arc<dyn KeyCodec> {
    Arc::new(OpenPgpCodec)
}

/// Sign+certify primary with one transport-encryption subkey, unprotected
pub fn generate_cert(identity: &str) -> Cert {
    let (cert, _revocation) = CertBuilder::new()
        .add_userid(identity)
        .set_primary_key_flags(
            openpgp::types::KeyFlags::empty()
                .set_certification()
                .set_signing(),
        )
        .add_transport_encryption_subkey()
        .generate()
        .expect("generate cert");
    cert
}

/// Decode bytes holding exactly one certificate
pub fn entity_from_bytes(bytes: &[u8]) -> Entity {
    let mut entities = OpenPgpCodec.decode(bytes).expect("decode cert");
    assert_eq!(entities.len(), 1);
    entities.remove(0)
}

/// Secret keys for `identity`, private material on the primary and the subkey
pub fn secret_entity(identity: &str) -> Entity {
    let tsk = generate_cert(identity).as_tsk().to_vec().expect("serialize tsk");
    entity_from_bytes(&tsk)
}

/// Same keys as `entity`, private material stripped
pub fn public_half(entity: &Entity) -> Entity {
    let cert = Cert::from_bytes(entity.packets().expect("packets")).expect("parse cert");
    entity_from_bytes(&cert.to_vec().expect("serialize cert"))
}

pub fn primary_fp(entity: &Entity) -> Fingerprint {
    entity.primary_key().expect("primary key").fingerprint()
}

pub fn subkey_fp(entity: &Entity) -> Fingerprint {
    entity.subkeys()[0]
        .public
        .as_ref()
        .expect("subkey public")
        .fingerprint()
}

/// Write `entities` to `path` through a real save
pub fn write_keyring(path: &Path, entities: Vec<Entity>) {
    let mut file = KeyringFile::new(path, false, codec());
    for entity in entities {
        file.insert(entity);
    }
    file.save().expect("save keyring");
}

/// Codec that counts decodes and stalls, to widen load races
#[derive(Default)]
pub struct CountingCodec {
    pub decodes: AtomicUsize,
}

impl CountingCodec {
    pub fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }
}

impl KeyCodec for CountingCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Entity>, CodecError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        OpenPgpCodec.decode(bytes)
    }

    fn encode(
        &self,
        entities: &[Arc<Entity>],
        out: &mut dyn std::io::Write,
    ) -> Result<(), CodecError> {
        OpenPgpCodec.encode(entities, out)
    }
}

/// Codec whose first decode blocks until [`GatedCodec::open`] is called;
/// every later decode goes straight through
#[derive(Default)]
pub struct GatedCodec {
    held: AtomicBool,
    gate: Mutex<bool>,
    opened: Condvar,
}

impl GatedCodec {
    /// True once some decode is parked at the gate
    pub fn is_holding(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    pub fn open(&self) {
        *self.gate.lock().unwrap() = true;
        self.opened.notify_all();
    }
}

impl KeyCodec for GatedCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Entity>, CodecError> {
        if !self.held.swap(true, Ordering::SeqCst) {
            let mut open = self.gate.lock().unwrap();
            while !*open {
                open = self.opened.wait(open).unwrap();
            }
        }
        OpenPgpCodec.decode(bytes)
    }

    fn encode(
        &self,
        entities: &[Arc<Entity>],
        out: &mut dyn std::io::Write,
    ) -> Result<(), CodecError> {
        OpenPgpCodec.encode(entities, out)
    }
}

#[derive(Default)]
pub struct FakeKeyFamily {
    pub device_key: Option<KeyId>,
    pub device_error: bool,
    pub active: HashSet<Fingerprint>,
}

impl FakeKeyFamily {
    pub fn with_device_key(mut self, id: KeyId) -> Self {
        self.device_key = Some(id);
        self
    }

    pub fn with_active(mut self, fp: Fingerprint) -> Self {
        self.active.insert(fp);
        self
    }
}

impl ComputedKeyFamily for FakeKeyFamily {
    fn active_device_key(&self) -> Result<Option<KeyId>, BoxError> {
        if self.device_error {
            return Err("device not provisioned".into());
        }
        Ok(self.device_key)
    }

    fn is_active(&self, fingerprint: &Fingerprint) -> bool {
        self.active.contains(fingerprint)
    }
}

pub enum Synced {
    Nothing,
    Key(LockedKey),
    Fails,
}

pub struct FakeUser {
    pub name: String,
    pub family: Option<FakeKeyFamily>,
    pub synced: Synced,
    pub synced_calls: AtomicUsize,
}

impl FakeUser {
    pub fn new(name: &str) -> Self {
        FakeUser {
            name: name.to_owned(),
            family: Some(FakeKeyFamily::default()),
            synced: Synced::Nothing,
            synced_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_family(mut self, family: FakeKeyFamily) -> Self {
        self.family = Some(family);
        self
    }

    pub fn without_family(mut self) -> Self {
        self.family = None;
        self
    }

    pub fn with_synced(mut self, synced: Synced) -> Self {
        self.synced = synced;
        self
    }

    pub fn synced_calls(&self) -> usize {
        self.synced_calls.load(Ordering::SeqCst)
    }
}

impl Subject for FakeUser {
    fn username(&self) -> &str {
        &self.name
    }

    fn computed_key_family(&self) -> Option<&dyn ComputedKeyFamily> {
        self.family.as_ref().map(|f| f as &dyn ComputedKeyFamily)
    }

    fn synced_secret_key(&self) -> Result<Option<LockedKey>, BoxError> {
        self.synced_calls.fetch_add(1, Ordering::SeqCst);
        match &self.synced {
            Synced::Nothing => Ok(None),
            Synced::Key(key) => Ok(Some(key.clone())),
            Synced::Fails => Err("server returned 503".into()),
        }
    }
}

/// Loader handing out a fixed current user, or failing when there is none
pub struct FakeLoader {
    pub current: Option<Arc<FakeUser>>,
}

impl SubjectLoader for FakeLoader {
    fn load_current_subject(&self) -> Result<Arc<dyn Subject>, BoxError> {
        match &self.current {
            Some(user) => {
                let subject: Arc<dyn Subject> = user.clone();
                Ok(subject)
            }
            None => Err("not logged in".into()),
        }
    }
}

pub fn no_loader() -> Arc<dyn SubjectLoader> {
    Arc::new(FakeLoader { current: None })
}

/// Unlocker recording every prompt; "unlocks" by returning the key's fingerprint
pub struct FakeUnlocker {
    pub accept: bool,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl FakeUnlocker {
    pub fn accepting() -> Self {
        FakeUnlocker {
            accept: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        FakeUnlocker {
            accept: false,
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl KeyUnlocker for FakeUnlocker {
    type Unlocked = Fingerprint;

    fn unlock(
        &self,
        key: &LockedKey,
        reason: &str,
        provenance: &str,
    ) -> Result<Fingerprint, BoxError> {
        self.prompts
            .lock()
            .unwrap()
            .push((reason.to_owned(), provenance.to_owned()));
        if self.accept {
            Ok(key.fingerprint())
        } else {
            Err("wrong passphrase".into())
        }
    }
}
