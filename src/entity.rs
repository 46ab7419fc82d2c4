// src/entity.rs
//! Parsed key-material records
//!
//! An [`Entity`] is one identity with its primary key and subkeys, exactly as
//! the codec hands it over. Nothing in here touches the disk or performs any
//! cryptography: identifiers and fingerprints are plain values, and private
//! material stays passphrase-protected until an unlocker opens it.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::aliases::SecretKeyMaterial;
use crate::consts::{FINGERPRINT_LEN, KEY_ID_LEN};

/// 64-bit short key identifier, rendered as 16 uppercase hex digits
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(u64);

impl KeyId {
    pub const fn new(raw: u64) -> Self {
        KeyId(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Parse a hex identifier, accepting either case and an optional `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut buf = [0u8; KEY_ID_LEN];
        hex::decode_to_slice(strip_hex_prefix(s), &mut buf)?;
        Ok(KeyId(u64::from_be_bytes(buf)))
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({self})")
    }
}

impl FromStr for KeyId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyId::from_hex(s)
    }
}

/// Full 160-bit (v4) key fingerprint
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    pub const fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Fingerprint(bytes)
    }

    /// `None` unless `bytes` is exactly one fingerprint long
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Fingerprint)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; FINGERPRINT_LEN];
        hex::decode_to_slice(strip_hex_prefix(s), &mut bytes)?;
        Ok(Fingerprint(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// The short identifier is the low 64 bits of the fingerprint
    pub fn key_id(&self) -> KeyId {
        let mut tail = [0u8; KEY_ID_LEN];
        tail.copy_from_slice(&self.0[FINGERPRINT_LEN - KEY_ID_LEN..]);
        KeyId(u64::from_be_bytes(tail))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

impl FromStr for Fingerprint {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Fingerprint::from_hex(s)
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Usage bits carried by a key, using the OpenPGP flag values
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyFlags(u8);

impl KeyFlags {
    pub const CERTIFY: Self = KeyFlags(0x01);
    pub const SIGN: Self = KeyFlags(0x02);
    pub const ENCRYPT_COMMUNICATIONS: Self = KeyFlags(0x04);
    pub const ENCRYPT_STORAGE: Self = KeyFlags(0x08);
    pub const ENCRYPT: Self = KeyFlags(0x04 | 0x08);

    pub const fn empty() -> Self {
        KeyFlags(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        KeyFlags(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn intersects(self, other: KeyFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// A key without any flags predates usage flags and is usable for anything
    pub const fn allows(self, usage: KeyFlags) -> bool {
        self.is_empty() || self.intersects(usage)
    }
}

impl BitOr for KeyFlags {
    type Output = KeyFlags;

    fn bitor(self, rhs: KeyFlags) -> KeyFlags {
        KeyFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for KeyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyFlags({:#04x})", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    fingerprint: Fingerprint,
    algorithm: String,
    flags: KeyFlags,
    created_at: DateTime<Utc>,
}

impl PublicKey {
    pub fn new(fingerprint: Fingerprint, flags: KeyFlags) -> Self {
        PublicKey {
            fingerprint,
            algorithm: String::from("unknown"),
            flags,
            created_at: Utc::now(),
        }
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn key_id(&self) -> KeyId {
        self.fingerprint.key_id()
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn flags(&self) -> KeyFlags {
        self.flags
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Serialized secret key packet, zeroized on drop and never printed
pub struct PrivateKey {
    material: SecretKeyMaterial,
    protected: bool,
}

impl PrivateKey {
    pub fn new(material: Vec<u8>, protected: bool) -> Self {
        PrivateKey {
            material: SecretKeyMaterial::new(material),
            protected,
        }
    }

    /// Whether the material is still encrypted under a passphrase
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn expose_material(&self) -> &[u8] {
        &self.material
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("protected", &self.protected)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Subkey {
    pub public: Option<PublicKey>,
    pub private: Option<Arc<PrivateKey>>,
}

/// One identity with its primary key and subkeys
#[derive(Clone)]
pub struct Entity {
    identity: String,
    primary_key: Option<PublicKey>,
    private_key: Option<Arc<PrivateKey>>,
    subkeys: Vec<Subkey>,
    packets: Option<Arc<[u8]>>,
}

impl Entity {
    pub fn new(identity: impl Into<String>) -> Self {
        Entity {
            identity: identity.into(),
            primary_key: None,
            private_key: None,
            subkeys: Vec::new(),
            packets: None,
        }
    }

    /// Keep the transferable key this entity was decoded from, so a save can
    /// write it back unchanged (signatures and user ids included)
    pub fn with_packets(mut self, packets: impl Into<Arc<[u8]>>) -> Self {
        self.packets = Some(packets.into());
        self
    }

    pub fn packets(&self) -> Option<&[u8]> {
        self.packets.as_deref()
    }

    pub fn with_primary(mut self, public: PublicKey, private: Option<PrivateKey>) -> Self {
        self.primary_key = Some(public);
        self.private_key = private.map(Arc::new);
        self
    }

    pub fn with_subkey(mut self, public: Option<PublicKey>, private: Option<PrivateKey>) -> Self {
        self.subkeys.push(Subkey {
            public,
            private: private.map(Arc::new),
        });
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn primary_key(&self) -> Option<&PublicKey> {
        self.primary_key.as_ref()
    }

    pub fn private_key(&self) -> Option<&Arc<PrivateKey>> {
        self.private_key.as_ref()
    }

    pub fn subkeys(&self) -> &[Subkey] {
        &self.subkeys
    }

    /// Primary key first, then every subkey that has public material
    pub fn keys(&self) -> impl Iterator<Item = (&PublicKey, Option<&Arc<PrivateKey>>)> + '_ {
        let primary = self
            .primary_key
            .as_ref()
            .map(|pk| (pk, self.private_key.as_ref()));
        let subkeys = self
            .subkeys
            .iter()
            .filter_map(|sk| sk.public.as_ref().map(|pk| (pk, sk.private.as_ref())));
        primary.into_iter().chain(subkeys)
    }

    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        self.keys().map(|(pk, _)| pk.fingerprint()).collect()
    }

    pub fn has_private_material(&self) -> bool {
        self.keys().any(|(_, private)| private.is_some())
    }

    /// The key (primary or subkey) with the given id, if it carries private material
    pub fn private_key_for(&self, id: KeyId) -> Option<(&PublicKey, &Arc<PrivateKey>)> {
        self.keys()
            .filter(|(pk, _)| pk.key_id() == id)
            .find_map(|(pk, private)| private.map(|sk| (pk, sk)))
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("identity", &self.identity)
            .field("primary_key", &self.primary_key)
            .field("private_key", &self.private_key)
            .field("subkeys", &self.subkeys)
            .field("packets", &self.packets.as_ref().map(|p| p.len()))
            .finish()
    }
}

/// One key of an entity, as returned by keyring lookups
#[derive(Debug, Clone)]
pub struct Key {
    pub entity: Arc<Entity>,
    pub public_key: PublicKey,
    pub private_key: Option<Arc<PrivateKey>>,
}

/// A private key that still needs its passphrase before use
#[derive(Debug, Clone)]
pub struct LockedKey {
    entity: Arc<Entity>,
    fingerprint: Fingerprint,
    private_key: Arc<PrivateKey>,
}

impl LockedKey {
    /// Lock handle for one specific key of `entity`
    pub fn for_key(entity: Arc<Entity>, id: KeyId) -> Option<Self> {
        let (fingerprint, private_key) = entity
            .private_key_for(id)
            .map(|(pk, sk)| (pk.fingerprint(), Arc::clone(sk)))?;
        Some(LockedKey {
            entity,
            fingerprint,
            private_key,
        })
    }

    /// Lock handle for the first key of `entity` with private material,
    /// preferring the primary key
    pub fn from_entity(entity: Arc<Entity>) -> Option<Self> {
        let (fingerprint, private_key) = entity
            .keys()
            .find_map(|(pk, sk)| sk.map(|sk| (pk.fingerprint(), Arc::clone(sk))))?;
        Some(LockedKey {
            entity,
            fingerprint,
            private_key,
        })
    }

    pub fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn key_id(&self) -> KeyId {
        self.fingerprint.key_id()
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}
