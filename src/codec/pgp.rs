// src/codec/pgp.rs
//! OpenPGP keyrings, binary or ASCII-armored
//!
//! Each transferable public or secret key becomes one [`Entity`]. Key ids
//! and fingerprints are the OpenPGP v4 ones, read off the packets; usage
//! flags come from the binding signatures that are valid under the standard
//! policy. A key without a valid binding keeps empty flags. The entity holds
//! on to the certificate's packets, which is what gets written back on save.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use openpgp::cert::prelude::*;
use openpgp::packet::key::{PublicParts, UnspecifiedRole};
use openpgp::parse::{PacketParser, Parse};
use openpgp::policy::StandardPolicy;
use openpgp::serialize::SerializeInto;
use openpgp::Packet;
use sequoia_openpgp as openpgp;
use tracing::debug;

use super::{CodecError, KeyCodec};
use crate::entity::{Entity, Fingerprint, KeyFlags, PrivateKey, PublicKey};

type PgpKey = openpgp::packet::Key<PublicParts, UnspecifiedRole>;

#[derive(Debug, Default, Clone, Copy)]
pub struct OpenPgpCodec;

impl KeyCodec for OpenPgpCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Entity>, CodecError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let ppr =
            PacketParser::from_bytes(bytes).map_err(|err| CodecError::OpenPgp(err.into()))?;
        CertParser::from(ppr)
            .map(|cert| {
                let cert = cert.map_err(|err| CodecError::OpenPgp(err.into()))?;
                entity_from_cert(&cert)
            })
            .collect()
    }

    fn encode(&self, entities: &[Arc<Entity>], out: &mut dyn Write) -> Result<(), CodecError> {
        for entity in entities {
            let packets = entity.packets().ok_or_else(|| CodecError::MissingPackets {
                identity: entity.identity().to_owned(),
            })?;
            out.write_all(packets)?;
        }
        Ok(())
    }
}

fn entity_from_cert(cert: &Cert) -> Result<Entity, CodecError> {
    let flags = usage_flags(cert);
    let identity = cert
        .userids()
        .next()
        .map(|ua| String::from_utf8_lossy(ua.userid().value()).into_owned())
        .unwrap_or_else(|| cert.fingerprint().to_hex());

    let mut entity = Entity::new(identity);
    for ka in cert.keys() {
        let key = ka.key();
        let fingerprint = fingerprint_of(key)?;
        let public = PublicKey::new(
            fingerprint,
            flags.get(&fingerprint).copied().unwrap_or_default(),
        )
        .with_algorithm(key.pk_algo().to_string())
        .with_created_at(DateTime::<Utc>::from(key.creation_time()));
        let private = private_key(key, ka.primary())?;

        entity = if ka.primary() {
            entity.with_primary(public, private)
        } else {
            entity.with_subkey(Some(public), private)
        };
    }

    // secret material only comes along when the certificate carries it
    let packets = cert
        .as_tsk()
        .to_vec()
        .map_err(|err| CodecError::OpenPgp(err.into()))?;
    Ok(entity.with_packets(packets))
}

fn fingerprint_of(key: &PgpKey) -> Result<Fingerprint, CodecError> {
    let fp = key.fingerprint();
    Fingerprint::from_slice(fp.as_bytes()).ok_or_else(|| CodecError::UnsupportedKey {
        fingerprint: fp.to_hex(),
    })
}

/// The key's secret packet, re-serialized on its own
fn private_key(key: &PgpKey, primary: bool) -> Result<Option<PrivateKey>, CodecError> {
    let Some(secret) = key.optional_secret() else {
        return Ok(None);
    };
    let protected = secret.is_encrypted();

    let key = key
        .clone()
        .parts_into_secret()
        .map_err(|err| CodecError::OpenPgp(err.into()))?;
    let packet: Packet = if primary {
        key.role_into_primary().into()
    } else {
        key.role_into_subordinate().into()
    };
    let material = packet
        .to_vec()
        .map_err(|err| CodecError::OpenPgp(err.into()))?;
    Ok(Some(PrivateKey::new(material, protected)))
}

fn usage_flags(cert: &Cert) -> HashMap<Fingerprint, KeyFlags> {
    let policy = StandardPolicy::new();
    match cert.with_policy(&policy, None) {
        Ok(valid) => valid
            .keys()
            .filter_map(|ka| {
                let fingerprint = fingerprint_of(ka.key()).ok()?;
                let flags = ka.key_flags().map(|f| usage_bits(&f)).unwrap_or_default();
                Some((fingerprint, flags))
            })
            .collect(),
        Err(err) => {
            debug!(cert = %cert.fingerprint(), "no valid binding signatures: {err}");
            HashMap::new()
        }
    }
}

fn usage_bits(flags: &openpgp::types::KeyFlags) -> KeyFlags {
    [
        (flags.for_certification(), KeyFlags::CERTIFY),
        (flags.for_signing(), KeyFlags::SIGN),
        (flags.for_transport_encryption(), KeyFlags::ENCRYPT_COMMUNICATIONS),
        (flags.for_storage_encryption(), KeyFlags::ENCRYPT_STORAGE),
    ]
    .into_iter()
    .filter(|(set, _)| *set)
    .fold(KeyFlags::empty(), |acc, (_, bit)| acc | bit)
}
