//! Modification times for repository objects.

use bytes::Bytes;
use rpki::repository::cert::Cert;
use rpki::repository::crl::Crl;
use rpki::repository::sigobj::SignedObject;
use rpki::repository::x509::Time;
use rsyncit_core::ContentHash;
use rsyncit_core::clock::{truncate_to_hour, truncate_to_seconds};
use std::fmt;
use time::{Duration, OffsetDateTime};

use crate::error::TimestampError;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Repository object type, determined by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectType {
    Manifest,
    Roa,
    Aspa,
    Gbr,
    Certificate,
    Crl,
    Unknown,
}

impl ObjectType {
    pub fn from_uri(uri: &str) -> Self {
        let extension = uri
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "mft" => Self::Manifest,
            "roa" => Self::Roa,
            "asa" => Self::Aspa,
            "gbr" => Self::Gbr,
            "cer" => Self::Certificate,
            "crl" => Self::Crl,
            _ => Self::Unknown,
        }
    }
}

fn decode_error<E: fmt::Display>(kind: &'static str) -> impl FnOnce(E) -> TimestampError {
    move |e| TimestampError::Decode {
        kind,
        message: e.to_string(),
    }
}

fn to_offset_date_time(t: Time) -> Result<OffsetDateTime, TimestampError> {
    Ok(OffsetDateTime::from_unix_timestamp(t.timestamp())?)
}

/// Time carried by the object itself, or `None` for unknown types.
///
/// Signed objects use the CMS signing-time, certificates their notBefore and
/// CRLs their thisUpdate. Nothing is validated beyond decoding.
pub fn object_timestamp(
    object_type: ObjectType,
    bytes: &[u8],
) -> Result<Option<OffsetDateTime>, TimestampError> {
    let source = Bytes::copy_from_slice(bytes);
    let t = match object_type {
        ObjectType::Manifest | ObjectType::Roa | ObjectType::Aspa | ObjectType::Gbr => {
            SignedObject::decode(source, false)
                .map_err(decode_error("signed object"))?
                .signing_time()
                .ok_or(TimestampError::MissingSigningTime)?
        }
        ObjectType::Certificate => Cert::decode(source)
            .map_err(decode_error("certificate"))?
            .validity()
            .not_before(),
        ObjectType::Crl => Crl::decode(source)
            .map_err(decode_error("CRL"))?
            .this_update(),
        ObjectType::Unknown => return Ok(None),
    };
    to_offset_date_time(t).map(Some)
}

/// Determine the time to use for an object at `uri`.
///
/// Unknown types and objects that fail to parse get `fallback`; parse failures
/// are reported through `on_error`.
pub fn resolve_timestamp(
    uri: &str,
    bytes: &[u8],
    fallback: OffsetDateTime,
    on_error: impl FnOnce(&TimestampError),
) -> OffsetDateTime {
    match object_timestamp(ObjectType::from_uri(uri), bytes) {
        Ok(Some(t)) => t,
        Ok(None) => fallback,
        Err(e) => {
            on_error(&e);
            fallback
        }
    }
}

/// Time used for objects that do not carry one: the snapshot's Last-Modified,
/// or the current hour.
pub fn fallback_timestamp(
    last_modified: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> OffsetDateTime {
    last_modified.unwrap_or_else(|| truncate_to_hour(now))
}

/// Replace the sub-second part of `t` with an offset derived from `hash`.
///
/// The hash is read as a signed big-endian integer and reduced modulo one
/// second of nanoseconds, so identical content always gets the same offset.
pub fn incorporate_hash_in_timestamp(t: OffsetDateTime, hash: &ContentHash) -> OffsetDateTime {
    truncate_to_seconds(t) + Duration::nanoseconds(signed_mod_nanos(hash.as_bytes()) as i64)
}

fn signed_mod_nanos(bytes: &[u8]) -> u64 {
    let unsigned = bytes
        .iter()
        .fold(0u64, |acc, &b| (acc * 256 + b as u64) % NANOS_PER_SECOND);
    if bytes.first().is_some_and(|b| b & 0x80 != 0) {
        // two's complement: value - 2^(8 * len)
        let offset = bytes
            .iter()
            .fold(1u64, |acc, _| acc * 256 % NANOS_PER_SECOND);
        (unsigned + NANOS_PER_SECOND - offset) % NANOS_PER_SECOND
    } else {
        unsigned
    }
}
