//! Canonical CBOR encoding for deterministic flight-log digests.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats
//!
//! The same entry always produces identical bytes, so the digest that links
//! the next entry to it is reproducible by any verifier.

use ciborium::value::Value;

use crate::chain::FlightLogEntry;
use crate::crypto::Blake3Hash;

/// Current version of the entry encoding.
pub const ENTRY_VERSION: u8 = 1;

/// Entry field keys (integer keys for compact encoding).
mod keys {
    pub const VERSION: u64 = 0;
    pub const APPLICATION_ID: u64 = 1;
    pub const DRONE_UIN: u64 = 2;
    pub const SIGNATURE: u64 = 3;
    pub const PREVIOUS_HASH: u64 = 4;
    pub const PAYLOAD_HASH: u64 = 5;
}

/// Encode a flight-log entry, bound to its payload hash, to canonical bytes.
pub fn canonical_entry_bytes(entry: &FlightLogEntry, payload_hash: &Blake3Hash) -> Vec<u8> {
    let value = entry_to_cbor_value(entry, payload_hash);
    let mut buf = Vec::new();
    encode_value_to(&mut buf, &value);
    buf
}

fn entry_to_cbor_value(entry: &FlightLogEntry, payload_hash: &Blake3Hash) -> Value {
    let previous_hash = match &entry.previous_hash {
        Some(digest) => Value::Bytes(digest.0.to_vec()),
        None => Value::Null,
    };

    Value::Map(vec![
        (
            Value::Integer(keys::VERSION.into()),
            Value::Integer(ENTRY_VERSION.into()),
        ),
        (
            Value::Integer(keys::APPLICATION_ID.into()),
            Value::Bytes(entry.application_id.0.to_vec()),
        ),
        (
            Value::Integer(keys::DRONE_UIN.into()),
            Value::Text(entry.drone_uin.clone()),
        ),
        (
            Value::Integer(keys::SIGNATURE.into()),
            Value::Text(entry.signature.clone()),
        ),
        (Value::Integer(keys::PREVIOUS_HASH.into()), previous_hash),
        (
            Value::Integer(keys::PAYLOAD_HASH.into()),
            Value::Bytes(payload_hash.0.to_vec()),
        ),
    ])
}

/// Recursively encode a CBOR value.
///
/// Only the value shapes built by this module are supported.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr),
        Value::Map(entries) => encode_map_canonical(buf, entries),
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        _ => unreachable!("entry encoding never produces floats or tags"),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item);
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);
    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApplicationId, EntryDigest};

    fn entry(previous_hash: Option<EntryDigest>) -> FlightLogEntry {
        FlightLogEntry {
            application_id: ApplicationId::from_bytes([0x11; 16]),
            drone_uin: "UA0001".into(),
            signature: "c2lnbmF0dXJl".into(),
            previous_hash,
        }
    }

    #[test]
    fn test_entry_encoding_deterministic() {
        let payload_hash = Blake3Hash::hash(b"log");
        let b1 = canonical_entry_bytes(&entry(None), &payload_hash);
        let b2 = canonical_entry_bytes(&entry(None), &payload_hash);
        assert_eq!(b1, b2);
    }

    #[test]
    fn test_entry_encoding_is_a_six_entry_map() {
        let bytes = canonical_entry_bytes(&entry(None), &Blake3Hash::hash(b""));
        assert_eq!(bytes[0], 0xa6);
        // key 0, version 1
        assert_eq!(&bytes[1..3], &[0x00, ENTRY_VERSION]);
        // key 1, 16-byte string
        assert_eq!(&bytes[3..5], &[0x01, 0x50]);
    }

    #[test]
    fn test_previous_hash_changes_encoding() {
        let payload_hash = Blake3Hash::hash(b"log");
        let first = canonical_entry_bytes(&entry(None), &payload_hash);
        let linked = canonical_entry_bytes(
            &entry(Some(EntryDigest::from_bytes([0x22; 32]))),
            &payload_hash,
        );
        assert_ne!(first, linked);
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);
    }

    #[test]
    fn test_map_key_ordering() {
        let mut buf = Vec::new();
        let entries = vec![
            (Value::Integer(5.into()), Value::Null),
            (Value::Integer(0.into()), Value::Null),
            (Value::Integer(3.into()), Value::Null),
        ];
        encode_map_canonical(&mut buf, &entries);

        assert_eq!(buf, vec![0xa3, 0x00, 0xf6, 0x03, 0xf6, 0x05, 0xf6]);
    }
}
