//! Flight-log chain: append-only, hash-linked log entries per application.
//!
//! Each accepted entry carries the digest of its predecessor. The first
//! entry carries none. An entry is only accepted if its `previous_hash`
//! names the current tail, so history cannot be rewritten or reordered
//! without every later digest changing.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::canonical::canonical_entry_bytes;
use crate::crypto::Blake3Hash;
use crate::error::ChainError;
use crate::types::{ApplicationId, EntryDigest};

/// Domain separator for entry digests.
pub const DIGEST_DOMAIN: &[u8] = b"skypermit-flight-log-v1:";

/// A flight-log entry as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightLogEntry {
    pub application_id: ApplicationId,
    pub drone_uin: String,

    /// Submitter-supplied signature over the log payload.
    pub signature: String,

    /// Digest of the entry this one extends. `None` for the first entry.
    pub previous_hash: Option<EntryDigest>,
}

impl FlightLogEntry {
    pub fn new(
        application_id: ApplicationId,
        drone_uin: impl Into<String>,
        signature: impl Into<String>,
        previous_hash: Option<EntryDigest>,
    ) -> Self {
        Self {
            application_id,
            drone_uin: drone_uin.into(),
            signature: signature.into(),
            previous_hash,
        }
    }

    /// Digest of this entry bound to the hash of its payload.
    pub fn digest(&self, payload_hash: &Blake3Hash) -> EntryDigest {
        let bytes = canonical_entry_bytes(self, payload_hash);
        EntryDigest(Blake3Hash::hash_with_domain(DIGEST_DOMAIN, &bytes).0)
    }
}

/// An accepted entry together with its payload and position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Position in the chain, starting at 1.
    pub seq: u64,
    pub entry: FlightLogEntry,
    pub payload_hash: Blake3Hash,
    pub payload: Bytes,
    pub digest: EntryDigest,
    pub accepted_at: i64,
}

impl LogRecord {
    /// Seal an entry into a record, computing its hashes.
    pub fn seal(seq: u64, entry: FlightLogEntry, payload: Bytes, accepted_at: i64) -> Self {
        let payload_hash = Blake3Hash::hash(&payload);
        let digest = entry.digest(&payload_hash);
        Self {
            seq,
            entry,
            payload_hash,
            payload,
            digest,
            accepted_at,
        }
    }

    /// Re-derive both hashes from content and compare with the stored ones.
    pub fn verify_digest(&self) -> bool {
        let payload_hash = Blake3Hash::hash(&self.payload);
        payload_hash == self.payload_hash && self.entry.digest(&payload_hash) == self.digest
    }
}

/// Check that `entry` extends the chain whose tail digest is `tail`.
pub fn check_extends(
    tail: Option<&EntryDigest>,
    entry: &FlightLogEntry,
) -> Result<(), ChainError> {
    if entry.previous_hash.as_ref() != tail {
        return Err(ChainError::Broken {
            expected: tail.copied(),
            got: entry.previous_hash,
        });
    }
    Ok(())
}

/// Verify a whole chain, in order.
///
/// Checks that sequence numbers are contiguous from 1, that every record
/// belongs to the same application, that stored digests match content, and
/// that each record links to its predecessor.
pub fn verify_chain(records: &[LogRecord]) -> Result<(), ChainError> {
    let mut tail: Option<&EntryDigest> = None;
    let application_id = records.first().map(|r| r.entry.application_id);

    for (index, record) in records.iter().enumerate() {
        let expected_seq = index as u64 + 1;
        if record.seq != expected_seq {
            return Err(ChainError::InvalidSequence {
                expected: expected_seq,
                got: record.seq,
            });
        }
        if Some(record.entry.application_id) != application_id {
            return Err(ChainError::ForeignEntry(record.seq));
        }
        if !record.verify_digest() {
            return Err(ChainError::DigestMismatch(record.seq));
        }
        check_extends(tail, &record.entry)?;
        tail = Some(&record.digest);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const APP: ApplicationId = ApplicationId::from_bytes([0x42; 16]);

    fn build_chain(payloads: &[Vec<u8>]) -> Vec<LogRecord> {
        let mut records: Vec<LogRecord> = Vec::new();
        for (i, payload) in payloads.iter().enumerate() {
            let previous_hash = records.last().map(|r| r.digest);
            let entry = FlightLogEntry::new(APP, "UA0001", format!("sig-{}", i), previous_hash);
            records.push(LogRecord::seal(
                i as u64 + 1,
                entry,
                Bytes::from(payload.clone()),
                1_000 + i as i64,
            ));
        }
        records
    }

    #[test]
    fn test_first_entry_has_no_previous() {
        let entry = FlightLogEntry::new(APP, "UA0001", "sig", None);
        assert!(check_extends(None, &entry).is_ok());

        let forged_tail = Some(EntryDigest::from_bytes([9; 32]));
        let forged = FlightLogEntry::new(APP, "UA0001", "sig", forged_tail);
        assert_eq!(
            check_extends(None, &forged),
            Err(ChainError::Broken {
                expected: None,
                got: Some(EntryDigest::from_bytes([9; 32])),
            })
        );
    }

    #[test]
    fn test_entry_must_name_tail() {
        let chain = build_chain(&[b"one".to_vec()]);
        let tail = chain[0].digest;

        let missing = FlightLogEntry::new(APP, "UA0001", "sig", None);
        assert!(matches!(
            check_extends(Some(&tail), &missing),
            Err(ChainError::Broken { expected: Some(t), got: None }) if t == tail
        ));

        let good = FlightLogEntry::new(APP, "UA0001", "sig", Some(tail));
        assert!(check_extends(Some(&tail), &good).is_ok());
    }

    #[test]
    fn test_digest_binds_payload() {
        let entry = FlightLogEntry::new(APP, "UA0001", "sig", None);
        let a = LogRecord::seal(1, entry.clone(), Bytes::from_static(b"a"), 0);
        let b = LogRecord::seal(1, entry, Bytes::from_static(b"b"), 0);
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn test_digest_ignores_acceptance_time() {
        let entry = FlightLogEntry::new(APP, "UA0001", "sig", None);
        let a = LogRecord::seal(1, entry.clone(), Bytes::from_static(b"a"), 0);
        let b = LogRecord::seal(1, entry, Bytes::from_static(b"a"), 99);
        assert_eq!(a.digest, b.digest);
    }

    #[test]
    fn test_verify_detects_tampered_payload() {
        let mut chain = build_chain(&[b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
        chain[1].payload = Bytes::from_static(b"rewritten");
        assert_eq!(verify_chain(&chain), Err(ChainError::DigestMismatch(2)));
    }

    #[test]
    fn test_verify_detects_reordering() {
        let mut chain = build_chain(&[b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
        chain.swap(1, 2);
        assert!(matches!(
            verify_chain(&chain),
            Err(ChainError::InvalidSequence { expected: 2, got: 3 })
        ));
    }

    #[test]
    fn test_verify_detects_removed_entry() {
        let mut chain = build_chain(&[b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
        chain.remove(1);
        chain[1].seq = 2;
        assert!(matches!(verify_chain(&chain), Err(ChainError::Broken { .. })));
    }

    #[test]
    fn test_verify_detects_foreign_entry() {
        let mut chain = build_chain(&[b"one".to_vec(), b"two".to_vec()]);
        let other = ApplicationId::from_bytes([0x43; 16]);
        let entry = FlightLogEntry::new(other, "UA0001", "sig", Some(chain[0].digest));
        chain[1] = LogRecord::seal(2, entry, Bytes::from_static(b"two"), 0);
        assert_eq!(verify_chain(&chain), Err(ChainError::ForeignEntry(2)));
    }

    #[test]
    fn test_empty_chain_verifies() {
        assert!(verify_chain(&[]).is_ok());
    }

    proptest! {
        #[test]
        fn prop_built_chains_are_linear(
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..16)
        ) {
            let chain = build_chain(&payloads);
            prop_assert!(verify_chain(&chain).is_ok());

            for pair in chain.windows(2) {
                prop_assert_eq!(pair[1].entry.previous_hash, Some(pair[0].digest));
            }
            prop_assert_eq!(chain[0].entry.previous_hash, None);
        }

        #[test]
        fn prop_wrong_previous_hash_is_rejected(
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..16), 1..8),
            forged in any::<[u8; 32]>(),
        ) {
            let chain = build_chain(&payloads);
            let tail = chain.last().map(|r| r.digest);
            let forged = EntryDigest::from_bytes(forged);
            prop_assume!(Some(forged) != tail);

            let entry = FlightLogEntry::new(APP, "UA0001", "sig", Some(forged));
            let is_broken = matches!(
                check_extends(tail.as_ref(), &entry),
                Err(ChainError::Broken { .. })
            );
            prop_assert!(is_broken);
        }
    }
}
