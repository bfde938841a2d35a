//! Uploaded flight-log documents.
//!
//! A document is the JSON log produced by the drone's flight controller.
//! The kernel reads two fields from it and stores the raw bytes untouched:
//!
//! ```json
//! { "signature": "...", "previousHash": "<64 hex chars>" }
//! ```
//!
//! `previousHash` is empty or absent for the first log of a permit.

use bytes::Bytes;
use serde::Deserialize;

use skypermit_core::{EntryDigest, ValidationError};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    signature: String,
    #[serde(default)]
    previous_hash: Option<String>,
}

/// A flight log ready to be appended to a permit's chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightLogSubmission {
    pub signature: String,
    pub previous_hash: Option<EntryDigest>,
    /// The raw document, stored as-is.
    pub payload: Bytes,
}

impl FlightLogSubmission {
    pub fn new(
        signature: impl Into<String>,
        previous_hash: Option<EntryDigest>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            signature: signature.into(),
            previous_hash,
            payload: payload.into(),
        }
    }

    /// Parse an uploaded document, rejecting it if larger than `max_bytes`.
    pub fn parse(document: Bytes, max_bytes: usize) -> Result<Self, ValidationError> {
        if document.len() > max_bytes {
            return Err(ValidationError::FlightLogTooLarge {
                size: document.len(),
                limit: max_bytes,
            });
        }

        let parsed: Document = serde_json::from_slice(&document)
            .map_err(|e| ValidationError::MalformedFlightLog(e.to_string()))?;

        if parsed.signature.trim().is_empty() {
            return Err(ValidationError::MalformedFlightLog(
                "signature is empty".to_string(),
            ));
        }

        let previous_hash = match parsed.previous_hash.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(hex) => Some(EntryDigest::from_hex(hex).map_err(|e| {
                ValidationError::MalformedFlightLog(format!("previousHash: {}", e))
            })?),
        };

        Ok(Self {
            signature: parsed.signature,
            previous_hash,
            payload: document,
        })
    }
}
