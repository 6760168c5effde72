// src/fingerprint.rs
//! Content fingerprint over the fields that affect what the screen renders.
//! Volatile timestamps are excluded so that re-observing identical content
//! never reads as a change.

use sha2::{Digest, Sha256};

use crate::record::EventRecord;

/// Hex SHA-256 over the display-relevant fields of a record.
pub fn fingerprint(record: &EventRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.name.as_bytes());
    hasher.update([0]);
    hasher.update(record.venue.as_bytes());
    hasher.update([0]);
    hasher.update(record.status.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(record.participant_count.to_le_bytes());
    hasher.update([0]);
    hasher.update(record.external_reference.as_bytes());
    hasher.update([0]);
    if let Some(blob) = &record.display_config {
        // serde_json writes map keys in insertion order; the producer emits
        // them deterministically, so the serialized form is stable.
        hasher.update(blob.to_string().as_bytes());
    }
    hex_string(&hasher.finalize())
}

fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
