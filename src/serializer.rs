//! Result container serialization.
//!
//! Combines per-scanner outcomes with snapshot metadata into one versioned
//! container and encodes it as JSON bytes. The transport that carries the
//! bytes back to the caller is out of scope.

use crate::types::{ResultFormat, ScannerOutcome, SnapshotMetadata};
use serde::Serialize;

const SCHEMA_VERSION: u32 = 2;

#[derive(Serialize)]
struct ResultContainer<'a> {
    schema_version: u32,
    metadata: &'a SnapshotMetadata,
    results: &'a [ScannerOutcome],
}

/// Serializes scan outcomes into the result container payload
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultSerializer;

impl ResultSerializer {
    pub fn new() -> Self {
        Self
    }

    pub fn serialize(
        &self,
        outcomes: &[ScannerOutcome],
        metadata: &SnapshotMetadata,
        format: ResultFormat,
    ) -> Result<Vec<u8>, serde_json::Error> {
        let container = ResultContainer {
            schema_version: SCHEMA_VERSION,
            metadata,
            results: outcomes,
        };

        match format {
            ResultFormat::Json => serde_json::to_vec(&container),
            ResultFormat::JsonPretty => serde_json::to_vec_pretty(&container),
        }
    }
}
