//! Binary archive format for benchmark artifacts.
//!
//! Results and scenario sets are stored as gzip-compressed JSON envelopes:
//!
//! ```text
//! gzip( { "format_version": 1, "kind": "benchmark_result", "saved_at": "...", "payload": {...} } )
//! ```
//!
//! The header is validated before the payload is decoded, so a file written
//! by a newer format version fails with a clear error instead of a field
//! mismatch deep inside the payload.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PersistenceError;

/// Current archive format version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    format_version: u32,
    kind: &'a str,
    saved_at: DateTime<Utc>,
    payload: &'a T,
}

#[derive(Deserialize)]
struct Header {
    format_version: u32,
    kind: String,
}

/// Writes `payload` to `path` as an archive of the given kind.
pub fn write_archive<T: Serialize>(path: &Path, kind: &str, payload: &T) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let envelope = EnvelopeRef {
        format_version: FORMAT_VERSION,
        kind,
        saved_at: Utc::now(),
        payload,
    };
    serde_json::to_writer(&mut encoder, &envelope)?;
    let mut writer = encoder.finish()?;
    writer.flush()?;
    Ok(())
}

/// Reads an archive of the given kind from `path`.
pub fn read_archive<T: DeserializeOwned>(path: &Path, kind: &str) -> Result<T, PersistenceError> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let mut envelope: Value = serde_json::from_reader(decoder)?;

    let header: Header = serde_json::from_value(envelope.clone())
        .map_err(|e| PersistenceError::MalformedHeader(e.to_string()))?;
    if header.format_version != FORMAT_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: header.format_version,
            expected: FORMAT_VERSION,
        });
    }
    if header.kind != kind {
        return Err(PersistenceError::WrongKind {
            expected: kind.to_string(),
            found: header.kind,
        });
    }

    let payload = envelope
        .get_mut("payload")
        .map(Value::take)
        .ok_or_else(|| PersistenceError::MalformedHeader("missing payload".to_string()))?;
    Ok(serde_json::from_value(payload)?)
}
