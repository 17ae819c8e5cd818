//! Error types for the extraction pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors the pipeline can surface.
///
/// Everything below the driver level reports "not found" through `Option`
/// return values instead of raising, so the only errors that reach the
/// caller are a corrupt certificate stream and snapshot persistence
/// failures. Both are preceded by a durable snapshot of completed work.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The input file ended while the accumulation buffer still held
    /// content that never parsed as a complete object.
    #[error("incomplete certificate object at end of file: {path}")]
    MalformedInput { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write snapshot to {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize snapshot for {path}: {source}")]
    SnapshotEncode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
