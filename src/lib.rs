//! This crate extracts an ordered sequence of transaction batches from a stream
//! of consensus certificates and persists them as a durable, append-only,
//! resumable mapping from batch index to batch record, ready to be fed to a
//! downstream execution driver one batch at a time.

pub mod types; // Certificates, resolution variants, and batch records.
pub mod config; // Defines and loads pipeline settings.
pub mod error; // Fatal error taxonomy for the pipeline.
pub mod stream; // Incremental reader for the certificate file.
pub mod resolve; // In-certificate resolution and the external lookup client.
pub mod state; // Extraction output, dedup set, and atomic snapshots.
pub mod pipeline; // The driver loop, retry policy, and shutdown token.

// Re-export commonly used types and configurations for easier access.
pub use types::*;
pub use config::Config;
pub use error::ExtractError;
pub use pipeline::{Pipeline, PipelineOutcome, RetryPolicy, ShutdownToken};
pub use resolve::LookupClient;
pub use state::ExtractionState;
