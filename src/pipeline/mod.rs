//! Pipeline Driver Module
//!
//! This module ties the stream reader, resolver, lookup client, and
//! extraction state together into the single-task extraction loop:
//! certificates in file order, digests in ascending order, bounded retry
//! against the lookup tool, periodic atomic snapshots, and a final snapshot
//! on every exit path.

mod driver;
mod retry;
mod shutdown;

pub use driver::{Pipeline, PipelineOutcome};
pub use retry::RetryPolicy;
pub use shutdown::{wait_for_signal, ShutdownToken};
