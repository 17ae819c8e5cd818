//! Batch Resolution Module
//!
//! This module turns a declared batch digest into its transaction list:
//! - from the certificate's own transaction map when it carries one
//! - otherwise through the external lookup tool
//!
//! Failures at this level are reported as "not found", never as errors;
//! retrying is the driver's decision.

mod lookup;
mod resolver;

pub use lookup::LookupClient;
pub use resolver::{from_certificate, normalize_tx_hex};
