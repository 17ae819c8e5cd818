//! Certificate Stream Module
//!
//! This module reads the ordered certificate file: a sequence of
//! pretty-printed JSON objects concatenated back-to-back with no separator.
//! Certificates are yielded lazily, one at a time, in file order.

mod reader;

pub use reader::CertificateReader;
