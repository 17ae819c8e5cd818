//! Incremental reader for files holding multiple concatenated JSON objects.

use crate::error::ExtractError;
use crate::types::Certificate;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// Forward-only iterator over the certificates in an input file.
///
/// The file format is self-delimiting but has no separator token, so the
/// reader accumulates physical lines and attempts a structural parse of the
/// buffer after each append; a successful parse yields one certificate and
/// clears the buffer. The sequence is not restartable; open a fresh reader
/// to reread the file.
pub struct CertificateReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    buf: String,
}

impl CertificateReader {
    /// Open the certificate stream at `path`.
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        let file = File::open(path).map_err(|source| ExtractError::Io {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self {
            path: path.to_owned(),
            lines: BufReader::new(file).lines(),
            buf: String::new(),
        })
    }
}

impl Iterator for CertificateReader {
    type Item = Result<Certificate, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    // Blank lines between objects are noise; blank lines
                    // inside an object are part of the accumulation.
                    if self.buf.is_empty() && line.trim().is_empty() {
                        continue;
                    }
                    self.buf.push_str(&line);
                    self.buf.push('\n');
                    // A parse failure here just means the object is not
                    // complete yet; keep accumulating.
                    if let Ok(value) = serde_json::from_str::<Value>(&self.buf) {
                        self.buf.clear();
                        return Some(Ok(Certificate::from_json(&value)));
                    }
                }
                Some(Err(source)) => {
                    return Some(Err(ExtractError::Io {
                        path: self.path.clone(),
                        source,
                    }));
                }
                None => {
                    if self.buf.trim().is_empty() {
                        return None;
                    }
                    // Leftover content that never became a complete object
                    // means the stream was truncated or corrupt.
                    self.buf.clear();
                    return Some(Err(ExtractError::MalformedInput {
                        path: self.path.clone(),
                    }));
                }
            }
        }
    }
}
