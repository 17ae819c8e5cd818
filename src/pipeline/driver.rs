//! The extraction loop: certificates in, indexed batch records out.

use crate::error::ExtractError;
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::shutdown::ShutdownToken;
use crate::resolve::{self, LookupClient};
use crate::state::ExtractionState;
use crate::stream::CertificateReader;
use crate::types::{BatchRecord, Certificate};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// How a pipeline run ended.
///
/// Mapped to the process exit code by the binary: `Drained` is 0,
/// `RetriesExhausted` is 2, `Interrupted` is 130.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Every certificate in the input was consumed.
    Drained,
    /// A shutdown signal stopped the run before the input was drained.
    Interrupted,
    /// The retry budget ran out for a digest that never became available.
    RetriesExhausted { digest: String },
}

enum FetchOutcome {
    Fetched(Vec<String>),
    Interrupted,
    Exhausted,
}

/// The extraction pipeline driver.
///
/// Owns the extraction state and walks the certificate stream exactly once
/// per run: certificates in file order, digests within a certificate in
/// ascending order, already-processed pairs skipped without re-resolution.
/// Each committed record is assigned the next dense index; the output is
/// snapshotted atomically every `snapshot_every` commits and once more on
/// the way out, whatever the exit path.
///
/// The output file is exclusively owned by one pipeline process for the
/// duration of a run. Concurrent writers (a second pipeline, or an
/// execution driver run at the same time) risk lost updates; atomic rename
/// is the only locking discipline.
pub struct Pipeline {
    input_path: PathBuf,
    state: ExtractionState,
    lookup: LookupClient,
    retry: RetryPolicy,
    snapshot_every: u64,
    shutdown: ShutdownToken,
}

impl Pipeline {
    /// Creates a new pipeline driver
    ///
    /// # Arguments
    /// * `input_path` - Ordered certificate stream to consume
    /// * `state` - Loaded (possibly pre-existing) extraction state
    /// * `lookup` - Client for the external batch lookup tool
    /// * `retry` - Retry policy for digests the lookup cannot find yet
    /// * `snapshot_every` - Snapshot cadence in committed records
    /// * `shutdown` - Cooperative stop flag checked at suspension points
    pub fn new(
        input_path: PathBuf,
        state: ExtractionState,
        lookup: LookupClient,
        retry: RetryPolicy,
        snapshot_every: u64,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            input_path,
            state,
            lookup,
            retry,
            snapshot_every: snapshot_every.max(1),
            shutdown,
        }
    }

    /// Run the pipeline to completion.
    ///
    /// Always writes a final snapshot, including on the error path, so no
    /// committed record is ever lost to a fatal exit.
    pub async fn run(mut self) -> Result<PipelineOutcome, ExtractError> {
        let result = self.extract().await;

        match self.state.snapshot() {
            Ok(()) => info!(
                "Wrote {} batch records to {}",
                self.state.len(),
                self.state.output_path().display()
            ),
            Err(snapshot_error) => {
                // Keep the original failure if there was one; the snapshot
                // error is fatal on its own otherwise.
                error!("Failed to write final snapshot: {}", snapshot_error);
                return result.and(Err(snapshot_error));
            }
        }

        result
    }

    async fn extract(&mut self) -> Result<PipelineOutcome, ExtractError> {
        let reader = CertificateReader::open(&self.input_path)?;
        let mut since_snapshot = 0u64;
        let mut cert_counter = 0u64;

        for cert in reader {
            if self.shutdown.is_requested() {
                warn!("Stop requested; halting before next certificate");
                return Ok(PipelineOutcome::Interrupted);
            }

            let cert = cert?;
            cert_counter += 1;

            if cert.payload.is_empty() {
                debug!("Certificate #{} has no payload; skipping", cert_counter);
                continue;
            }

            for digest in cert.payload.keys() {
                if self.shutdown.is_requested() {
                    warn!("Stop requested; halting in the middle of a certificate");
                    return Ok(PipelineOutcome::Interrupted);
                }

                if self.state.is_processed(cert.id.as_deref(), digest) {
                    debug!("Skipping already-processed batch {} from cert {:?}", digest, cert.id);
                    continue;
                }

                // In-certificate transactions win; the lookup tool is only
                // consulted when the certificate has nothing usable.
                let txs = match resolve::from_certificate(&cert, digest) {
                    Some(txs) => txs,
                    None => match self.fetch_with_retry(digest).await {
                        FetchOutcome::Fetched(txs) => txs,
                        FetchOutcome::Interrupted => return Ok(PipelineOutcome::Interrupted),
                        FetchOutcome::Exhausted => {
                            return Ok(PipelineOutcome::RetriesExhausted {
                                digest: digest.clone(),
                            });
                        }
                    },
                };

                let normalized = txs
                    .iter()
                    .map(|tx| resolve::normalize_tx_hex(tx))
                    .collect();
                let index = self.commit(&cert, digest, normalized);
                debug!("Committed batch {} at index {}", digest, index);

                since_snapshot += 1;
                if since_snapshot >= self.snapshot_every {
                    self.state.snapshot()?;
                    since_snapshot = 0;
                }
            }
        }

        info!(
            "Certificate stream drained: {} certificates, {} records total",
            cert_counter,
            self.state.len()
        );
        Ok(PipelineOutcome::Drained)
    }

    fn commit(&mut self, cert: &Certificate, digest: &str, transactions: Vec<String>) -> u64 {
        let record = BatchRecord::new(cert, digest, transactions);
        self.state.commit(record)
    }

    /// Ask the lookup tool for a digest until it is found, the retry budget
    /// is spent, or a stop is requested.
    ///
    /// The shutdown token is checked before every attempt; an in-flight
    /// invocation is never aborted early. An empty transaction list from
    /// the tool counts as not-found: the store has no authoritative empty
    /// batches, only batches that have not replicated yet.
    async fn fetch_with_retry(&self, digest: &str) -> FetchOutcome {
        let mut attempt = 0u64;
        loop {
            if self.shutdown.is_requested() {
                warn!("Stop requested during retries for {}", digest);
                return FetchOutcome::Interrupted;
            }

            attempt += 1;
            match self.lookup.fetch(digest).await {
                Some(txs) if !txs.is_empty() => {
                    info!("Fetched {} txs for {} (attempt {})", txs.len(), digest, attempt);
                    return FetchOutcome::Fetched(txs);
                }
                _ => {}
            }

            if self.retry.exhausted(attempt) {
                error!("Exhausted retries for {} after {} attempts", digest, attempt);
                return FetchOutcome::Exhausted;
            }

            info!(
                "Missing txs for {} (attempt {}); retrying in {:.2}s",
                digest,
                attempt,
                self.retry.interval.as_secs_f64()
            );
            tokio::time::sleep(self.retry.interval).await;
        }
    }
}
