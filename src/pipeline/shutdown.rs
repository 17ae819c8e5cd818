//! Cooperative shutdown signaling for the pipeline loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Cloneable stop flag checked by the driver at its suspension points.
///
/// The driver never reacts mid-invocation: an in-flight lookup call or
/// backoff sleep completes first, then the flag is observed and the run
/// ends with a final snapshot.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    requested: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the pipeline to stop after its current step.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Wait for an interrupt or termination signal.
///
/// Spawned as a background task by the binary; on return the caller trips
/// the shutdown token.
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut interrupt = match signal(SignalKind::interrupt()) {
            Ok(stream) => stream,
            Err(error) => {
                warn!("Failed to install SIGINT handler: {}", error);
                return;
            }
        };
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(error) => {
                warn!("Failed to install SIGTERM handler: {}", error);
                return;
            }
        };
        tokio::select! {
            _ = interrupt.recv() => warn!("Received SIGINT; will stop after current step"),
            _ = terminate.recv() => warn!("Received SIGTERM; will stop after current step"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", error);
            return;
        }
        warn!("Received ctrl-c; will stop after current step");
    }
}
