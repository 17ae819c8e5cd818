use batch_extractor::{
    config::Config,
    pipeline::{wait_for_signal, Pipeline, PipelineOutcome, RetryPolicy, ShutdownToken},
    resolve::LookupClient,
    state::ExtractionState,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;

/// Extract ordered batches from a consensus certificate stream into an
/// indexed, resumable JSON output.
#[derive(Parser)]
#[command(name = "batch-extractor")]
#[command(about = "Extract ordered batches from a certificate stream")]
struct Cli {
    /// Path to the ordered certificate stream (concatenated JSON objects)
    #[arg(long)]
    input: PathBuf,

    /// Path to the batches output; loaded and extended if it already exists
    #[arg(long)]
    output: PathBuf,

    /// Path to the external batch lookup tool
    #[arg(long = "lookup-cli")]
    lookup_cli: PathBuf,

    /// Path to a batch data store; repeat for multiple stores
    #[arg(long = "store", required = true)]
    stores: Vec<PathBuf>,

    /// Optional TOML settings file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds to wait between retries when a batch is missing
    #[arg(long)]
    retry_interval: Option<f64>,

    /// Max retries per missing batch; -1 retries indefinitely
    #[arg(long)]
    max_retries: Option<i64>,

    /// Snapshot the output after this many committed records
    #[arg(long)]
    snapshot_every: Option<u64>,

    /// Lookup tool timeout in seconds
    #[arg(long)]
    lookup_timeout: Option<u64>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Load the settings file (if any) and fold the flag overrides in.
    fn settings(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(interval) = self.retry_interval {
            config.retry.interval_secs = interval;
        }
        if let Some(max_retries) = self.max_retries {
            config.retry.max_retries = max_retries;
        }
        if let Some(every) = self.snapshot_every {
            config.snapshot.every = every;
        }
        if let Some(timeout) = self.lookup_timeout {
            config.lookup.timeout_secs = timeout;
        }
        Ok(config)
    }
}

/// The main entry point for the extraction pipeline.
///
/// Initializes logging, loads settings, wires the shutdown token to the
/// process signals, runs the driver, and maps its outcome to the exit code
/// contract: 0 drained, 2 retry budget exhausted, 130 interrupted.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // -v raises the default WARN level to INFO, -vv to DEBUG.
    let level = match cli.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = match cli.settings() {
        Ok(config) => config,
        Err(error) => {
            error!("Failed to load settings: {error:#}");
            return ExitCode::FAILURE;
        }
    };
    info!("Extraction pipeline starting with settings: {config:?}");

    // Load any existing output so the run resumes instead of restarting.
    let state = ExtractionState::load(&cli.output);

    let lookup = LookupClient::new(cli.lookup_cli, cli.stores, config.lookup_timeout());
    let retry = RetryPolicy::new(config.retry_interval(), config.retry.max_retries);

    let shutdown = ShutdownToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_token.request();
    });

    let pipeline = Pipeline::new(
        cli.input,
        state,
        lookup,
        retry,
        config.snapshot.every,
        shutdown,
    );

    match pipeline.run().await {
        Ok(PipelineOutcome::Drained) => {
            info!("Extraction complete");
            ExitCode::SUCCESS
        }
        Ok(PipelineOutcome::RetriesExhausted { digest }) => {
            error!(
                "Giving up on {}: retry budget exhausted; re-run once the batch is available",
                digest
            );
            ExitCode::from(2)
        }
        Ok(PipelineOutcome::Interrupted) => {
            warn!("Stopped by signal");
            ExitCode::from(130)
        }
        Err(error) => {
            error!("Extraction failed: {error}");
            ExitCode::FAILURE
        }
    }
}
