//! hibp-bloom: build and inspect offline credential-hash Bloom filters
//!
//! ```bash
//! hibp-bloom build --input pwned-passwords-sha1-ordered-by-hash-v8.txt
//! hibp-bloom inspect HIBPBloomFilter.bin
//! ```
//!
//! Ctrl+C during a build cancels it; nothing is written in that case.

mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hibp_bloom::{
    BuildOutcome, BuildRequest, FilterBuilderService, FilterFileStore, FilterStore,
};

/// Exit status after a canceled build (128 + SIGINT)
const EXIT_CANCELED: u8 = 130;

/// Build and inspect offline credential-hash Bloom filters
#[derive(Parser, Debug)]
#[command(name = "hibp-bloom", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a filter from a list of credential hashes
    Build(BuildArgs),
    /// Print the parameters of an existing filter file
    Inspect {
        /// Filter file to read
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Input file, one `<40 hex chars>:<count>` record per line
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output filter file [default: HIBPBloomFilter.bin next to the input]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target false positive rate
    #[arg(long)]
    fpr: Option<f64>,

    /// JSON config file with defaults for any of the above
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl BuildArgs {
    fn overrides(&self) -> config::Overrides {
        config::Overrides {
            input: self.input.clone(),
            output: self.output.clone(),
            fpr: self.fpr,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => build(args).await,
        Command::Inspect { path } => inspect(&path),
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|e| anyhow!(e))
}

async fn build(args: BuildArgs) -> Result<ExitCode> {
    let file = args
        .config
        .as_deref()
        .map(config::load_file)
        .transpose()?;
    let settings = config::resolve(file, |key| std::env::var(key).ok(), args.overrides())?;

    info!(
        input = %settings.input.display(),
        output = %settings.output.display(),
        target_fpr = settings.build.target_fpr,
        "Starting filter build"
    );

    let service = Arc::new(FilterBuilderService::with_config(
        Arc::new(FilterFileStore),
        settings.build,
    ));
    let mut handle = service
        .spawn(BuildRequest::new(&settings.input, &settings.output))
        .context("Failed to start filter build")?;

    let token = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, canceling build");
            token.cancel();
        }
    });

    while let Some(update) = handle.next_progress().await {
        info!(
            percent = update.percent,
            stage = %update.stage,
            "{}% complete, about {} remaining",
            update.percent,
            update.remaining_label()
        );
    }

    let outcome = handle.wait().await.context("Filter build failed")?;
    let metrics = service.metrics().snapshot();

    match outcome {
        BuildOutcome::Completed(report) => {
            info!(
                records = report.records,
                size_bits = report.size_bits,
                hash_count = report.hash_count,
                estimated_fpr = report.estimated_fpr,
                bytes_written = report.bytes_written,
                elapsed_secs = report.elapsed.as_secs(),
                progress_reports = metrics.progress_reports,
                "Filter written to {}",
                report.output_path.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        BuildOutcome::Canceled { stage } => {
            warn!(
                %stage,
                keys_inserted = metrics.keys_inserted,
                "Build canceled, no filter written"
            );
            Ok(ExitCode::from(EXIT_CANCELED))
        }
    }
}

fn inspect(path: &Path) -> Result<ExitCode> {
    let filter = FilterFileStore
        .read(path)
        .with_context(|| format!("Failed to read filter file {}", path.display()))?;

    println!("file:            {}", path.display());
    println!("hash scheme:     {}", filter.hash_scheme());
    println!("key length:      {}", filter.key_length());
    println!("size:            {} bits ({} bytes)", filter.size_bits(), filter.as_bytes().len());
    println!("hash functions:  {}", filter.hash_count());
    println!("items:           {}", filter.elements_inserted());
    println!("target fpr:      {}", filter.target_fpr());
    println!("estimated fpr:   {:.6}", filter.false_positive_rate());
    println!("fill ratio:      {:.4}", filter.fill_ratio());

    Ok(ExitCode::SUCCESS)
}
