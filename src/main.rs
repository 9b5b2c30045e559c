use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use webm_slicer::{
    config::Config,
    media::{FfmpegToolkit, MediaToolkit},
    pipeline::{PipelineOrchestrator, PipelineOutcome},
};

#[derive(Parser)]
#[command(
    name = "webm-slicer",
    version,
    about = "Split a video into size-capped WebM chunks",
    long_about = "webm-slicer cuts a video into fixed-length segments, converts them in parallel and lowers the frame rate of any segment that does not fit under the byte ceiling until it does."
)]
struct Cli {
    /// Source video file
    #[arg(short, long, default_value = "input_video.mp4")]
    input: PathBuf,

    /// Maximum artifact size in bytes (exclusive)
    #[arg(long)]
    ceiling: Option<u64>,

    /// Directory that holds the segments/ and artifacts/ folders
    #[arg(short, long)]
    workdir: Option<PathBuf>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker threads per batch (default: half the CPU cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Write a TOML run report to this path
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let started = Instant::now();
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting webm-slicer v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match cli.config {
        Some(ref config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };

    if let Some(ceiling) = cli.ceiling {
        config.pipeline.size_ceiling_bytes = ceiling;
    }
    if let Some(workdir) = cli.workdir {
        config.storage.root = workdir;
    }
    if let Some(threads) = cli.threads {
        config.pipeline.worker_threads = Some(threads);
    }
    config.validate()?;

    let toolkit = FfmpegToolkit::new(config.encoder.clone());
    toolkit.check_available().map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let orchestrator = PipelineOrchestrator::new(config, Box::new(toolkit));
    let input = cli.input.clone();

    // The pipeline blocks on whole batches, keep it off the async workers
    let result = match tokio::task::spawn_blocking(move || orchestrator.run(&input)).await {
        Ok(Ok(outcome)) => finish(outcome, cli.report.as_deref()),
        Ok(Err(e)) => {
            error!("Run aborted: {}", e.user_message());
            Err(e.into())
        }
        Err(e) => {
            error!("Pipeline task did not complete: {}", e);
            Err(e.into())
        }
    };

    info!("Done in {:.2}s", started.elapsed().as_secs_f64());
    result
}

/// Log the outcome and write the run report if one was requested
fn finish(outcome: PipelineOutcome, report: Option<&Path>) -> Result<()> {
    match outcome {
        PipelineOutcome::Success(summary) => {
            info!("{} artifacts ready in {:?}", summary.artifacts.len(),
                  summary.artifacts.first().and_then(|a| a.path.parent()));
            if let Some(report_path) = report {
                summary.save_to_file(report_path)?;
                info!("Run report saved to: {:?}", report_path);
            }
            Ok(())
        }
        PipelineOutcome::Failure(failure) => {
            error!("Run failed: {}", failure);
            Err(anyhow::anyhow!("webm-slicer failed: {}", failure.reason))
        }
    }
}
