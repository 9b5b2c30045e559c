// Print the duration of one or more media files as HH:MM:SS

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use webm_slicer::{
    config::Config,
    media::{format_timestamp, FfmpegToolkit, MediaToolkit},
};

#[derive(Parser)]
#[command(name = "webm-slicer-probe", version, about = "Print media durations")]
struct Cli {
    /// Media files to probe
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Configuration file (optional), only the [encoder] section is used
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let toolkit = FfmpegToolkit::new(config.encoder);

    let mut failures = 0;
    for file in &cli.files {
        match toolkit.probe_duration(file) {
            Ok(seconds) => println!("{}\t{}\t{:.3}s", file.display(), format_timestamp(seconds), seconds),
            Err(e) => {
                eprintln!("{}\t{}", file.display(), e.user_message());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} files could not be probed", failures, cli.files.len());
    }
    Ok(())
}
