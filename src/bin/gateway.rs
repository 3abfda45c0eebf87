//! WBAN gateway collector
//!
//! Listens on the manifest's UDP port for the configured duration, classifies
//! every packet and writes the run directory.
//!
//! Usage:
//!   sybil-gateway --manifest experiments/runs/S1_SYBIL/run_0001.yaml
//!   sybil-gateway --manifest run.yaml --replay capture.txt --force

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sybilwatch::sink::DEFAULT_FLUSH_EVERY;
use sybilwatch::{
    Collector, DatagramSource, Gateway, RunDirectory, RunManifest, RunSummary, types::unix_now,
};

#[derive(Parser, Debug)]
#[command(name = "sybil-gateway")]
#[command(about = "WBAN gateway collector with per-node anomaly flags")]
struct Args {
    /// Path to the run manifest (YAML or JSON)
    #[arg(short, long)]
    manifest: PathBuf,

    /// Overwrite the run output directory if it already exists
    #[arg(long)]
    force: bool,

    /// Flush and fsync the CSV every N rows
    #[arg(long, default_value_t = DEFAULT_FLUSH_EVERY)]
    flush_every: usize,

    /// Classify a recorded capture instead of listening on UDP
    #[arg(long)]
    replay: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    // Configuration errors are fatal before any socket is opened.
    let manifest = RunManifest::load(&args.manifest)
        .with_context(|| format!("loading manifest {}", args.manifest.display()))?;
    let config = manifest.run_config();

    let mut output = RunDirectory::create(&config, &manifest, args.force)?
        .with_flush_every(args.flush_every);
    let out_dir = output.path().to_path_buf();
    let csv_path = output.csv_path();

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted by user. Finalizing outputs...");
            interrupt.cancel();
        }
    });

    info!(
        run_id = config.run_id,
        scenario_id = %config.scenario_id,
        duration_s = config.duration.as_secs(),
        "Collector starting"
    );

    let result = match &args.replay {
        Some(path) => {
            let source = Gateway::replay(path)?;
            output.write_header(&config, &source.describe(), unix_now())?;
            Collector::new(source, output).run(config.duration, cancel).await
        }
        None => {
            let source = Gateway::listen(config.listen).await?;
            output.write_header(&config, &source.describe(), unix_now())?;
            Collector::new(source, output).run(config.duration, cancel).await
        }
    };

    match result {
        Ok(summary) => {
            print_summary(&out_dir, &csv_path, &summary);
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {}", e);
            for suggestion in e.recovery_suggestions() {
                warn!("  - {}", suggestion);
            }
            Err(e).context(format!("run output in {} is incomplete", out_dir.display()))
        }
    }
}

fn print_summary(out_dir: &std::path::Path, csv_path: &std::path::Path, summary: &RunSummary) {
    println!("\n[SUMMARY]");
    println!("  Output dir      : {}", out_dir.display());
    println!("  UDP CSV         : {}", csv_path.display());
    println!("{summary}");
}
