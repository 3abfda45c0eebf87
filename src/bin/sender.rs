//! WBAN traffic sender
//!
//! Simulates a legitimate sensor node, or a sybil clone of one, sending the
//! gateway wire format at a fixed rate.
//!
//! Usage:
//!   sybil-sender --manifest run.yaml --gateway-ip 192.168.8.166 node --node-id ecg_01
//!   sybil-sender --manifest run.yaml --gateway-ip 192.168.8.166 sybil

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sybilwatch::RunManifest;
use sybilwatch::sender::{SenderConfig, run_sender};

#[derive(Parser, Debug)]
#[command(name = "sybil-sender")]
#[command(about = "Send WBAN telemetry as a legitimate node or a sybil clone")]
struct Args {
    /// Path to the run manifest (YAML or JSON)
    #[arg(short, long)]
    manifest: PathBuf,

    /// Gateway IP address
    #[arg(long)]
    gateway_ip: IpAddr,

    /// Override the manifest's gateway port
    #[arg(long)]
    gateway_port: Option<u16>,

    /// Override the manifest's duration in seconds
    #[arg(long)]
    duration_s: Option<u64>,

    /// Fixed session id instead of a random one
    #[arg(long)]
    session_id: Option<u16>,

    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand, Debug)]
enum Role {
    /// Legitimate node (manifest `node` section, overridable)
    Node {
        #[arg(long)]
        node_id: Option<String>,
        #[arg(long)]
        msg_type: Option<String>,
        #[arg(long)]
        rate_pps: Option<f64>,
    },
    /// Sybil clone of `attacker.target_node_id` (requires `attacker.enabled`)
    Sybil,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut manifest = RunManifest::load(&args.manifest)
        .with_context(|| format!("loading manifest {}", args.manifest.display()))?;

    let port = args.gateway_port.unwrap_or(manifest.gateway.listen_port);
    let target = SocketAddr::new(args.gateway_ip, port);

    let mut config = match args.role {
        Role::Node { node_id, msg_type, rate_pps } => {
            if let Some(node_id) = node_id {
                manifest.node.node_id = node_id;
            }
            if let Some(msg_type) = msg_type {
                manifest.node.msg_type = msg_type;
            }
            if let Some(rate) = rate_pps {
                manifest.node.rate_pps = rate;
            }
            SenderConfig::node(&manifest, target)?
        }
        Role::Sybil => SenderConfig::sybil(&manifest, target)?,
    };
    if let Some(secs) = args.duration_s {
        config = config.with_duration(Duration::from_secs(secs));
    }
    if let Some(session_id) = args.session_id {
        config = config.with_session_id(session_id);
    }

    info!(
        run_id = manifest.run_id,
        scenario_id = %manifest.scenario_id,
        duration_s = config.duration.as_secs(),
        start_delay_s = config.start_delay.as_secs_f64(),
        "Sender configured"
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted by user.");
            interrupt.cancel();
        }
    });

    let report = run_sender(&config, cancel).await?;
    println!("[SUMMARY] packets_sent={} session_id={}", report.sent, report.session_id);
    Ok(())
}
