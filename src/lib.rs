//! Stateful UDP gateway for studying sybil attacks on WBAN telemetry.
//!
//! Sensor nodes send `<node_id>,<session_id>,<seq>,<msg_type>` datagrams to a
//! single gateway port. A sybil transmitter reuses a legitimate node's id
//! under its own session id and sequence counter. The gateway keeps per-node
//! state and labels every packet with inter-arrival time, sequence delta and
//! five anomaly flags, producing a dataset for anomaly-detection research.
//!
//! # Features
//!
//! - **Packet parser**: strict, pure validation of the text wire format
//! - **Node state store**: one explicit, owned state per claimed identity
//! - **Classifier**: first-packet, session-change, sequence-reset,
//!   out-of-order and duplicate-sequence flags
//! - **Collector**: deadline-bounded ingestion loop with graceful shutdown
//! - **Senders**: paced legitimate and sybil traffic sources
//!
//! ## Example (offline classification)
//!
//! ```rust
//! use sybilwatch::{NodeStateStore, classify, parse_payload};
//!
//! let mut store = NodeStateStore::new();
//! let first = parse_payload(b"ecg_01,7,5,ECG").unwrap().into_record(14, 0.0);
//! let clone = parse_payload(b"ecg_01,9,0,ECG").unwrap().into_record(14, 0.5);
//!
//! assert!(classify(&mut store, &first).flags.first_packet());
//! let flags = classify(&mut store, &clone).flags;
//! assert!(flags.sequence_reset() && flags.session_change());
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Classification engine
pub mod classifier;
pub mod parser;
pub mod state;
pub mod summary;

// Ingestion pipeline
pub mod config;
pub mod driver;
pub mod sink;
pub mod source;
pub mod sources;

// Traffic generation
pub mod sender;

// Core exports
pub use error::*;
pub use types::*;

pub use classifier::classify;
pub use config::{RunConfig, RunManifest};
pub use driver::{Collector, StopReason};
pub use parser::{Payload, parse_datagram, parse_payload};
pub use sink::{MemorySink, RecordSink, RunDirectory};
pub use source::DatagramSource;
pub use sources::{ReplaySource, UdpSource};
pub use state::{NodeState, NodeStateStore};
pub use summary::RunSummary;

/// Unified entry point for gateway datagram sources.
///
/// Live and replayed traffic go through the same [`Collector`].
///
/// ```rust,no_run
/// use sybilwatch::{Collector, Gateway, MemorySink};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> sybilwatch::Result<()> {
///     let source = Gateway::listen("0.0.0.0:5005".parse().unwrap()).await?;
///     let mut collector = Collector::new(source, MemorySink::new());
///     let summary = collector.run(Duration::from_secs(60), CancellationToken::new()).await?;
///     println!("{summary}");
///     Ok(())
/// }
/// ```
pub struct Gateway;

impl Gateway {
    /// Bind a UDP socket for live collection.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Bind`] if the address is in use or not local.
    pub async fn listen(addr: std::net::SocketAddr) -> Result<UdpSource> {
        UdpSource::bind(addr).await
    }

    /// Open a recorded capture for replay.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is malformed.
    pub fn replay<P: AsRef<std::path::Path>>(path: P) -> Result<ReplaySource> {
        ReplaySource::open(path)
    }
}
