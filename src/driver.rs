//! Collector drives the time-bounded ingestion loop

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::classifier::classify;
use crate::parser::parse_datagram;
use crate::sink::RecordSink;
use crate::source::DatagramSource;
use crate::state::NodeStateStore;
use crate::summary::RunSummary;
use crate::types::Datagram;
use crate::Result;

/// Why the ingestion loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Configured run duration elapsed
    Deadline,
    /// Cancellation token fired (operator interrupt)
    Cancelled,
    /// Source has no more datagrams
    Exhausted,
    /// Receive or output failure
    Failed,
}

/// Owns the node state store and feeds every datagram through
/// parse → classify → persist, one at a time.
///
/// Datagrams are processed to completion before the deadline or cancellation
/// is looked at again, so nothing that was read is ever dropped.
pub struct Collector<S, K> {
    source: S,
    sink: K,
    store: NodeStateStore,
    summary: RunSummary,
    stop_reason: Option<StopReason>,
}

impl<S, K> Collector<S, K>
where
    S: DatagramSource,
    K: RecordSink,
{
    pub fn new(source: S, sink: K) -> Self {
        Self {
            source,
            sink,
            store: NodeStateStore::new(),
            summary: RunSummary::new(),
            stop_reason: None,
        }
    }

    /// Run until `duration` elapses, `cancel` fires or the source ends.
    ///
    /// The sink is always finalized, including on failure. A failed run has
    /// its summary marked incomplete before it is written, and the error that
    /// ended the run is returned.
    pub async fn run(&mut self, duration: Duration, cancel: CancellationToken) -> Result<RunSummary> {
        info!("Collector started on {} for {:?}", self.source.describe(), duration);

        let deadline = tokio::time::sleep_until(Instant::now() + duration);
        tokio::pin!(deadline);

        let outcome: Result<StopReason> = loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Collector cancelled, finalizing outputs");
                    break Ok(StopReason::Cancelled);
                }
                _ = &mut deadline => {
                    info!("Run duration elapsed");
                    break Ok(StopReason::Deadline);
                }
                received = self.source.next_datagram() => received,
            };

            match received {
                Ok(Some(datagram)) => {
                    if let Err(e) = self.ingest(&datagram) {
                        error!("Failed to persist record: {}", e);
                        break Err(e);
                    }
                }
                Ok(None) => {
                    info!("Source exhausted after {} datagrams", self.summary.total_packets);
                    break Ok(StopReason::Exhausted);
                }
                Err(e) => {
                    error!("Source error: {}", e);
                    break Err(e);
                }
            }
        };

        self.stop_reason = Some(outcome.as_ref().copied().unwrap_or(StopReason::Failed));
        if outcome.is_err() {
            self.summary.mark_incomplete();
        }

        let finished = self.sink.finish(&self.summary);
        if let Err(e) = &finished {
            error!("Failed to finalize run output: {}", e);
            self.summary.mark_incomplete();
        }

        info!(
            "Collector stopped ({:?}): {} received, {} parsed, {} parse errors",
            self.stop_reason,
            self.summary.total_packets,
            self.summary.parsed_packets,
            self.summary.parse_errors
        );

        outcome?;
        finished?;
        Ok(self.summary.clone())
    }

    /// Parse, classify and persist a single datagram.
    fn ingest(&mut self, datagram: &Datagram) -> Result<()> {
        self.summary.record_received();

        let packet = match parse_datagram(datagram) {
            Ok(packet) => packet,
            Err(e) => {
                self.summary.record_parse_error();
                debug!(peer = ?datagram.peer, len = datagram.len(), "Rejected datagram: {}", e);
                return self.sink.record_parse_error(datagram, &e);
            }
        };

        let classification = classify(&mut self.store, &packet);
        if !classification.flags.is_empty() && !classification.flags.first_packet() {
            trace!(node_id = %packet.node_id, flags = %classification.flags, "anomaly");
        }

        self.sink.write_record(&packet, &classification)?;
        self.summary.record_classified(&packet.node_id, &classification);
        Ok(())
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn store(&self) -> &NodeStateStore {
        &self.store
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Consume the collector, returning its sink.
    pub fn into_sink(self) -> K {
        self.sink
    }
}
