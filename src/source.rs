//! Source trait for inbound datagrams

use crate::Result;
use crate::types::Datagram;

/// Trait for datagram sources feeding the collector
///
/// Sources abstract over where datagrams come from (a live UDP socket or a
/// recorded capture) and stamp each one with its gateway arrival time.
#[async_trait::async_trait]
pub trait DatagramSource: Send + 'static {
    /// Get the next datagram
    ///
    /// Returns:
    /// - `Ok(Some(datagram))` - Datagram received
    /// - `Ok(None)` - Source exhausted (normal termination)
    /// - `Err(e)` - Unrecoverable receive error
    ///
    /// Implementations must be cancel-safe: the collector drops this future
    /// when the run deadline passes or the run is cancelled, and no datagram
    /// may be lost by doing so.
    async fn next_datagram(&mut self) -> Result<Option<Datagram>>;

    /// Human-readable description of where datagrams come from
    fn describe(&self) -> String;
}
