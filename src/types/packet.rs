//! Datagram and packet record types

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Raw datagram as handed over by a [`DatagramSource`](crate::source::DatagramSource).
///
/// The arrival timestamp is assigned by the gateway, never by the sender.
#[derive(Debug, Clone)]
pub struct Datagram {
    /// Payload bytes (zero-copy via Arc)
    pub payload: Arc<[u8]>,

    /// Sender address, when known
    pub peer: Option<SocketAddr>,

    /// Gateway arrival time, seconds since the Unix epoch
    pub arrival: f64,
}

impl Datagram {
    /// Create a new datagram
    pub fn new(payload: impl Into<Arc<[u8]>>, peer: Option<SocketAddr>, arrival: f64) -> Self {
        Self { payload: payload.into(), peer, arrival }
    }

    /// Raw payload length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// A successfully parsed packet, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketRecord {
    /// Claimed node identity
    pub node_id: String,

    /// Session (boot) id of the sender
    pub session_id: u16,

    /// Per-session sequence counter
    pub seq: u32,

    /// Application message tag
    pub msg_type: String,

    /// Raw datagram length in bytes
    pub payload_len: usize,

    /// Gateway arrival time, seconds since the Unix epoch
    pub arrival: f64,
}

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn unix_now() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
}
