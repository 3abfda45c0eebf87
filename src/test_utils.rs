//! Test utilities shared by unit tests, integration tests and benches
//!
//! Builders for packets and wire payloads, plus canned traffic scenarios.

#![cfg(any(test, feature = "benchmark"))]

use crate::types::{Datagram, PacketRecord};

/// Build a parsed packet with a fixed message type.
pub fn packet_at(node_id: &str, session_id: u16, seq: u32, arrival: f64) -> PacketRecord {
    PacketRecord {
        node_id: node_id.to_string(),
        session_id,
        seq,
        msg_type: "ECG".to_string(),
        payload_len: wire(node_id, session_id, seq, "ECG").len(),
        arrival,
    }
}

/// Format a payload in wire order.
pub fn wire(node_id: &str, session_id: u16, seq: u32, msg_type: &str) -> String {
    format!("{node_id},{session_id},{seq},{msg_type}")
}

/// Wrap raw bytes as a datagram arriving at `arrival`.
pub fn datagram_at(payload: impl AsRef<[u8]>, arrival: f64) -> Datagram {
    Datagram::new(payload.as_ref().to_vec(), None, arrival)
}

/// `ecg_01` stream covering every flag: first, clean, dup, reset+session
/// change, clean, out-of-order.
pub fn reference_scenario() -> Vec<(u16, u32)> {
    vec![(7, 0), (7, 1), (7, 1), (9, 0), (9, 5), (9, 3)]
}

/// A legitimate node and a sybil clone of it, interleaved one-to-one.
///
/// The legitimate node starts mid-session; the clone starts at zero on its
/// own session id, as a freshly started attacker would.
pub fn sybil_interleaved(packets_each: u32) -> Vec<Datagram> {
    let mut out = Vec::with_capacity(packets_each as usize * 2);
    for i in 0..packets_each {
        let t = i as f64 * 0.5;
        out.push(datagram_at(wire("ecg_01", 41237, 1000 + i, "ECG"), t));
        out.push(datagram_at(wire("ecg_01", 666, i, "ECG"), t + 0.25));
    }
    out
}
