//! Classifier output

use super::AnomalyFlags;

/// Value written in place of a derived field that has no prior reference.
pub const SENTINEL: i64 = -1;

/// Result of classifying one packet against its node's prior state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Seconds since the previous packet claiming the same identity
    pub inter_arrival: Option<f64>,

    /// `seq - last_seq`; negative when the counter went backwards
    pub seq_delta: Option<i64>,

    pub flags: AnomalyFlags,
}

impl Classification {
    /// Classification of the first packet seen for an identity.
    pub fn first_packet() -> Self {
        Self {
            inter_arrival: None,
            seq_delta: None,
            flags: AnomalyFlags::from_bits(AnomalyFlags::FIRST_PACKET),
        }
    }

    /// Inter-arrival time with `-1.0` standing in for "no prior packet".
    pub fn inter_arrival_or_sentinel(&self) -> f64 {
        self.inter_arrival.unwrap_or(SENTINEL as f64)
    }

    /// Sequence delta with `-1` standing in for "no prior packet".
    pub fn seq_delta_or_sentinel(&self) -> i64 {
        self.seq_delta.unwrap_or(SENTINEL)
    }
}
