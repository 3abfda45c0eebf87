//! Anomaly flag set produced by the classifier

use serde::{Deserialize, Serialize};
use std::fmt;

/// Set of anomaly flags attached to one classified packet.
///
/// The five flags are independent bits. Session change is orthogonal to the
/// reset / out-of-order / duplicate triple; reset and out-of-order are never
/// set together by the classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnomalyFlags(u8);

impl AnomalyFlags {
    /// First packet ever seen for the claimed identity.
    pub const FIRST_PACKET: u8 = 1 << 0;
    /// Session (boot) id differs from the previous packet.
    pub const SESSION_CHANGE: u8 = 1 << 1;
    /// Sequence went backwards across a session change.
    pub const SEQUENCE_RESET: u8 = 1 << 2;
    /// Sequence went backwards within the same session.
    pub const OUT_OF_ORDER: u8 = 1 << 3;
    /// Sequence equals the previous packet's sequence.
    pub const DUPLICATE_SEQUENCE: u8 = 1 << 4;

    const NAMES: [(u8, &'static str); 5] = [
        (Self::FIRST_PACKET, "first"),
        (Self::SESSION_CHANGE, "session-change"),
        (Self::SEQUENCE_RESET, "reset"),
        (Self::OUT_OF_ORDER, "out-of-order"),
        (Self::DUPLICATE_SEQUENCE, "dup"),
    ];

    /// Empty flag set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build a flag set from raw bits. Unknown bits are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b1_1111)
    }

    /// Raw bit value.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check if a flag is set using a bitmask.
    pub const fn has_flag(self, flag: u8) -> bool {
        (self.0 & flag) != 0
    }

    /// Set or clear a flag.
    pub fn set(&mut self, flag: u8, value: bool) {
        if value {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    /// Builder-style variant of [`AnomalyFlags::set`].
    pub fn with(mut self, flag: u8, value: bool) -> Self {
        self.set(flag, value);
        self
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn first_packet(self) -> bool {
        self.has_flag(Self::FIRST_PACKET)
    }

    pub fn session_change(self) -> bool {
        self.has_flag(Self::SESSION_CHANGE)
    }

    pub fn sequence_reset(self) -> bool {
        self.has_flag(Self::SEQUENCE_RESET)
    }

    pub fn out_of_order(self) -> bool {
        self.has_flag(Self::OUT_OF_ORDER)
    }

    pub fn duplicate_sequence(self) -> bool {
        self.has_flag(Self::DUPLICATE_SEQUENCE)
    }

    /// Short names of the set flags, in declaration order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES.into_iter().filter(move |(bit, _)| self.has_flag(*bit)).map(|(_, name)| name)
    }
}

impl fmt::Display for AnomalyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, name) in self.names().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_clear_flags() {
        let mut flags = AnomalyFlags::empty();
        assert!(flags.is_empty());

        flags.set(AnomalyFlags::DUPLICATE_SEQUENCE, true);
        flags.set(AnomalyFlags::SEQUENCE_RESET, true);
        assert!(flags.duplicate_sequence());
        assert!(flags.sequence_reset());
        assert!(!flags.out_of_order());

        flags.set(AnomalyFlags::DUPLICATE_SEQUENCE, false);
        assert!(!flags.duplicate_sequence());
        assert_eq!(flags.bits(), AnomalyFlags::SEQUENCE_RESET);
    }

    #[test]
    fn display_lists_names_in_order() {
        let flags = AnomalyFlags::empty()
            .with(AnomalyFlags::SEQUENCE_RESET, true)
            .with(AnomalyFlags::SESSION_CHANGE, true);
        assert_eq!(flags.to_string(), "[session-change, reset]");
        assert_eq!(AnomalyFlags::empty().to_string(), "[]");
    }

    #[test]
    fn from_bits_drops_unknown_bits() {
        assert_eq!(AnomalyFlags::from_bits(0xFF).bits(), 0b1_1111);
    }
}
