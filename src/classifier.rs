//! Stateful anomaly classifier
//!
//! For every parsed packet the classifier compares the packet against the
//! previous packet claiming the same identity, derives inter-arrival time and
//! sequence delta, and raises five independent flags:
//!
//! | flag               | condition                                        |
//! |--------------------|--------------------------------------------------|
//! | first-packet       | identity never seen before in this run           |
//! | session-change     | session id differs from the previous packet      |
//! | sequence-reset     | seq went backwards *and* the session changed     |
//! | out-of-order       | seq went backwards within the same session       |
//! | duplicate-sequence | seq equals the previous packet's seq             |
//!
//! The node state always advances to the current packet, flagged or not.

use tracing::trace;

use crate::state::NodeStateStore;
use crate::types::{AnomalyFlags, Classification, PacketRecord};

/// Classify `packet` against its identity's prior state and update the store.
pub fn classify(store: &mut NodeStateStore, packet: &PacketRecord) -> Classification {
    let state = store.get_or_create(&packet.node_id);

    if !state.seen {
        state.seen = true;
        state.last_arrival = packet.arrival;
        state.last_seq = packet.seq;
        state.last_session_id = packet.session_id;
        trace!(node_id = %packet.node_id, session_id = packet.session_id, seq = packet.seq, "first packet");
        return Classification::first_packet();
    }

    let inter_arrival = packet.arrival - state.last_arrival;
    let seq_delta = i64::from(packet.seq) - i64::from(state.last_seq);
    let session_change = packet.session_id != state.last_session_id;
    let went_backwards = packet.seq < state.last_seq;

    let flags = AnomalyFlags::empty()
        .with(AnomalyFlags::DUPLICATE_SEQUENCE, packet.seq == state.last_seq)
        .with(AnomalyFlags::SESSION_CHANGE, session_change)
        .with(AnomalyFlags::SEQUENCE_RESET, went_backwards && session_change)
        .with(AnomalyFlags::OUT_OF_ORDER, went_backwards && !session_change);

    state.last_arrival = packet.arrival;
    state.last_seq = packet.seq;
    state.last_session_id = packet.session_id;

    trace!(node_id = %packet.node_id, seq_delta, inter_arrival, %flags, "classified");

    Classification { inter_arrival: Some(inter_arrival), seq_delta: Some(seq_delta), flags }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::packet_at;
    use proptest::prelude::*;

    fn classify_two(first: (u16, u32), second: (u16, u32)) -> Classification {
        let mut store = NodeStateStore::new();
        classify(&mut store, &packet_at("ecg_01", first.0, first.1, 0.0));
        classify(&mut store, &packet_at("ecg_01", second.0, second.1, 0.5))
    }

    #[test]
    fn reference_scenario_flag_sequence() {
        let mut store = NodeStateStore::new();
        let stream = [(7, 0), (7, 1), (7, 1), (9, 0), (9, 5), (9, 3)];
        let expected = [
            AnomalyFlags::FIRST_PACKET,
            0,
            AnomalyFlags::DUPLICATE_SEQUENCE,
            AnomalyFlags::SEQUENCE_RESET | AnomalyFlags::SESSION_CHANGE,
            0,
            AnomalyFlags::OUT_OF_ORDER,
        ];

        for (i, ((session, seq), bits)) in stream.into_iter().zip(expected).enumerate() {
            let c = classify(&mut store, &packet_at("ecg_01", session, seq, i as f64));
            assert_eq!(c.flags, AnomalyFlags::from_bits(bits), "packet {i}: got {}", c.flags);
        }
    }

    #[test]
    fn derived_fields_follow_previous_packet() {
        let mut store = NodeStateStore::new();
        classify(&mut store, &packet_at("ecg_01", 7, 10, 100.0));
        let c = classify(&mut store, &packet_at("ecg_01", 7, 14, 100.25));
        assert_eq!(c.inter_arrival, Some(0.25));
        assert_eq!(c.seq_delta, Some(4));

        let c = classify(&mut store, &packet_at("ecg_01", 7, 2, 101.0));
        assert_eq!(c.seq_delta, Some(-12));
        assert!(c.flags.out_of_order());
    }

    #[test]
    fn forward_gap_is_not_an_anomaly() {
        let c = classify_two((7, 0), (7, 1000));
        assert!(c.flags.is_empty());
        assert_eq!(c.seq_delta, Some(1000));
    }

    #[test]
    fn session_change_moving_forward_sets_only_session_change() {
        let c = classify_two((7, 3), (9, 10));
        assert_eq!(c.flags, AnomalyFlags::from_bits(AnomalyFlags::SESSION_CHANGE));
    }

    #[test]
    fn duplicate_across_session_change_is_not_a_reset() {
        let c = classify_two((7, 5), (9, 5));
        assert!(c.flags.duplicate_sequence());
        assert!(c.flags.session_change());
        assert!(!c.flags.sequence_reset());
        assert!(!c.flags.out_of_order());
    }

    #[test]
    fn identities_are_tracked_independently() {
        let mut store = NodeStateStore::new();
        classify(&mut store, &packet_at("ecg_01", 7, 10, 0.0));
        let other = classify(&mut store, &packet_at("temp_01", 3, 0, 0.1));
        assert!(other.flags.first_packet());

        let c = classify(&mut store, &packet_at("ecg_01", 7, 11, 0.2));
        assert!(c.flags.is_empty());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn sybil_interleaving_flips_between_sessions() {
        // Legitimate node on session 100, attacker cloning it on session 200.
        let mut store = NodeStateStore::new();
        let stream = [(100, 50), (200, 0), (100, 51), (200, 1)];
        let results: Vec<_> = stream
            .iter()
            .enumerate()
            .map(|(i, &(s, q))| classify(&mut store, &packet_at("ecg_01", s, q, i as f64)))
            .collect();

        assert!(results[1].flags.sequence_reset() && results[1].flags.session_change());
        assert!(results[2].flags.session_change() && !results[2].flags.sequence_reset());
        assert!(results[3].flags.sequence_reset());
    }

    proptest! {
        #[test]
        fn first_packet_is_always_clean(
            node_id in "[a-z_0-9]{1,12}",
            session_id in any::<u16>(),
            seq in any::<u32>(),
            arrival in 0.0f64..1e10,
        ) {
            let mut store = NodeStateStore::new();
            let c = classify(&mut store, &packet_at(&node_id, session_id, seq, arrival));
            prop_assert_eq!(c.flags.bits(), AnomalyFlags::FIRST_PACKET);
            prop_assert_eq!(c.inter_arrival_or_sentinel(), -1.0);
            prop_assert_eq!(c.seq_delta_or_sentinel(), -1);
        }

        #[test]
        fn same_session_ordering_rules(session in any::<u16>(), seq1 in any::<u32>(), seq2 in any::<u32>()) {
            let c = classify_two((session, seq1), (session, seq2));
            prop_assert!(!c.flags.sequence_reset());
            prop_assert!(!c.flags.session_change());
            prop_assert_eq!(c.flags.out_of_order(), seq2 < seq1);
            prop_assert_eq!(c.flags.duplicate_sequence(), seq2 == seq1);
        }

        #[test]
        fn changed_session_backwards_is_reset(
            s1 in any::<u16>(),
            s2 in any::<u16>(),
            seq1 in 1u32..,
            back in 1u32..,
        ) {
            prop_assume!(s1 != s2);
            let seq2 = seq1.saturating_sub(back);
            prop_assume!(seq2 < seq1);
            let c = classify_two((s1, seq1), (s2, seq2));
            prop_assert!(c.flags.sequence_reset());
            prop_assert!(c.flags.session_change());
            prop_assert!(!c.flags.out_of_order());
        }

        #[test]
        fn state_always_tracks_latest_packet(
            stream in prop::collection::vec((0u16..4, 0u32..16), 1..40),
        ) {
            let mut store = NodeStateStore::new();
            for (i, &(session, seq)) in stream.iter().enumerate() {
                let c = classify(&mut store, &packet_at("n", session, seq, i as f64));
                prop_assert!(!(c.flags.sequence_reset() && c.flags.out_of_order()));
                prop_assert_eq!(c.flags.first_packet(), i == 0);
                prop_assert_eq!(c.inter_arrival.is_none(), i == 0);

                let state = store.get("n").unwrap();
                prop_assert_eq!((state.last_session_id, state.last_seq), (session, seq));
            }
        }
    }
}
