//! Run-level statistics

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::Classification;

/// Totals aggregated over one collector run.
///
/// Flag counters are sums over the per-packet classifications, so they
/// always agree with the persisted records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_packets: u64,
    pub parsed_packets: u64,
    pub parse_errors: u64,
    pub first_packets: u64,
    pub session_changes: u64,
    pub sequence_resets: u64,
    pub out_of_order: u64,
    pub duplicates: u64,
    pub per_node: BTreeMap<String, u64>,
    /// False when the run ended on an error before all records were persisted
    pub complete: bool,
}

impl RunSummary {
    pub fn new() -> Self {
        Self { complete: true, ..Self::default() }
    }

    pub fn record_received(&mut self) {
        self.total_packets += 1;
    }

    pub fn record_parse_error(&mut self) {
        self.parse_errors += 1;
    }

    pub fn record_classified(&mut self, node_id: &str, classification: &Classification) {
        self.parsed_packets += 1;
        *self.per_node.entry(node_id.to_string()).or_default() += 1;

        let flags = classification.flags;
        self.first_packets += u64::from(flags.first_packet());
        self.session_changes += u64::from(flags.session_change());
        self.sequence_resets += u64::from(flags.sequence_reset());
        self.out_of_order += u64::from(flags.out_of_order());
        self.duplicates += u64::from(flags.duplicate_sequence());
    }

    /// Mark the run as incomplete.
    pub fn mark_incomplete(&mut self) {
        self.complete = false;
    }

    /// `key=value` lines for the run log.
    pub fn log_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("total_packets={}", self.total_packets),
            format!("parsed_packets={}", self.parsed_packets),
            format!("parse_errors={}", self.parse_errors),
            format!("first_packets={}", self.first_packets),
            format!("seq_resets={}", self.sequence_resets),
            format!("out_of_orders={}", self.out_of_order),
            format!("duplicates={}", self.duplicates),
            format!("boot_changes={}", self.session_changes),
            format!("complete={}", self.complete),
        ];
        lines.extend(self.per_node.iter().map(|(id, n)| format!("node_packets[{id}]={n}")));
        lines
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Total packets   : {}", self.total_packets)?;
        writeln!(f, "  Parsed packets  : {}", self.parsed_packets)?;
        writeln!(f, "  Parse errors    : {}", self.parse_errors)?;
        writeln!(f, "  Seq resets      : {}", self.sequence_resets)?;
        writeln!(f, "  Out-of-order    : {}", self.out_of_order)?;
        writeln!(f, "  Duplicates      : {}", self.duplicates)?;
        write!(f, "  Boot changes    : {}", self.session_changes)?;
        if !self.per_node.is_empty() {
            write!(f, "\n  Packets per node:")?;
            for (id, n) in &self.per_node {
                write!(f, "\n    - {id}: {n}")?;
            }
        }
        if !self.complete {
            write!(f, "\n  RUN INCOMPLETE: output was not fully persisted")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::state::NodeStateStore;
    use crate::test_utils::{packet_at, reference_scenario};
    use proptest::prelude::*;

    #[test]
    fn reference_scenario_totals() {
        let mut store = NodeStateStore::new();
        let mut summary = RunSummary::new();
        for (i, (session, seq)) in reference_scenario().into_iter().enumerate() {
            summary.record_received();
            let c = classify(&mut store, &packet_at("ecg_01", session, seq, i as f64));
            summary.record_classified("ecg_01", &c);
        }
        summary.record_received();
        summary.record_parse_error();

        assert_eq!(summary.total_packets, 7);
        assert_eq!(summary.parsed_packets, 6);
        assert_eq!(summary.parse_errors, 1);
        assert_eq!(summary.first_packets, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.sequence_resets, 1);
        assert_eq!(summary.session_changes, 1);
        assert_eq!(summary.out_of_order, 1);
        assert_eq!(summary.per_node.get("ecg_01"), Some(&6));
        assert!(summary.complete);
    }

    #[test]
    fn log_lines_include_per_node_counts_sorted() {
        let mut summary = RunSummary::new();
        let c = crate::types::Classification::first_packet();
        summary.record_classified("z_node", &c);
        summary.record_classified("a_node", &c);
        let lines = summary.log_lines();
        let nodes: Vec<_> = lines.iter().filter(|l| l.starts_with("node_packets")).collect();
        assert_eq!(nodes, ["node_packets[a_node]=1", "node_packets[z_node]=1"]);
    }

    #[test]
    fn incomplete_runs_are_called_out() {
        let mut summary = RunSummary::new();
        summary.mark_incomplete();
        assert!(summary.to_string().contains("RUN INCOMPLETE"));
        assert!(summary.log_lines().contains(&"complete=false".to_string()));
    }

    proptest! {
        #[test]
        fn flag_totals_equal_per_packet_sums(
            stream in prop::collection::vec(("[ab]", 0u16..3, 0u32..8), 0..60),
        ) {
            let mut store = NodeStateStore::new();
            let mut summary = RunSummary::new();
            let mut sums = [0u64; 5];
            for (i, (node, session, seq)) in stream.iter().enumerate() {
                let c = classify(&mut store, &packet_at(node, *session, *seq, i as f64));
                summary.record_classified(node, &c);
                sums[0] += c.flags.first_packet() as u64;
                sums[1] += c.flags.session_change() as u64;
                sums[2] += c.flags.sequence_reset() as u64;
                sums[3] += c.flags.out_of_order() as u64;
                sums[4] += c.flags.duplicate_sequence() as u64;
            }
            prop_assert_eq!(summary.parsed_packets, stream.len() as u64);
            prop_assert_eq!(
                [summary.first_packets, summary.session_changes, summary.sequence_resets,
                 summary.out_of_order, summary.duplicates],
                sums
            );
            prop_assert_eq!(summary.per_node.values().sum::<u64>(), stream.len() as u64);
            prop_assert_eq!(summary.first_packets, summary.per_node.len() as u64);
        }
    }
}
