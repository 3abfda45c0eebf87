//! Per-node state store

use std::collections::HashMap;
use std::collections::hash_map::Iter;

/// Minimal history kept for one claimed node identity.
///
/// `last_*` fields always describe the most recently processed packet, even
/// when that packet was flagged. They are only meaningful once `seen` is true.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeState {
    pub seen: bool,
    pub last_arrival: f64,
    pub last_seq: u32,
    pub last_session_id: u16,
}

/// Mapping from node identity to [`NodeState`], created lazily.
///
/// The store is owned by whoever drives classification and is passed into
/// [`classify`](crate::classifier::classify) explicitly, so independent runs
/// never share state.
#[derive(Debug, Default)]
pub struct NodeStateStore {
    nodes: HashMap<String, NodeState>,
}

impl NodeStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the state for `node_id`, creating an unseen entry on first use.
    pub fn get_or_create(&mut self, node_id: &str) -> &mut NodeState {
        self.nodes.entry(node_id.to_owned()).or_default()
    }

    pub fn get(&self, node_id: &str) -> Option<&NodeState> {
        self.nodes.get(node_id)
    }

    /// Number of distinct identities seen so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, String, NodeState> {
        self.nodes.iter()
    }
}
