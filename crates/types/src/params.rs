//! Node identity and immutable protocol parameters.

use crate::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node within the cohort (`0 ≤ id < N`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters fixed for the lifetime of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolParams {
    /// Total number of nodes in the cohort (N).
    pub total_nodes: u32,
    /// Declared maximum number of faulty nodes (F).
    pub max_faulty: u32,
    /// This node's index.
    pub node_id: NodeId,
    /// The binary value this node starts with.
    pub initial_value: Value,
    /// Whether this node is configured to be silent.
    pub is_faulty: bool,
}

impl ProtocolParams {
    pub fn new(
        total_nodes: u32,
        max_faulty: u32,
        node_id: NodeId,
        initial_value: Value,
        is_faulty: bool,
    ) -> Self {
        Self {
            total_nodes,
            max_faulty,
            node_id,
            initial_value,
            is_faulty,
        }
    }

    /// The largest fault count under which agreement is expected:
    /// `⌊(N − 1) / 2⌋`.
    pub fn tolerance_threshold(&self) -> u32 {
        self.total_nodes.saturating_sub(1) / 2
    }

    /// Whether the declared fault count is above the tolerance threshold.
    ///
    /// In this regime the engine keeps cycling rounds and never latches a
    /// decision.
    pub fn exceeds_fault_limit(&self) -> bool {
        self.max_faulty > self.tolerance_threshold()
    }

    /// A tally must be strictly greater than this to count as a majority:
    /// `⌊N / 2⌋`.
    pub fn majority_threshold(&self) -> u64 {
        u64::from(self.total_nodes / 2)
    }

    /// How many binary votes a phase waits for before closing: `N − F`.
    pub fn participation_quorum(&self) -> u64 {
        u64::from(self.total_nodes.saturating_sub(self.max_faulty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(n: u32, f: u32) -> ProtocolParams {
        ProtocolParams::new(n, f, NodeId(0), Value::Zero, false)
    }

    #[test]
    fn tolerance_threshold_is_floor_half_of_n_minus_one() {
        assert_eq!(params(3, 0).tolerance_threshold(), 1);
        assert_eq!(params(4, 0).tolerance_threshold(), 1);
        assert_eq!(params(5, 0).tolerance_threshold(), 2);
        assert_eq!(params(10, 0).tolerance_threshold(), 4);
    }

    #[test]
    fn fault_limit_detection() {
        assert!(!params(5, 2).exceeds_fault_limit());
        assert!(params(5, 3).exceeds_fault_limit());
        assert!(!params(10, 4).exceeds_fault_limit());
        assert!(params(10, 5).exceeds_fault_limit());
    }

    #[test]
    fn quorums() {
        let p = params(5, 1);
        assert_eq!(p.majority_threshold(), 2);
        assert_eq!(p.participation_quorum(), 4);
    }

    #[test]
    fn node_id_is_transparent_on_the_wire() {
        assert_eq!(serde_json::to_string(&NodeId(3)).unwrap(), "3");
        assert_eq!(serde_json::from_str::<NodeId>("7").unwrap(), NodeId(7));
    }
}
