//! The externally visible state of a node.

use crate::Value;
use serde::{Deserialize, Serialize};

/// Point-in-time view of a node's agreement state.
///
/// This is the shape returned by `GET /getState`. The `Option` fields are
/// `None` exactly when the node is faulty (they serialize as JSON `null`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Whether the node has been permanently stopped.
    pub killed: bool,
    /// The node's current proposal.
    pub x: Option<Value>,
    /// Whether a terminal value has been latched.
    pub decided: Option<bool>,
    /// The current round number.
    pub k: Option<u64>,
}
