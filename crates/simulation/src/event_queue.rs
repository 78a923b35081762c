//! Deterministic ordering key for the global event queue.

use crate::NodeIndex;
use benor_core::EventPriority;
use std::time::Duration;

/// Ordering key for queued events.
///
/// Events are processed by (time, priority, sequence): earlier times
/// first, then higher priority (timers before network before client), then
/// insertion order. The sequence counter makes every key unique, so a
/// `BTreeMap<EventKey, Event>` is a deterministic priority queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventKey {
    pub time: Duration,
    pub priority: EventPriority,
    pub sequence: u64,
    pub node: NodeIndex,
}
