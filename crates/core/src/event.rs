//! Event types for the deterministic state machine.

use benor_messages::PhaseVote;

/// Priority levels for event ordering within the same timestamp.
///
/// Events at the same simulation time are processed in priority order.
/// Lower values = higher priority (processed first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EventPriority {
    /// Timer events: scheduled by the node itself.
    Timer = 0,

    /// Network events: inbound votes from other nodes.
    Network = 1,

    /// Client events: start/stop requests from the control surface.
    Client = 2,
}

/// All possible events a node can receive.
///
/// Events are **passive data** - they describe something that happened.
/// The state machine processes events and returns actions.
#[derive(Debug, Clone)]
pub enum Event {
    // ═══════════════════════════════════════════════════════════════════════
    // Control (priority: Client)
    // ═══════════════════════════════════════════════════════════════════════
    /// Arm the engine and begin round 1.
    StartConsensus,

    /// Permanently stop the node: disarm the engine, cancel timers.
    StopConsensus,

    // ═══════════════════════════════════════════════════════════════════════
    // Network (priority: Network)
    // ═══════════════════════════════════════════════════════════════════════
    /// A phase vote arrived from a peer (or was validated by the ingress
    /// route). Sender identity comes from the vote's `sender` field.
    PhaseVoteReceived { vote: PhaseVote },

    // ═══════════════════════════════════════════════════════════════════════
    // Timers (priority: Timer)
    // ═══════════════════════════════════════════════════════════════════════
    /// The bounded wait for the in-progress phase expired; close the phase
    /// with whatever tally is present.
    PhaseWaitTimer,

    /// The inter-round delay elapsed; begin the next round.
    RoundDelayTimer,
}

impl Event {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::StartConsensus => "StartConsensus",
            Event::StopConsensus => "StopConsensus",
            Event::PhaseVoteReceived { .. } => "PhaseVoteReceived",
            Event::PhaseWaitTimer => "PhaseWaitTimer",
            Event::RoundDelayTimer => "RoundDelayTimer",
        }
    }

    /// The scheduling priority of this event.
    pub fn priority(&self) -> EventPriority {
        match self {
            Event::PhaseWaitTimer | Event::RoundDelayTimer => EventPriority::Timer,
            Event::PhaseVoteReceived { .. } => EventPriority::Network,
            Event::StartConsensus | Event::StopConsensus => EventPriority::Client,
        }
    }
}
