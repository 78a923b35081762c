//! Outbound message types for network communication.

use benor_messages::PhaseVote;

/// Outbound network messages.
///
/// These are the messages a node can send to other nodes. The runner
/// handles the actual network I/O.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    /// A report- or propose-phase vote.
    PhaseVote(PhaseVote),
}

impl OutboundMessage {
    /// Get a human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            OutboundMessage::PhaseVote(_) => "PhaseVote",
        }
    }
}
