//! Network messages for the binary agreement protocol.

mod vote;

pub use vote::PhaseVote;
