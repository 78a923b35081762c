//! Randomized binary agreement state machine.
//!
//! This crate provides a synchronous implementation of a Ben-Or style
//! binary agreement protocol that can be used for both simulation and
//! production.
//!
//! # Architecture
//!
//! The state machine processes events synchronously:
//!
//! - `Event::StartConsensus` → arm the engine, begin round 1
//! - `Event::PhaseVoteReceived` → tally the vote, close the phase if its
//!   participation quorum is reached
//! - `Event::PhaseWaitTimer` → close the in-progress phase with a partial
//!   tally
//! - `Event::RoundDelayTimer` → begin the next round
//! - `Event::StopConsensus` → set `killed`, disarm, cancel timers
//!
//! All I/O is performed by the runner via returned `Action`s.
//!
//! # Protocol
//!
//! Each round `k` has two broadcast phases over the value domain {0, 1, ?}:
//!
//! 1. **Report**: every node broadcasts its current value `x` (tallying its
//!    own vote first) and waits for `N − F` binary votes, bounded by a short
//!    timeout.
//! 2. **Propose**: a node that saw a strict majority (`> ⌊N/2⌋`) of one
//!    binary value proposes it; otherwise it proposes `?`. Again it waits
//!    for `N − F` binary votes, bounded by the same timeout.
//!
//! From round 2 onward, a propose-phase plurality between `0` and `1`
//! becomes the node's value; if that happened within the tolerated fault
//! count the node latches `decided` and stops. A tie falls back to the
//! deterministic parity coin (odd rounds flip to 1, even rounds to 0),
//! after which the node advances to round `k + 1`.
//!
//! ## Safety
//!
//! - **Decision latching**: once `decided` is set the value `x` is never
//!   mutated again; the engine goes idle and only the inbox keeps counting.
//! - **Self participation**: a node's own vote is tallied before the
//!   corresponding broadcast action is emitted, so the node counts itself
//!   even if every peer drops the message.
//!
//! ## Liveness
//!
//! - **Bounded waits**: both phase waits are capped by a timer; on expiry
//!   the phase closes with whatever tally is present.
//! - **Over-the-limit mode**: when the declared fault count exceeds
//!   `⌊(N − 1)/2⌋` the engine keeps cycling rounds without ever latching a
//!   decision, so the failure is observable rather than silent.

mod config;
mod inbox;
mod state;

pub use config::ConsensusConfig;
pub use inbox::Inbox;
pub use state::ConsensusState;
