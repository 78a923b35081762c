//! Action types for the deterministic state machine.

use crate::{message::OutboundMessage, TimerId};
use std::time::Duration;

/// Actions the state machine wants to perform.
///
/// Actions are **commands** - they describe something to do.
/// The runner executes actions and may convert results back into events.
#[derive(Debug, Clone)]
pub enum Action {
    /// Deliver a message to every other node in the cohort.
    ///
    /// Production fans out over HTTP; simulation schedules delivery events
    /// with sampled latency. Per-peer failures are the runner's concern and
    /// are never reported back to the state machine.
    Broadcast { message: OutboundMessage },

    /// Set a timer to fire after a duration.
    ///
    /// Setting a timer with an id that is already pending replaces it.
    SetTimer { id: TimerId, duration: Duration },

    /// Cancel a previously set timer.
    CancelTimer { id: TimerId },
}
