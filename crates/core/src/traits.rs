//! The state machine contract implemented by the consensus engine.

use crate::{Action, Event};
use std::time::Duration;

/// A synchronous, deterministic state machine.
///
/// Runners call [`StateMachine::set_time`] before every
/// [`StateMachine::handle`] so the machine has a consistent notion of
/// "now" without performing clock reads itself.
pub trait StateMachine {
    /// Process one event and return the actions it produced.
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Inform the machine of the current time.
    fn set_time(&mut self, now: Duration);
}
