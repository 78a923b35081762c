//! Round-indexed vote tallies.

use benor_types::{Phase, Value};
use std::collections::BTreeMap;

/// Counters for one (phase, round), indexed by [`Value::index`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    counts: [u64; 3],
}

impl Tally {
    fn record(&mut self, value: Value) {
        self.counts[value.index()] += 1;
    }

    fn count(&self, value: Value) -> u64 {
        self.counts[value.index()]
    }
}

/// Accumulates inbound votes per (phase, round, value).
///
/// Tallies are created lazily on first touch from either the engine or an
/// arriving vote, and persist for the lifetime of the node. Counters are
/// monotonically non-decreasing and votes are **not** deduplicated by
/// sender: a vote delivered twice is counted twice.
#[derive(Debug, Default)]
pub struct Inbox {
    /// Per-round tallies: `[report, propose]`.
    rounds: BTreeMap<u64, [Tally; 2]>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn phase_index(phase: Phase) -> usize {
        match phase {
            Phase::Report => 0,
            Phase::Propose => 1,
        }
    }

    /// Idempotently ensure both phase tallies exist for `round`.
    pub fn prepare(&mut self, round: u64) {
        self.rounds.entry(round).or_default();
    }

    /// Count one vote. Creates the round's tallies if absent.
    pub fn record(&mut self, phase: Phase, round: u64, value: Value) {
        let tallies = self.rounds.entry(round).or_default();
        tallies[Self::phase_index(phase)].record(value);
    }

    /// Current counter for (phase, round, value); 0 if the round was never
    /// touched.
    pub fn count(&self, phase: Phase, round: u64, value: Value) -> u64 {
        self.rounds
            .get(&round)
            .map(|tallies| tallies[Self::phase_index(phase)].count(value))
            .unwrap_or(0)
    }

    /// How many *binary* votes (0s and 1s) have been tallied for a phase.
    ///
    /// `?` votes are excluded: the participation quorum counts only nodes
    /// that reported a terminal value.
    pub fn participation(&self, phase: Phase, round: u64) -> u64 {
        self.count(phase, round, Value::Zero) + self.count(phase, round, Value::One)
    }

    /// Number of rounds with at least one tally.
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }
}
