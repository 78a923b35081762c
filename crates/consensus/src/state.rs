//! The agreement state machine.
//!
//! This module implements the two-phase round structure as a synchronous,
//! event-driven model.

use benor_core::{Action, Event, OutboundMessage, StateMachine, TimerId};
use benor_messages::PhaseVote;
use benor_types::{NodeSnapshot, Phase, ProtocolParams, Value};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::config::ConsensusConfig;
use crate::inbox::Inbox;

/// Where the engine currently is within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundPhase {
    /// Not inside a phase: disarmed, decided, or waiting out the
    /// inter-round delay.
    Idle,
    /// Waiting for report-phase participation.
    Reporting,
    /// Waiting for propose-phase participation.
    Proposing,
}

/// Binary agreement state machine.
///
/// Drives rounds, accumulates phase votes through the [`Inbox`], applies
/// the majority decision rule, and latches decisions.
///
/// # State Machine Flow
///
/// 1. **Start** → tally own report vote, broadcast it, arm the phase timer
/// 2. **Vote received / timer expired** → close the report phase: compute
///    the confirm value, tally and broadcast the propose vote
/// 3. **Vote received / timer expired** → close the propose phase: decide,
///    adopt, or coin-flip; then schedule the next round
/// 4. **Stop** → latch `killed`, cancel timers, go idle
pub struct ConsensusState {
    // ═══════════════════════════════════════════════════════════════════════
    // Identity & configuration
    // ═══════════════════════════════════════════════════════════════════════
    params: ProtocolParams,
    config: ConsensusConfig,

    // ═══════════════════════════════════════════════════════════════════════
    // Agreement state
    // ═══════════════════════════════════════════════════════════════════════
    /// Current proposal. `None` iff the node is faulty.
    x: Option<Value>,

    /// Whether a terminal value has been latched. `None` iff faulty.
    decided: Option<bool>,

    /// Current round, starting at 1. `None` iff faulty.
    k: Option<u64>,

    /// Armed by `StartConsensus`, disarmed by `StopConsensus`.
    started: bool,

    /// Permanently stopped. Monotonic.
    killed: bool,

    /// Progress within the current round.
    phase: RoundPhase,

    /// Per-round vote tallies.
    inbox: Inbox,

    // ═══════════════════════════════════════════════════════════════════════
    // Time
    // ═══════════════════════════════════════════════════════════════════════
    /// Current time (set by the runner before each handle call).
    now: Duration,
}

impl std::fmt::Debug for ConsensusState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusState")
            .field("node_id", &self.params.node_id)
            .field("x", &self.x)
            .field("decided", &self.decided)
            .field("k", &self.k)
            .field("started", &self.started)
            .field("killed", &self.killed)
            .field("phase", &self.phase)
            .finish()
    }
}

impl ConsensusState {
    /// Create a new agreement state machine.
    ///
    /// A faulty node boots with `x`, `decided`, and `k` unset and never
    /// mutates them.
    pub fn new(params: ProtocolParams, config: ConsensusConfig) -> Self {
        let (x, decided, k) = if params.is_faulty {
            (None, None, None)
        } else {
            (Some(params.initial_value), Some(false), Some(1))
        };

        Self {
            params,
            config,
            x,
            decided,
            k,
            started: false,
            killed: false,
            phase: RoundPhase::Idle,
            inbox: Inbox::new(),
            now: Duration::ZERO,
        }
    }

    /// The immutable parameters this node was booted with.
    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    /// Read access to the tallies (used by tests and simulation stats).
    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    /// Whether the node has been permanently stopped.
    pub fn is_killed(&self) -> bool {
        self.killed
    }

    /// Whether the engine has been armed.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// The externally visible state, shaped for the control surface.
    ///
    /// - Faulty nodes expose no agreement state at all.
    /// - Above the tolerated fault count the node reports `decided: false`
    ///   with the round floored at 11, so a caller can distinguish "still
    ///   running because agreement is impossible" from a node that simply
    ///   has not finished yet.
    pub fn snapshot(&self) -> NodeSnapshot {
        if self.params.is_faulty {
            return NodeSnapshot {
                killed: self.killed,
                x: None,
                decided: None,
                k: None,
            };
        }

        if self.params.exceeds_fault_limit() {
            return NodeSnapshot {
                killed: self.killed,
                x: self.x,
                decided: Some(false),
                k: self.k.map(|k| k.max(11)),
            };
        }

        NodeSnapshot {
            killed: self.killed,
            x: self.x,
            decided: self.decided,
            k: self.k,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Control
    // ═══════════════════════════════════════════════════════════════════════

    fn on_start(&mut self) -> Vec<Action> {
        if self.started {
            trace!(node = %self.params.node_id, "Start ignored, engine already armed");
            return vec![];
        }

        self.started = true;
        info!(
            node = %self.params.node_id,
            total_nodes = self.params.total_nodes,
            max_faulty = self.params.max_faulty,
            initial = %self.params.initial_value,
            "Consensus armed"
        );
        self.begin_round()
    }

    fn on_stop(&mut self) -> Vec<Action> {
        if self.killed {
            return vec![];
        }

        self.killed = true;
        self.started = false;
        self.phase = RoundPhase::Idle;
        info!(node = %self.params.node_id, "Consensus stopped");
        vec![
            Action::CancelTimer {
                id: TimerId::PhaseWait,
            },
            Action::CancelTimer {
                id: TimerId::RoundDelay,
            },
        ]
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Round progression
    // ═══════════════════════════════════════════════════════════════════════

    /// Open round `k`: tally our own report vote, broadcast it, arm the
    /// phase timer. The self-tally strictly precedes the broadcast so the
    /// node counts itself even if every peer drops the message.
    fn begin_round(&mut self) -> Vec<Action> {
        let (Some(k), Some(x)) = (self.k, self.x) else {
            return vec![];
        };

        self.inbox.prepare(k);
        self.inbox.record(Phase::Report, k, x);
        self.phase = RoundPhase::Reporting;

        debug!(node = %self.params.node_id, round = k, value = %x, "Beginning round");

        let vote = PhaseVote::new(Phase::Report, k, x, self.params.node_id);
        let mut actions = vec![
            Action::Broadcast {
                message: OutboundMessage::PhaseVote(vote),
            },
            Action::SetTimer {
                id: TimerId::PhaseWait,
                duration: self.config.phase_timeout,
            },
        ];

        // A tiny cohort can satisfy the quorum with the self-tally alone.
        actions.extend(self.try_close_report(k));
        actions
    }

    fn on_round_delay(&mut self) -> Vec<Action> {
        if !self.started || self.phase != RoundPhase::Idle || self.decided == Some(true) {
            return vec![];
        }
        self.begin_round()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Vote ingress
    // ═══════════════════════════════════════════════════════════════════════

    fn on_phase_vote(&mut self, vote: PhaseVote) -> Vec<Action> {
        if vote.round == 0 {
            warn!(node = %self.params.node_id, sender = %vote.sender, "Dropping vote for round 0");
            return vec![];
        }

        // Always tallied, even before start or for rounds we have not
        // reached yet: peers may be ahead of us.
        self.inbox.record(vote.phase, vote.round, vote.value);
        trace!(
            node = %self.params.node_id,
            sender = %vote.sender,
            phase = %vote.phase,
            round = vote.round,
            value = %vote.value,
            "Vote tallied"
        );

        if !self.started {
            return vec![];
        }
        let Some(k) = self.k else {
            return vec![];
        };
        if vote.round != k {
            return vec![];
        }

        match (self.phase, vote.phase) {
            (RoundPhase::Reporting, Phase::Report) => self.try_close_report(k),
            (RoundPhase::Proposing, Phase::Propose) => self.try_close_propose(k),
            _ => vec![],
        }
    }

    fn on_phase_wait_expired(&mut self) -> Vec<Action> {
        if !self.started {
            return vec![];
        }
        let Some(k) = self.k else {
            return vec![];
        };

        match self.phase {
            RoundPhase::Reporting => {
                debug!(
                    node = %self.params.node_id,
                    round = k,
                    tallied = self.inbox.participation(Phase::Report, k),
                    needed = self.params.participation_quorum(),
                    "Report wait expired, proceeding with partial tally"
                );
                self.close_report(k)
            }
            RoundPhase::Proposing => {
                debug!(
                    node = %self.params.node_id,
                    round = k,
                    tallied = self.inbox.participation(Phase::Propose, k),
                    needed = self.params.participation_quorum(),
                    "Propose wait expired, proceeding with partial tally"
                );
                self.close_propose(k)
            }
            RoundPhase::Idle => vec![],
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Phase closure
    // ═══════════════════════════════════════════════════════════════════════

    fn try_close_report(&mut self, k: u64) -> Vec<Action> {
        if self.inbox.participation(Phase::Report, k) >= self.params.participation_quorum() {
            self.close_report(k)
        } else {
            vec![]
        }
    }

    /// Close the report phase: derive the confirm value from a strict
    /// majority of reports, tally and broadcast it as our propose vote.
    fn close_report(&mut self, k: u64) -> Vec<Action> {
        let majority = self.params.majority_threshold();
        let confirm = if self.inbox.count(Phase::Report, k, Value::Zero) > majority {
            Value::Zero
        } else if self.inbox.count(Phase::Report, k, Value::One) > majority {
            Value::One
        } else {
            Value::Undecided
        };

        self.inbox.record(Phase::Propose, k, confirm);
        self.phase = RoundPhase::Proposing;

        debug!(node = %self.params.node_id, round = k, confirm = %confirm, "Report phase closed");

        let vote = PhaseVote::new(Phase::Propose, k, confirm, self.params.node_id);
        let mut actions = vec![
            Action::Broadcast {
                message: OutboundMessage::PhaseVote(vote),
            },
            Action::SetTimer {
                id: TimerId::PhaseWait,
                duration: self.config.phase_timeout,
            },
        ];

        actions.extend(self.try_close_propose(k));
        actions
    }

    fn try_close_propose(&mut self, k: u64) -> Vec<Action> {
        if self.inbox.participation(Phase::Propose, k) >= self.params.participation_quorum() {
            self.close_propose(k)
        } else {
            vec![]
        }
    }

    /// Close the propose phase and end the round.
    ///
    /// From round 2 onward a plurality between the binary tallies becomes
    /// the node's value; within the tolerated fault count that also latches
    /// the decision. A tie applies the deterministic parity coin. Round 1
    /// only ever advances.
    fn close_propose(&mut self, k: u64) -> Vec<Action> {
        let c0 = self.inbox.count(Phase::Propose, k, Value::Zero);
        let c1 = self.inbox.count(Phase::Propose, k, Value::One);

        if k >= 2 {
            if c0 != c1 {
                let final_value = if c0 > c1 { Value::Zero } else { Value::One };
                self.x = Some(final_value);

                if !self.params.exceeds_fault_limit() {
                    self.decided = Some(true);
                    self.phase = RoundPhase::Idle;
                    info!(
                        node = %self.params.node_id,
                        round = k,
                        value = %final_value,
                        elapsed_ms = self.now.as_millis() as u64,
                        "Decision latched"
                    );
                    return vec![Action::CancelTimer {
                        id: TimerId::PhaseWait,
                    }];
                }

                debug!(
                    node = %self.params.node_id,
                    round = k,
                    value = %final_value,
                    "Plurality adopted; fault limit exceeded, continuing"
                );
            } else {
                // Deterministic coin: odd rounds flip to 1, even rounds to 0.
                let coin = Value::from_bit(k % 2 == 1);
                self.x = Some(coin);
                debug!(node = %self.params.node_id, round = k, coin = %coin, "Propose tie, coin applied");
            }
        }

        self.k = Some(k + 1);
        self.phase = RoundPhase::Idle;
        vec![
            Action::CancelTimer {
                id: TimerId::PhaseWait,
            },
            Action::SetTimer {
                id: TimerId::RoundDelay,
                duration: self.config.round_delay,
            },
        ]
    }
}

impl StateMachine for ConsensusState {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            // Stop applies to every node, faulty included: `killed` is the
            // one field a faulty node still owns.
            Event::StopConsensus => self.on_stop(),
            _ if self.params.is_faulty || self.killed => vec![],
            Event::StartConsensus => self.on_start(),
            Event::PhaseVoteReceived { vote } => self.on_phase_vote(vote),
            Event::PhaseWaitTimer => self.on_phase_wait_expired(),
            Event::RoundDelayTimer => self.on_round_delay(),
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
    }
}
