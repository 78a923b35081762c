//! Deterministic simulation runner.
//!
//! Processes events in deterministic order and executes actions. Given
//! the same seed, a run produces identical results. Each node is an
//! independent state machine; broadcasts become delivery events with
//! sampled latency.

use crate::event_queue::EventKey;
use crate::network::{NetworkConfig, SimulatedNetwork};
use crate::NodeIndex;
use benor_consensus::{ConsensusConfig, ConsensusState};
use benor_core::{Action, Event, OutboundMessage, StateMachine, TimerId};
use benor_types::{NodeId, NodeSnapshot, ProtocolParams, Value};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{info, trace};

/// Statistics collected during simulation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulationStats {
    /// Total events processed.
    pub events_processed: u64,
    /// Total actions generated.
    pub actions_generated: u64,
    /// Messages sent (successfully scheduled for delivery).
    pub messages_sent: u64,
    /// Messages dropped due to network partition.
    pub messages_dropped_partition: u64,
    /// Messages dropped due to packet loss.
    pub messages_dropped_loss: u64,
    /// Timers set.
    pub timers_set: u64,
    /// Timers cancelled.
    pub timers_cancelled: u64,
}

impl SimulationStats {
    /// Total messages dropped (partition + packet loss).
    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped_partition + self.messages_dropped_loss
    }

    /// Message delivery rate (sent / (sent + dropped)).
    pub fn delivery_rate(&self) -> f64 {
        let total = self.messages_sent + self.messages_dropped();
        if total == 0 {
            1.0
        } else {
            self.messages_sent as f64 / total as f64
        }
    }
}

/// Deterministic simulation runner for an agreement cohort.
pub struct SimulationRunner {
    /// All nodes, indexed by NodeIndex.
    nodes: Vec<ConsensusState>,

    /// Global event queue, ordered deterministically.
    event_queue: BTreeMap<EventKey, Event>,

    /// Sequence counter for deterministic ordering.
    sequence: u64,

    /// Current simulation time.
    now: Duration,

    /// Network simulator.
    network: SimulatedNetwork,

    /// RNG for network conditions (seeded for determinism).
    rng: ChaCha8Rng,

    /// Timer registry for cancellation support.
    /// Maps (node, timer_id) -> event_key for removal.
    timers: HashMap<(NodeIndex, TimerId), EventKey>,

    /// Statistics.
    stats: SimulationStats,
}

impl SimulationRunner {
    /// Create a cohort of `initial_values.len()` nodes.
    ///
    /// `faulty` lists the indices of silent nodes; their initial value is
    /// ignored, like a crashed process that still occupies a seat.
    pub fn new(
        network_config: NetworkConfig,
        max_faulty: u32,
        initial_values: &[Value],
        faulty: &[NodeIndex],
        seed: u64,
    ) -> Self {
        let num_nodes = initial_values.len() as u32;
        let network = SimulatedNetwork::new(network_config, num_nodes);
        let rng = ChaCha8Rng::seed_from_u64(seed);

        let nodes: Vec<ConsensusState> = initial_values
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                let params = ProtocolParams::new(
                    num_nodes,
                    max_faulty,
                    NodeId(i as u32),
                    value,
                    faulty.contains(&(i as u32)),
                );
                ConsensusState::new(params, ConsensusConfig::default())
            })
            .collect();

        info!(
            num_nodes,
            max_faulty,
            faulty = faulty.len(),
            seed,
            "Created simulation runner"
        );

        Self {
            nodes,
            event_queue: BTreeMap::new(),
            sequence: 0,
            now: Duration::ZERO,
            network,
            rng,
            timers: HashMap::new(),
            stats: SimulationStats::default(),
        }
    }

    /// Number of nodes in the cohort.
    pub fn num_nodes(&self) -> u32 {
        self.nodes.len() as u32
    }

    /// Get simulation statistics.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Get current simulation time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Get a reference to a node by index.
    pub fn node(&self, index: NodeIndex) -> Option<&ConsensusState> {
        self.nodes.get(index as usize)
    }

    /// The externally visible state of a node.
    pub fn snapshot(&self, index: NodeIndex) -> NodeSnapshot {
        self.nodes[index as usize].snapshot()
    }

    /// Snapshots of the whole cohort.
    pub fn snapshots(&self) -> Vec<NodeSnapshot> {
        self.nodes.iter().map(|n| n.snapshot()).collect()
    }

    /// Get a mutable reference to the network for partition/loss
    /// configuration.
    pub fn network_mut(&mut self) -> &mut SimulatedNetwork {
        &mut self.network
    }

    /// Schedule an event for a node at `now + delay`.
    pub fn schedule_event(&mut self, node: NodeIndex, delay: Duration, event: Event) {
        let key = EventKey {
            time: self.now + delay,
            priority: event.priority(),
            sequence: self.sequence,
            node,
        };
        self.sequence += 1;
        self.event_queue.insert(key, event);
    }

    /// Start every non-faulty node at the current simulation time.
    pub fn start_all(&mut self) {
        for i in 0..self.nodes.len() as u32 {
            if !self.nodes[i as usize].params().is_faulty {
                self.schedule_event(i, Duration::ZERO, Event::StartConsensus);
            }
        }
    }

    /// Stop one node after `delay`.
    pub fn stop_node(&mut self, node: NodeIndex, delay: Duration) {
        self.schedule_event(node, delay, Event::StopConsensus);
    }

    /// Process queued events until the queue drains past `deadline`.
    ///
    /// Advances the clock to each event's timestamp; on return `now()` is
    /// exactly `deadline`.
    pub fn run_until(&mut self, deadline: Duration) {
        while let Some((&key, _)) = self.event_queue.iter().next() {
            if key.time > deadline {
                break;
            }
            let Some(event) = self.event_queue.remove(&key) else {
                break;
            };
            self.now = key.time;

            // A firing timer leaves the registry.
            if let Some(timer_id) = timer_id_of(&event) {
                self.timers.remove(&(key.node, timer_id));
            }

            let node = &mut self.nodes[key.node as usize];
            node.set_time(self.now);
            let actions = node.handle(event);

            self.stats.events_processed += 1;
            self.stats.actions_generated += actions.len() as u64;

            for action in actions {
                self.process_action(key.node, action);
            }
        }
        self.now = deadline;
    }

    fn process_action(&mut self, from: NodeIndex, action: Action) {
        match action {
            Action::Broadcast {
                message: OutboundMessage::PhaseVote(vote),
            } => {
                for to in 0..self.nodes.len() as u32 {
                    if to == from {
                        continue;
                    }
                    if self.network.is_partitioned(from, to) {
                        self.stats.messages_dropped_partition += 1;
                        continue;
                    }
                    match self.network.should_deliver(from, to, &mut self.rng) {
                        Some(latency) => {
                            self.stats.messages_sent += 1;
                            trace!(from, to, ?latency, "Scheduling vote delivery");
                            self.schedule_event(to, latency, Event::PhaseVoteReceived { vote });
                        }
                        None => {
                            self.stats.messages_dropped_loss += 1;
                        }
                    }
                }
            }
            Action::SetTimer { id, duration } => {
                self.cancel_timer(from, id);
                let key = EventKey {
                    time: self.now + duration,
                    priority: benor_core::EventPriority::Timer,
                    sequence: self.sequence,
                    node: from,
                };
                self.sequence += 1;
                self.event_queue.insert(key, timer_event(id));
                self.timers.insert((from, id), key);
                self.stats.timers_set += 1;
            }
            Action::CancelTimer { id } => {
                self.cancel_timer(from, id);
            }
        }
    }

    fn cancel_timer(&mut self, node: NodeIndex, id: TimerId) {
        if let Some(key) = self.timers.remove(&(node, id)) {
            self.event_queue.remove(&key);
            self.stats.timers_cancelled += 1;
        }
    }
}

fn timer_event(id: TimerId) -> Event {
    match id {
        TimerId::PhaseWait => Event::PhaseWaitTimer,
        TimerId::RoundDelay => Event::RoundDelayTimer,
    }
}

fn timer_id_of(event: &Event) -> Option<TimerId> {
    match event {
        Event::PhaseWaitTimer => Some(TimerId::PhaseWait),
        Event::RoundDelayTimer => Some(TimerId::RoundDelay),
        _ => None,
    }
}
