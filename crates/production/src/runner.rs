//! Node runner: drives the state machine and executes its actions.

use crate::metrics::metrics;
use crate::network::HttpBroadcaster;
use crate::timers::TimerManager;
use benor_consensus::ConsensusState;
use benor_core::{Action, Event, OutboundMessage, StateMachine};
use benor_types::NodeSnapshot;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info};

/// Errors from the node runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Event channel closed")]
    ChannelClosed,
}

/// Handle for shutting down a running [`NodeRunner`].
///
/// When dropped, signals the runner to exit gracefully.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: Option<oneshot::Sender<()>>,
}

impl ShutdownHandle {
    /// Trigger shutdown (consumes the handle).
    pub fn shutdown(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ShutdownHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Drives the agreement state machine.
///
/// The runner is the single owner of the state machine: every event
/// (control, ingress, timer) funnels through it, which is what makes tally
/// increments atomic with respect to the engine's own reads. After each
/// event it publishes a fresh [`NodeSnapshot`] for the control surface.
pub struct NodeRunner {
    state: ConsensusState,
    /// Control and ingress events from the RPC handlers.
    event_rx: mpsc::Receiver<Event>,
    /// Timer fires. A dedicated channel so a vote flood can never starve
    /// the phase timers.
    timer_rx: mpsc::Receiver<Event>,
    timers: TimerManager,
    broadcaster: Arc<HttpBroadcaster>,
    snapshot: Arc<RwLock<NodeSnapshot>>,
    killed: Arc<AtomicBool>,
    start_time: Instant,
    shutdown_rx: oneshot::Receiver<()>,
}

impl NodeRunner {
    /// Create a runner and its shutdown handle.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        state: ConsensusState,
        event_rx: mpsc::Receiver<Event>,
        timer_rx: mpsc::Receiver<Event>,
        timers: TimerManager,
        broadcaster: Arc<HttpBroadcaster>,
        snapshot: Arc<RwLock<NodeSnapshot>>,
        killed: Arc<AtomicBool>,
    ) -> (Self, ShutdownHandle) {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let runner = Self {
            state,
            event_rx,
            timer_rx,
            timers,
            broadcaster,
            snapshot,
            killed,
            start_time: Instant::now(),
            shutdown_rx,
        };
        (
            runner,
            ShutdownHandle {
                tx: Some(shutdown_tx),
            },
        )
    }

    /// Run the event loop until shutdown or until every event source
    /// closes.
    pub async fn run(mut self) -> Result<(), RunnerError> {
        info!(node = %self.state.params().node_id, "Starting node runner");

        loop {
            tokio::select! {
                biased;

                // Shutdown always wins.
                _ = &mut self.shutdown_rx => {
                    info!(node = %self.state.params().node_id, "Shutdown signal received");
                    break;
                }

                // Timers next: liveness depends on them firing even under
                // a vote flood.
                Some(event) = self.timer_rx.recv() => {
                    self.dispatch(event).await;
                }

                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.dispatch(event).await,
                        None => break,
                    }
                }
            }
        }

        self.timers.cancel_all();
        Ok(())
    }

    async fn dispatch(&mut self, event: Event) {
        let event_type = event.type_name();
        self.state.set_time(self.start_time.elapsed());
        let actions = self.state.handle(event);

        if !actions.is_empty() {
            debug!(
                node = %self.state.params().node_id,
                event = event_type,
                num_actions = actions.len(),
                "Event produced actions"
            );
        }

        for action in actions {
            self.process_action(action);
        }

        self.publish_snapshot().await;
    }

    fn process_action(&mut self, action: Action) {
        match action {
            Action::Broadcast {
                message: OutboundMessage::PhaseVote(vote),
            } => {
                let broadcaster = self.broadcaster.clone();
                tokio::spawn(async move {
                    broadcaster.broadcast(vote).await;
                });
            }
            Action::SetTimer { id, duration } => {
                self.timers.set_timer(id, duration);
            }
            Action::CancelTimer { id } => {
                self.timers.cancel_timer(id);
            }
        }
    }

    async fn publish_snapshot(&self) {
        let mut snapshot = self.state.snapshot();
        snapshot.killed = snapshot.killed || self.killed.load(Ordering::SeqCst);

        if let Some(k) = snapshot.k {
            metrics().round.set(k as f64);
        }
        if snapshot.decided == Some(true) {
            metrics().decided.set(1.0);
        }

        *self.snapshot.write().await = snapshot;
    }
}
