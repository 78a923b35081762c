//! HTTP request handlers for the control surface.

use crate::metrics::metrics;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use benor_core::Event;
use benor_messages::PhaseVote;
use benor_types::{NodeSnapshot, ProtocolParams};
use prometheus::{Encoder, TextEncoder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

/// Shared state for the control-surface handlers.
#[derive(Clone)]
pub struct RpcState {
    /// Set once the listener is bound; peers poll it through `/ready`.
    pub ready: Arc<AtomicBool>,
    /// Set by `/stop`. Read by the handlers, the broadcaster, and the
    /// runner.
    pub killed: Arc<AtomicBool>,
    /// Immutable parameters of this node.
    pub params: ProtocolParams,
    /// Channel feeding the runner's event loop.
    pub event_tx: mpsc::Sender<Event>,
    /// Latest published view of the agreement state.
    pub snapshot: Arc<RwLock<NodeSnapshot>>,
}

impl RpcState {
    fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Liveness & Readiness
// ═══════════════════════════════════════════════════════════════════════════

/// Handler for `GET /status`.
pub async fn status_handler(State(state): State<RpcState>) -> impl IntoResponse {
    if state.params.is_faulty {
        (StatusCode::INTERNAL_SERVER_ERROR, "faulty")
    } else {
        (StatusCode::OK, "live")
    }
}

/// Handler for `GET /ready` - readiness probe for the launch barrier.
pub async fn ready_handler(State(state): State<RpcState>) -> impl IntoResponse {
    if state.ready.load(Ordering::SeqCst) {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "starting")
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Vote Ingress
// ═══════════════════════════════════════════════════════════════════════════

/// Handler for `POST /message`.
///
/// The body is decoded by hand so that every malformed payload gets the
/// same `400 Invalid message format` answer regardless of which field is
/// missing or out of domain.
pub async fn message_handler(State(state): State<RpcState>, body: String) -> impl IntoResponse {
    if state.is_killed() || state.params.is_faulty {
        // Silently dropped: a stopped or faulty node acknowledges without
        // tallying.
        return (StatusCode::OK, "Message received");
    }

    let vote: PhaseVote = match serde_json::from_str(&body) {
        Ok(vote) => vote,
        Err(error) => {
            metrics().invalid_messages.inc();
            warn!(%error, "Rejecting malformed vote payload");
            return (StatusCode::BAD_REQUEST, "Invalid message format");
        }
    };

    if vote.round == 0 {
        metrics().invalid_messages.inc();
        warn!(sender = %vote.sender, "Rejecting vote for round 0");
        return (StatusCode::BAD_REQUEST, "Invalid message format");
    }

    metrics().votes_received.inc();
    if state
        .event_tx
        .send(Event::PhaseVoteReceived { vote })
        .await
        .is_err()
    {
        // Runner is gone: the node is shutting down, treat as a no-op.
        debug!("Dropping vote, runner has stopped");
    }

    (StatusCode::OK, "Message received")
}

// ═══════════════════════════════════════════════════════════════════════════
// Start / Stop
// ═══════════════════════════════════════════════════════════════════════════

/// Handler for `GET /start`.
pub async fn start_handler(State(state): State<RpcState>) -> impl IntoResponse {
    if state.params.is_faulty || state.is_killed() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Cannot start: node is faulty or stopped",
        );
    }

    if state.event_tx.send(Event::StartConsensus).await.is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Cannot start: node is shutting down",
        );
    }

    (StatusCode::OK, "Consensus started")
}

/// Handler for `GET /stop`.
///
/// The control surface owns the `killed` flag: it is latched here before
/// the engine ever sees the stop event, so ingress and broadcasts cut off
/// immediately.
pub async fn stop_handler(State(state): State<RpcState>) -> impl IntoResponse {
    state.killed.store(true, Ordering::SeqCst);
    let _ = state.event_tx.send(Event::StopConsensus).await;
    (StatusCode::OK, "Consensus stopped")
}

// ═══════════════════════════════════════════════════════════════════════════
// State Introspection
// ═══════════════════════════════════════════════════════════════════════════

/// Handler for `GET /getState`.
pub async fn get_state_handler(State(state): State<RpcState>) -> impl IntoResponse {
    let mut snapshot = *state.snapshot.read().await;
    // `/stop` may have latched the flag before the runner published a new
    // snapshot; the control surface's view wins.
    snapshot.killed = snapshot.killed || state.is_killed();
    Json(snapshot)
}

// ═══════════════════════════════════════════════════════════════════════════
// Metrics
// ═══════════════════════════════════════════════════════════════════════════

/// Handler for `GET /metrics` - Prometheus metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = ?e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics".to_string(),
        )
            .into_response();
    }

    (
        [(
            axum::http::header::CONTENT_TYPE,
            encoder.format_type().to_string(),
        )],
        buffer,
    )
        .into_response()
}
