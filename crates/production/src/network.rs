//! HTTP fan-out to peers and the network readiness barrier.

use crate::metrics::metrics;
use benor_messages::PhaseVote;
use benor_types::NodeId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// How often the broadcaster re-checks the readiness flag and the probe
/// re-polls peers.
const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Per-request timeout for deliveries and probes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Address of one peer in the cohort.
#[derive(Debug, Clone)]
pub struct PeerEndpoint {
    pub node_id: NodeId,
    /// Base URL without trailing slash, e.g. `http://127.0.0.1:3001`.
    pub base_url: String,
}

impl PeerEndpoint {
    pub fn new(node_id: NodeId, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { node_id, base_url }
    }
}

/// Delivers outbound votes to every peer over HTTP.
///
/// Deliveries wait for the readiness flag (re-checking `killed` while
/// polling), then fan out concurrently. Per-peer failures are swallowed:
/// one unreachable peer must never block the others, and the state machine
/// never hears about transport errors.
pub struct HttpBroadcaster {
    client: reqwest::Client,
    peers: Vec<PeerEndpoint>,
    node_id: NodeId,
    killed: Arc<AtomicBool>,
    network_ready: Arc<AtomicBool>,
}

impl HttpBroadcaster {
    /// Create a broadcaster for `node_id`. `peers` must not contain the
    /// node itself.
    pub fn new(
        node_id: NodeId,
        peers: Vec<PeerEndpoint>,
        killed: Arc<AtomicBool>,
        network_ready: Arc<AtomicBool>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            peers,
            node_id,
            killed,
            network_ready,
        }
    }

    /// Send `vote` to every peer.
    ///
    /// Returns without sending if the node is killed, and blocks (polling)
    /// until the cohort is ready otherwise.
    pub async fn broadcast(&self, vote: PhaseVote) {
        if self.killed.load(Ordering::SeqCst) {
            return;
        }

        while !self.network_ready.load(Ordering::SeqCst) {
            if self.killed.load(Ordering::SeqCst) {
                return;
            }
            trace!(node = %self.node_id, "Holding broadcast until the cohort is ready");
            tokio::time::sleep(READINESS_POLL_INTERVAL).await;
        }

        metrics().votes_broadcast.inc();
        debug!(
            node = %self.node_id,
            phase = %vote.phase,
            round = vote.round,
            value = %vote.value,
            peers = self.peers.len(),
            "Broadcasting vote"
        );

        for peer in &self.peers {
            let client = self.client.clone();
            let url = format!("{}/message", peer.base_url);
            let peer_id = peer.node_id;

            // Fire-and-forget: delivery order across peers is not
            // guaranteed and failures are dropped.
            tokio::spawn(async move {
                match client.post(&url).json(&vote).send().await {
                    Ok(response) if !response.status().is_success() => {
                        metrics().delivery_failures.inc();
                        trace!(peer = %peer_id, status = %response.status(), "Peer rejected vote");
                    }
                    Ok(_) => {}
                    Err(error) => {
                        metrics().delivery_failures.inc();
                        trace!(peer = %peer_id, %error, "Vote delivery failed");
                    }
                }
            });
        }
    }
}

/// Polls every peer's `/ready` route until the whole cohort is listening,
/// then latches the shared readiness flag.
///
/// The flag is monotonic: once the cohort has been seen ready it stays
/// ready for the lifetime of the node.
pub struct ReadinessProbe {
    client: reqwest::Client,
    peers: Vec<PeerEndpoint>,
    node_id: NodeId,
    killed: Arc<AtomicBool>,
    network_ready: Arc<AtomicBool>,
}

impl ReadinessProbe {
    pub fn new(
        node_id: NodeId,
        peers: Vec<PeerEndpoint>,
        killed: Arc<AtomicBool>,
        network_ready: Arc<AtomicBool>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            peers,
            node_id,
            killed,
            network_ready,
        }
    }

    /// Spawn the polling task. It exits once the flag is latched or the
    /// node is killed.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if self.killed.load(Ordering::SeqCst) {
                    return;
                }

                if self.all_peers_ready().await {
                    self.network_ready.store(true, Ordering::SeqCst);
                    info!(node = %self.node_id, "Cohort is ready");
                    return;
                }

                tokio::time::sleep(READINESS_POLL_INTERVAL).await;
            }
        })
    }

    async fn all_peers_ready(&self) -> bool {
        for peer in &self.peers {
            let url = format!("{}/ready", peer.base_url);
            match self.client.get(&url).send().await {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    trace!(peer = %peer.node_id, status = %response.status(), "Peer not ready");
                    return false;
                }
                Err(error) => {
                    trace!(peer = %peer.node_id, %error, "Peer unreachable");
                    return false;
                }
            }
        }
        true
    }
}
