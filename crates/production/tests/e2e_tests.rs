//! End-to-end tests over real HTTP.
//!
//! Each test spins up a full cohort on ephemeral localhost ports: control
//! surface, readiness probe, broadcaster, and runner per node, exactly as
//! the binary wires them. The tests then drive the cohort through the
//! public routes only.

use benor_consensus::{ConsensusConfig, ConsensusState};
use benor_production::rpc::{RpcServer, RpcServerConfig, RpcState};
use benor_production::{
    HttpBroadcaster, NodeRunner, PeerEndpoint, ReadinessProbe, RpcServerHandle, RunnerError,
    ShutdownHandle, TimerManager,
};
use benor_types::{NodeId, NodeSnapshot, ProtocolParams, Value};
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

struct TestNode {
    url: String,
    server: RpcServerHandle,
    shutdown: Option<ShutdownHandle>,
    runner: JoinHandle<Result<(), RunnerError>>,
}

impl TestNode {
    async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.shutdown();
        }
        let _ = self.runner.await;
        self.server.abort();
    }
}

/// Build and launch a cohort of `initial.len()` nodes on ephemeral ports.
async fn spawn_cohort(max_faulty: u32, initial: &[Value], faulty: &[usize]) -> Vec<TestNode> {
    let n = initial.len() as u32;

    struct Parts {
        state: ConsensusState,
        snapshot: Arc<RwLock<NodeSnapshot>>,
        killed: Arc<AtomicBool>,
        event_rx: mpsc::Receiver<benor_core::Event>,
        timer_rx: mpsc::Receiver<benor_core::Event>,
        timers: TimerManager,
        server: RpcServerHandle,
        url: String,
    }

    // First pass: bind every control surface so peer URLs are known.
    let mut parts = Vec::new();
    for (i, &value) in initial.iter().enumerate() {
        let params = ProtocolParams::new(
            n,
            max_faulty,
            NodeId(i as u32),
            value,
            faulty.contains(&i),
        );
        let state = ConsensusState::new(params, ConsensusConfig::default());
        let snapshot = Arc::new(RwLock::new(state.snapshot()));
        let killed = Arc::new(AtomicBool::new(false));

        let (event_tx, event_rx) = mpsc::channel(1024);
        let (timer_tx, timer_rx) = mpsc::channel(64);
        let timers = TimerManager::new(timer_tx);

        let rpc_state = RpcState {
            ready: Arc::new(AtomicBool::new(false)),
            killed: killed.clone(),
            params,
            event_tx,
            snapshot: snapshot.clone(),
        };
        let server = RpcServer::new(
            RpcServerConfig {
                listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            },
            rpc_state,
        )
        .start()
        .await
        .expect("bind test node");

        let url = format!("http://{}", server.local_addr());
        parts.push(Parts {
            state,
            snapshot,
            killed,
            event_rx,
            timer_rx,
            timers,
            server,
            url,
        });
    }

    let urls: Vec<String> = parts.iter().map(|p| p.url.clone()).collect();

    // Second pass: wire broadcasters and runners now that URLs exist.
    let mut nodes = Vec::new();
    for (i, part) in parts.into_iter().enumerate() {
        let peers: Vec<PeerEndpoint> = urls
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(j, url)| PeerEndpoint::new(NodeId(j as u32), url.clone()))
            .collect();

        let network_ready = Arc::new(AtomicBool::new(false));
        let _probe = ReadinessProbe::new(
            NodeId(i as u32),
            peers.clone(),
            part.killed.clone(),
            network_ready.clone(),
        )
        .spawn();

        let broadcaster = Arc::new(HttpBroadcaster::new(
            NodeId(i as u32),
            peers,
            part.killed.clone(),
            network_ready,
        ));

        let (runner, shutdown) = NodeRunner::new(
            part.state,
            part.event_rx,
            part.timer_rx,
            part.timers,
            broadcaster,
            part.snapshot,
            part.killed,
        );

        nodes.push(TestNode {
            url: part.url,
            server: part.server,
            shutdown: Some(shutdown),
            runner: tokio::spawn(runner.run()),
        });
    }

    nodes
}

async fn get_state(client: &reqwest::Client, url: &str) -> NodeSnapshot {
    client
        .get(format!("{url}/getState"))
        .send()
        .await
        .expect("getState request")
        .json()
        .await
        .expect("getState body")
}

async fn start_all(client: &reqwest::Client, nodes: &[TestNode]) {
    for node in nodes {
        let response = client
            .get(format!("{}/start", node.url))
            .send()
            .await
            .expect("start request");
        assert_eq!(response.status(), 200);
    }
}

/// Poll until every listed node reports a latched decision.
async fn wait_for_decisions(
    client: &reqwest::Client,
    nodes: &[TestNode],
    indices: &[usize],
    deadline: Duration,
) -> Vec<NodeSnapshot> {
    let started = tokio::time::Instant::now();
    loop {
        let mut snapshots = Vec::new();
        for &i in indices {
            snapshots.push(get_state(client, &nodes[i].url).await);
        }
        if snapshots.iter().all(|s| s.decided == Some(true)) {
            return snapshots;
        }
        assert!(
            started.elapsed() < deadline,
            "cohort failed to decide within {deadline:?}: {snapshots:?}"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unanimous_cohort_agrees_over_http() {
    let nodes = spawn_cohort(0, &[Value::Zero, Value::Zero, Value::Zero], &[]).await;
    let client = reqwest::Client::new();

    start_all(&client, &nodes).await;
    let snapshots =
        wait_for_decisions(&client, &nodes, &[0, 1, 2], Duration::from_secs(10)).await;

    for snapshot in &snapshots {
        assert_eq!(snapshot.x, Some(Value::Zero));
        assert!(!snapshot.killed);
    }

    for node in nodes {
        node.stop().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn faulty_node_exposes_the_contract() {
    let nodes = spawn_cohort(1, &[Value::One, Value::One, Value::One], &[2]).await;
    let client = reqwest::Client::new();

    // The faulty node answers 500 on /status and refuses to start.
    let response = client
        .get(format!("{}/status", nodes[2].url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await.unwrap(), "faulty");

    let response = client
        .get(format!("{}/start", nodes[2].url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);

    let snapshot = get_state(&client, &nodes[2].url).await;
    assert_eq!(snapshot.x, None);
    assert_eq!(snapshot.decided, None);
    assert_eq!(snapshot.k, None);

    // The live peers answer 200 and still reach agreement.
    for i in [0, 1] {
        let response = client
            .get(format!("{}/status", nodes[i].url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "live");
    }

    start_all(&client, &nodes[..2]).await;
    let snapshots = wait_for_decisions(&client, &nodes, &[0, 1], Duration::from_secs(10)).await;
    for snapshot in &snapshots {
        assert_eq!(snapshot.x, Some(Value::One));
    }

    for node in nodes {
        node.stop().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stop_freezes_the_node() {
    let nodes = spawn_cohort(0, &[Value::One, Value::One, Value::One], &[]).await;
    let client = reqwest::Client::new();

    // Start only node 0, let it spin briefly, then stop it.
    let response = client
        .get(format!("{}/start", nodes[0].url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let response = client
        .get(format!("{}/stop", nodes[0].url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Consensus stopped");

    // Give the runner a beat to drain any timer that was already in
    // flight when the stop landed.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let frozen = get_state(&client, &nodes[0].url).await;
    assert!(frozen.killed);

    // No further mutation after the stop settles.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let later = get_state(&client, &nodes[0].url).await;
    assert_eq!(later, frozen);

    // A stopped node cannot be restarted.
    let response = client
        .get(format!("{}/start", nodes[0].url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);

    for node in nodes {
        node.stop().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn malformed_votes_are_rejected_over_http() {
    let nodes = spawn_cohort(0, &[Value::Zero, Value::Zero, Value::Zero], &[]).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/message", nodes[0].url))
        .header("content-type", "application/json")
        .body(r#"{"type":"Q","round":1,"val":0,"sender":1}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "Invalid message format");

    let response = client
        .post(format!("{}/message", nodes[0].url))
        .header("content-type", "application/json")
        .body(r#"{"type":"R","round":1,"val":1,"sender":1}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Message received");

    for node in nodes {
        node.stop().await;
    }
}
