//! Binary agreement node.
//!
//! Runs one member of an agreement cohort. Each node listens on
//! `base_port + node_id` and reaches peer `i` at `host:base_port + i`.
//!
//! # Usage
//!
//! ```bash
//! # A 3-node cohort on localhost, all starting from 0:
//! benor-node --node-id 0 --nodes 3 --max-faulty 0 --initial-value 0 &
//! benor-node --node-id 1 --nodes 3 --max-faulty 0 --initial-value 0 &
//! benor-node --node-id 2 --nodes 3 --max-faulty 0 --initial-value 0 &
//!
//! # Kick off agreement:
//! curl http://127.0.0.1:3000/start
//! curl http://127.0.0.1:3001/start
//! curl http://127.0.0.1:3002/start
//!
//! # Watch it settle:
//! curl http://127.0.0.1:3000/getState
//! ```

use anyhow::{bail, Result};
use benor_consensus::{ConsensusConfig, ConsensusState};
use benor_production::rpc::{RpcServer, RpcServerConfig, RpcState};
use benor_production::{HttpBroadcaster, NodeRunner, PeerEndpoint, ReadinessProbe, TimerManager};
use benor_types::{NodeId, ProtocolParams, Value};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{mpsc, RwLock};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Binary agreement node.
///
/// Runs one member of a fixed cohort attempting agreement on a single bit.
#[derive(Parser, Debug)]
#[command(name = "benor-node")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Index of this node within the cohort (0-based)
    #[arg(long)]
    node_id: u32,

    /// Total number of nodes in the cohort (N)
    #[arg(long)]
    nodes: u32,

    /// Declared maximum number of faulty nodes (F)
    #[arg(long, default_value_t = 0)]
    max_faulty: u32,

    /// This node's initial value (0 or 1)
    #[arg(long)]
    initial_value: u8,

    /// Run as a silent faulty node
    #[arg(long, default_value_t = false)]
    faulty: bool,

    /// First port of the cohort; node i listens on base-port + i
    #[arg(long, default_value_t = 3000)]
    base_port: u16,

    /// Host peers are reached at
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Log level filter (overrides RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if cli.nodes < 3 {
        bail!("the cohort needs at least 3 nodes, got {}", cli.nodes);
    }
    if cli.node_id >= cli.nodes {
        bail!(
            "node id {} is out of range for a cohort of {}",
            cli.node_id,
            cli.nodes
        );
    }
    let initial_value = match cli.initial_value {
        0 => Value::Zero,
        1 => Value::One,
        other => bail!("initial value must be 0 or 1, got {other}"),
    };

    let params = ProtocolParams::new(
        cli.nodes,
        cli.max_faulty,
        NodeId(cli.node_id),
        initial_value,
        cli.faulty,
    );

    if params.exceeds_fault_limit() {
        info!(
            max_faulty = params.max_faulty,
            tolerance = params.tolerance_threshold(),
            "Declared fault count exceeds the tolerance threshold; agreement will not settle"
        );
    }

    // Shared flags and the published snapshot.
    let killed = Arc::new(AtomicBool::new(false));
    let network_ready = Arc::new(AtomicBool::new(false));
    let state = ConsensusState::new(params, ConsensusConfig::default());
    let snapshot = Arc::new(RwLock::new(state.snapshot()));

    // Channels: control+ingress, and a dedicated one for timers.
    let (event_tx, event_rx) = mpsc::channel(10_000);
    let (timer_tx, timer_rx) = mpsc::channel(64);

    // Control surface.
    let listen_port = cli.base_port + cli.node_id as u16;
    let rpc_state = RpcState {
        ready: Arc::new(AtomicBool::new(false)),
        killed: killed.clone(),
        params,
        event_tx,
        snapshot: snapshot.clone(),
    };
    let server = RpcServer::new(
        RpcServerConfig {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], listen_port)),
        },
        rpc_state,
    );
    let server_handle = server.start().await?;

    // Peers and the readiness barrier.
    let peers: Vec<PeerEndpoint> = (0..cli.nodes)
        .filter(|&i| i != cli.node_id)
        .map(|i| {
            PeerEndpoint::new(
                NodeId(i),
                format!("http://{}:{}", cli.host, cli.base_port + i as u16),
            )
        })
        .collect();

    let _probe = ReadinessProbe::new(
        NodeId(cli.node_id),
        peers.clone(),
        killed.clone(),
        network_ready.clone(),
    )
    .spawn();

    let broadcaster = Arc::new(HttpBroadcaster::new(
        NodeId(cli.node_id),
        peers,
        killed.clone(),
        network_ready,
    ));

    // Runner.
    let timers = TimerManager::new(timer_tx);
    let (runner, shutdown) = NodeRunner::new(
        state,
        event_rx,
        timer_rx,
        timers,
        broadcaster,
        snapshot,
        killed,
    );
    let runner_task = tokio::spawn(runner.run());

    info!(
        node = cli.node_id,
        nodes = cli.nodes,
        max_faulty = cli.max_faulty,
        faulty = cli.faulty,
        port = listen_port,
        "Node up"
    );

    signal::ctrl_c().await?;
    info!("Interrupted, shutting down");

    shutdown.shutdown();
    runner_task.await??;
    server_handle.abort();
    Ok(())
}
