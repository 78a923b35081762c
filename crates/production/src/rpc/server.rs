//! Control-surface server implementation.

use super::handlers::RpcState;
use super::routes::create_router;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Errors from the control-surface server.
#[derive(Debug, Error)]
pub enum RpcServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
}

/// Configuration for the control-surface server.
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    /// Address to listen on. Port 0 binds an ephemeral port (used by
    /// tests); the bound address is available on the handle.
    pub listen_addr: SocketAddr,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }
}

/// Handle for controlling a running control-surface server.
pub struct RpcServerHandle {
    task: JoinHandle<()>,
    ready_flag: Arc<AtomicBool>,
    local_addr: SocketAddr,
}

impl RpcServerHandle {
    /// The address the listener actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the node has announced itself ready.
    pub fn is_ready(&self) -> bool {
        self.ready_flag.load(Ordering::SeqCst)
    }

    /// Abort the server.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the server to finish.
    pub async fn join(self) -> Result<(), tokio::task::JoinError> {
        self.task.await
    }
}

/// Control-surface server for a node.
pub struct RpcServer {
    config: RpcServerConfig,
    state: RpcState,
}

impl RpcServer {
    /// Create a new server over pre-built shared state.
    ///
    /// The state is shared with the runner (snapshot, killed flag) and
    /// with the readiness machinery, so it is always constructed outside.
    pub fn new(config: RpcServerConfig, state: RpcState) -> Self {
        Self { config, state }
    }

    /// Bind the listener, announce readiness, and serve in a background
    /// task.
    ///
    /// Readiness is flipped only after the listener is bound: peers
    /// probing `/ready` see 200 exactly when the node can accept votes.
    pub async fn start(self) -> Result<RpcServerHandle, RpcServerError> {
        let ready_flag = self.state.ready.clone();
        let node = self.state.params.node_id;
        let router = create_router(self.state);

        let listener = tokio::net::TcpListener::bind(self.config.listen_addr).await?;
        let local_addr = listener.local_addr()?;
        ready_flag.store(true, Ordering::SeqCst);
        info!(%node, addr = %local_addr, "Control surface listening");

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = ?e, "Control surface server error");
            }
        });

        Ok(RpcServerHandle {
            task,
            ready_flag,
            local_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benor_core::Event;
    use benor_types::{NodeId, NodeSnapshot, ProtocolParams, Value};
    use tokio::sync::{mpsc, RwLock};

    fn test_state() -> (RpcState, mpsc::Receiver<Event>) {
        let (event_tx, event_rx) = mpsc::channel(16);
        let state = RpcState {
            ready: Arc::new(AtomicBool::new(false)),
            killed: Arc::new(AtomicBool::new(false)),
            params: ProtocolParams::new(3, 0, NodeId(0), Value::Zero, false),
            event_tx,
            snapshot: Arc::new(RwLock::new(NodeSnapshot {
                killed: false,
                x: Some(Value::Zero),
                decided: Some(false),
                k: Some(1),
            })),
        };
        (state, event_rx)
    }

    #[tokio::test]
    async fn start_binds_an_ephemeral_port_and_flips_ready() {
        let (state, _rx) = test_state();
        let server = RpcServer::new(
            RpcServerConfig {
                listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            },
            state,
        );

        let handle = server.start().await.expect("bind");
        assert_ne!(handle.local_addr().port(), 0);
        assert!(handle.is_ready());
        handle.abort();
    }
}
