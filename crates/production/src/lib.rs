//! HTTP node runtime for the binary agreement protocol.
//!
//! This crate hosts everything a live node needs around the synchronous
//! agreement state machine:
//!
//! - [`rpc`]: the axum control surface (`/status`, `/message`, `/start`,
//!   `/stop`, `/getState`, plus `/ready` and `/metrics`)
//! - [`network`]: the HTTP broadcaster that fans votes out to peers and the
//!   readiness probe that gates the first broadcast
//! - [`runner`]: the event loop that drives the state machine and executes
//!   its actions
//! - [`timers`]: tokio-backed timers feeding the runner's timer channel
//! - [`metrics`]: Prometheus instrumentation

pub mod metrics;
pub mod network;
pub mod rpc;
pub mod runner;
pub mod timers;

pub use network::{HttpBroadcaster, PeerEndpoint, ReadinessProbe};
pub use rpc::{RpcServer, RpcServerConfig, RpcServerHandle, RpcState};
pub use runner::{NodeRunner, RunnerError, ShutdownHandle};
pub use timers::TimerManager;
