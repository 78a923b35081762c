//! HTTP control surface for a node.

mod handlers;
mod routes;
mod server;

pub use handlers::RpcState;
pub use routes::create_router;
pub use server::{RpcServer, RpcServerConfig, RpcServerError, RpcServerHandle};
