//! Route configuration for the control surface.

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};

/// Create the full router with all control-surface routes.
pub fn create_router(state: RpcState) -> Router {
    Router::new()
        // Protocol surface
        .route("/status", get(status_handler))
        .route("/message", post(message_handler))
        .route("/start", get(start_handler))
        .route("/stop", get(stop_handler))
        .route("/getState", get(get_state_handler))
        // Launch barrier probe
        .route("/ready", get(ready_handler))
        // Prometheus scraping
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use benor_core::Event;
    use benor_types::{NodeId, NodeSnapshot, ProtocolParams, Value};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tokio::sync::{mpsc, RwLock};
    use tower::ServiceExt;

    fn create_test_state() -> RpcState {
        let (event_tx, _rx) = mpsc::channel::<Event>(100);
        // Keep the receiver alive for the lifetime of the state.
        std::mem::forget(_rx);
        RpcState {
            ready: Arc::new(AtomicBool::new(true)),
            killed: Arc::new(AtomicBool::new(false)),
            params: ProtocolParams::new(3, 0, NodeId(0), Value::One, false),
            event_tx,
            snapshot: Arc::new(RwLock::new(NodeSnapshot {
                killed: false,
                x: Some(Value::One),
                decided: Some(false),
                k: Some(1),
            })),
        }
    }

    async fn get_status(app: Router, uri: &str) -> axum::http::StatusCode {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn router_serves_the_protocol_surface() {
        let app = create_router(create_test_state());

        assert_eq!(
            get_status(app.clone(), "/status").await,
            axum::http::StatusCode::OK
        );
        assert_eq!(
            get_status(app.clone(), "/start").await,
            axum::http::StatusCode::OK
        );
        assert_eq!(
            get_status(app.clone(), "/getState").await,
            axum::http::StatusCode::OK
        );
        assert_eq!(
            get_status(app.clone(), "/ready").await,
            axum::http::StatusCode::OK
        );
        assert_eq!(
            get_status(app, "/metrics").await,
            axum::http::StatusCode::OK
        );
    }

    #[tokio::test]
    async fn message_route_accepts_post() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/message")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"type":"P","round":2,"val":"?","sender":1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
