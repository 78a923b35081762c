//! Node metrics using the native Prometheus client.
//!
//! Metrics are domain-specific rather than generic event counters. Use
//! traces for event-level granularity during investigations.

use prometheus::{register_counter, register_gauge, Counter, Gauge};
use std::sync::OnceLock;

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Domain-specific metrics for a running node.
pub struct Metrics {
    // === Agreement ===
    /// Current round number.
    pub round: Gauge,
    /// 1 once a terminal value has been latched.
    pub decided: Gauge,

    // === Network ===
    /// Phase votes accepted by the ingress route.
    pub votes_received: Counter,
    /// Broadcasts handed to the fan-out (one per outbound vote, not per peer).
    pub votes_broadcast: Counter,
    /// Per-peer deliveries that failed (refused, timeout, non-2xx).
    pub delivery_failures: Counter,

    // === Ingress errors ===
    /// Payloads rejected as malformed.
    pub invalid_messages: Counter,
}

impl Metrics {
    fn new() -> Self {
        Self {
            round: register_gauge!("benor_round", "Current agreement round")
                .expect("metric registration"),
            decided: register_gauge!("benor_decided", "1 once a decision has been latched")
                .expect("metric registration"),
            votes_received: register_counter!(
                "benor_votes_received_total",
                "Phase votes accepted by the ingress route"
            )
            .expect("metric registration"),
            votes_broadcast: register_counter!(
                "benor_votes_broadcast_total",
                "Outbound votes handed to the broadcaster"
            )
            .expect("metric registration"),
            delivery_failures: register_counter!(
                "benor_delivery_failures_total",
                "Per-peer deliveries that failed"
            )
            .expect("metric registration"),
            invalid_messages: register_counter!(
                "benor_invalid_messages_total",
                "Ingress payloads rejected as malformed"
            )
            .expect("metric registration"),
        }
    }
}

/// Global metrics handle.
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_register_once() {
        let m1 = metrics();
        let m2 = metrics();
        m1.votes_received.inc();
        assert!(m2.votes_received.get() >= 1.0);
    }
}
