//! Consensus engine configuration.

use std::time::Duration;

/// Tunable timing parameters for the agreement engine.
#[derive(Debug, Clone, Copy)]
pub struct ConsensusConfig {
    /// Upper bound on how long a phase waits for its participation quorum
    /// before closing with a partial tally.
    pub phase_timeout: Duration,

    /// Cooperative delay between rounds, giving ingress a chance to drain.
    pub round_delay: Duration,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            phase_timeout: Duration::from_millis(30),
            round_delay: Duration::from_millis(50),
        }
    }
}
