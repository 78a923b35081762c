//! The per-phase vote payload exchanged between nodes.

use benor_types::{NodeId, Phase, Value};
use serde::{Deserialize, Serialize};

/// A single phase vote, as POSTed to a peer's `/message` route.
///
/// Wire shape:
///
/// ```json
/// { "type": "R", "round": 3, "val": 1, "sender": 0 }
/// ```
///
/// `val` is `0`, `1`, or the string `"?"`. Deserialization rejects any
/// payload with a missing or out-of-domain field; the control surface
/// answers such payloads with `400 Invalid message format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseVote {
    /// Which of the two broadcasts of the round this vote belongs to.
    #[serde(rename = "type")]
    pub phase: Phase,
    /// Round number, starting at 1.
    pub round: u64,
    /// The value being reported or proposed.
    #[serde(rename = "val")]
    pub value: Value,
    /// Index of the sending node.
    pub sender: NodeId,
}

impl PhaseVote {
    pub fn new(phase: Phase, round: u64, value: Value, sender: NodeId) -> Self {
        Self {
            phase,
            round,
            value,
            sender,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_is_exact() {
        let vote = PhaseVote::new(Phase::Report, 1, Value::Zero, NodeId(2));
        assert_eq!(
            serde_json::to_string(&vote).unwrap(),
            r#"{"type":"R","round":1,"val":0,"sender":2}"#
        );

        let vote = PhaseVote::new(Phase::Propose, 4, Value::Undecided, NodeId(0));
        assert_eq!(
            serde_json::to_string(&vote).unwrap(),
            r#"{"type":"P","round":4,"val":"?","sender":0}"#
        );
    }

    #[test]
    fn parses_valid_payloads() {
        let vote: PhaseVote =
            serde_json::from_str(r#"{"type":"P","round":7,"val":"?","sender":3}"#).unwrap();
        assert_eq!(vote.phase, Phase::Propose);
        assert_eq!(vote.round, 7);
        assert_eq!(vote.value, Value::Undecided);
        assert_eq!(vote.sender, NodeId(3));
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(serde_json::from_str::<PhaseVote>(r#"{"round":1,"val":0,"sender":0}"#).is_err());
        assert!(serde_json::from_str::<PhaseVote>(r#"{"type":"R","val":0,"sender":0}"#).is_err());
        assert!(serde_json::from_str::<PhaseVote>(r#"{"type":"R","round":1,"sender":0}"#).is_err());
    }

    #[test]
    fn rejects_out_of_domain_fields() {
        assert!(
            serde_json::from_str::<PhaseVote>(r#"{"type":"X","round":1,"val":0,"sender":0}"#)
                .is_err()
        );
        assert!(
            serde_json::from_str::<PhaseVote>(r#"{"type":"R","round":1,"val":2,"sender":0}"#)
                .is_err()
        );
        assert!(
            serde_json::from_str::<PhaseVote>(r#"{"type":"R","round":-1,"val":1,"sender":0}"#)
                .is_err()
        );
    }
}
