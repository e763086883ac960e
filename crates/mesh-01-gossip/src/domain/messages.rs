//! Gossip RPCs

use super::update::{MembershipUpdate, Rumor};
use serde::{Deserialize, Serialize};
use shared_types::NodeId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum GossipRequest {
    Ping {
        from: NodeId,
    },
    /// Ask the receiver to probe `target` on the sender's behalf.
    PingReq {
        target: NodeId,
        from: NodeId,
    },
    Gossip {
        updates: Vec<MembershipUpdate>,
        #[serde(default)]
        rumors: Vec<Rumor>,
    },
}

impl GossipRequest {
    pub fn method(&self) -> &'static str {
        match self {
            GossipRequest::Ping { .. } => "Ping",
            GossipRequest::PingReq { .. } => "PingReq",
            GossipRequest::Gossip { .. } => "Gossip",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "result")]
pub enum GossipResponse {
    Pong { from: NodeId },
    PingReqAck { alive: bool },
    Ack,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(GossipRequest::PingReq {
            target: NodeId::from("t"),
            from: NodeId::from("f"),
        })
        .unwrap();
        assert_eq!(json["method"], "PingReq");
        assert_eq!(json["params"]["target"], "t");

        let json = serde_json::to_value(GossipResponse::PingReqAck { alive: true }).unwrap();
        assert_eq!(json["result"]["alive"], true);
    }

    #[test]
    fn test_gossip_without_rumors_parses() {
        let raw = r#"{"method":"Gossip","params":{"updates":[{"kind":"dead","peer_id":"x","incarnation":2}]}}"#;
        let request: GossipRequest = serde_json::from_str(raw).unwrap();
        let GossipRequest::Gossip { updates, rumors } = request else {
            panic!("expected Gossip");
        };
        assert_eq!(updates, vec![MembershipUpdate::dead(NodeId::from("x"), 2)]);
        assert!(rumors.is_empty());
    }
}
