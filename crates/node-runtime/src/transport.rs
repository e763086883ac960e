//! # Mesh Transport
//!
//! Consensus and gossip each speak their own RPC enum. [`MeshTransport`]
//! wraps a single [`RpcTransport`] for [`MeshRequest`]s and exposes it as one
//! typed transport per subsystem, so both services share the same channel.
//!
//! A `Rejected` answer from the peer's admission gate surfaces as
//! [`TransportError::Rejected`]; a response of the wrong kind is a protocol
//! error.

use crate::wire::{GovernanceRequest, GovernanceResponse, MeshRequest, MeshResponse};
use async_trait::async_trait;
use mesh_01_gossip::{GossipRequest, GossipResponse};
use mesh_02_consensus::{RaftRequest, RaftResponse};
use shared_types::{NodeId, RpcTransport, TransportError};
use std::sync::Arc;
use tracing::trace;

pub struct MeshTransport<T> {
    inner: Arc<T>,
}

impl<T> MeshTransport<T>
where
    T: RpcTransport<MeshRequest, MeshResponse> + 'static,
{
    pub fn new(inner: Arc<T>) -> Self {
        Self { inner }
    }

    async fn call(&self, to: &NodeId, request: MeshRequest) -> Result<MeshResponse, TransportError> {
        let method = request.method();
        match self.inner.send(to, request).await? {
            MeshResponse::Governance(GovernanceResponse::Rejected { reason }) => {
                trace!(peer = %to, method, reason = %reason, "Request rejected by peer");
                Err(TransportError::Rejected {
                    peer: to.clone(),
                    reason,
                })
            }
            response => Ok(response),
        }
    }
}

fn mismatch(expected: &str, got: &MeshResponse) -> TransportError {
    TransportError::Protocol(format!(
        "expected {expected} response, got {}",
        got.kind()
    ))
}

#[async_trait]
impl<T> RpcTransport<RaftRequest, RaftResponse> for MeshTransport<T>
where
    T: RpcTransport<MeshRequest, MeshResponse> + 'static,
{
    async fn send(&self, to: &NodeId, request: RaftRequest) -> Result<RaftResponse, TransportError> {
        match self.call(to, MeshRequest::Raft(request)).await? {
            MeshResponse::Raft(response) => Ok(response),
            other => Err(mismatch("raft", &other)),
        }
    }
}

#[async_trait]
impl<T> RpcTransport<GossipRequest, GossipResponse> for MeshTransport<T>
where
    T: RpcTransport<MeshRequest, MeshResponse> + 'static,
{
    async fn send(
        &self,
        to: &NodeId,
        request: GossipRequest,
    ) -> Result<GossipResponse, TransportError> {
        match self.call(to, MeshRequest::Gossip(request)).await? {
            MeshResponse::Gossip(response) => Ok(response),
            other => Err(mismatch("gossip", &other)),
        }
    }
}

#[async_trait]
impl<T> RpcTransport<GovernanceRequest, GovernanceResponse> for MeshTransport<T>
where
    T: RpcTransport<MeshRequest, MeshResponse> + 'static,
{
    async fn send(
        &self,
        to: &NodeId,
        request: GovernanceRequest,
    ) -> Result<GovernanceResponse, TransportError> {
        match self.call(to, MeshRequest::Governance(request)).await? {
            MeshResponse::Governance(response) => Ok(response),
            other => Err(mismatch("governance", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::InMemoryRouter;
    use shared_types::RpcHandler;

    /// Answers every request with a fixed response.
    struct Fixed(MeshResponse);

    #[async_trait]
    impl RpcHandler<MeshRequest, MeshResponse> for Fixed {
        async fn handle(&self, _from: &NodeId, _request: MeshRequest) -> Option<MeshResponse> {
            Some(self.0.clone())
        }
    }

    fn transport(
        answer: MeshResponse,
    ) -> MeshTransport<shared_bus::RouterEndpoint<MeshRequest, MeshResponse>> {
        let router = InMemoryRouter::new();
        router.register(NodeId::from("b"), Arc::new(Fixed(answer)));
        MeshTransport::new(Arc::new(router.endpoint(NodeId::from("a"))))
    }

    #[tokio::test]
    async fn test_unwraps_matching_response() {
        let t = transport(MeshResponse::Gossip(GossipResponse::Pong {
            from: NodeId::from("b"),
        }));
        let response = RpcTransport::<GossipRequest, GossipResponse>::send(
            &t,
            &NodeId::from("b"),
            GossipRequest::Ping {
                from: NodeId::from("a"),
            },
        )
        .await
        .unwrap();
        assert_eq!(
            response,
            GossipResponse::Pong {
                from: NodeId::from("b")
            }
        );
    }

    #[tokio::test]
    async fn test_wrong_kind_is_protocol_error() {
        let t = transport(MeshResponse::Gossip(GossipResponse::Ack));
        let err = RpcTransport::<GovernanceRequest, GovernanceResponse>::send(
            &t,
            &NodeId::from("b"),
            GovernanceRequest::BanProof(mesh_05_trust::BanProof::draft(
                NodeId::from("x"),
                mesh_05_trust::BanReason::Spam,
                shared_types::ContentHash([1; 32]),
                NodeId::from("a"),
                mesh_05_trust::TrustLevel::Admin,
                0,
                shared_types::Timestamp::from_secs(1),
                None,
                mesh_05_trust::DEFAULT_FEDERATION_ID,
            )
            .unwrap()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TransportError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_gate_rejection_surfaces_as_error() {
        let t = transport(MeshResponse::rejected("peer a is banned"));
        let err = RpcTransport::<GossipRequest, GossipResponse>::send(
            &t,
            &NodeId::from("b"),
            GossipRequest::Ping {
                from: NodeId::from("a"),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(
            err,
            TransportError::Rejected {
                peer: NodeId::from("b"),
                reason: "peer a is banned".into()
            }
        );

        let unreachable = RpcTransport::<GossipRequest, GossipResponse>::send(
            &t,
            &NodeId::from("nobody"),
            GossipRequest::Ping {
                from: NodeId::from("a"),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(unreachable, TransportError::Unreachable(_)));
    }
}
