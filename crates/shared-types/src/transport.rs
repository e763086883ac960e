//! # RPC Transport Ports
//!
//! The mesh treats the network as an authenticated, byte-reliable channel.
//! Outbound calls go through [`RpcTransport`]; inbound calls are dispatched to
//! an [`RpcHandler`] registered with the transport.
//!
//! Callers always bound a call with their own timeout. A timeout or transport
//! error is a negative answer, never a crash.

use crate::entities::NodeId;
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("peer {0} unreachable")]
    Unreachable(NodeId),

    #[error("request to {0} timed out")]
    Timeout(NodeId),

    #[error("peer {0} sent no reply")]
    NoReply(NodeId),

    #[error("rejected by {peer}: {reason}")]
    Rejected { peer: NodeId, reason: String },

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Outbound request/response channel bound to the local node.
#[async_trait]
pub trait RpcTransport<Req, Resp>: Send + Sync
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn send(&self, to: &NodeId, request: Req) -> Result<Resp, TransportError>;
}

/// Inbound dispatch target.
///
/// `None` means the handler chose not to reply (for example after a fatal
/// local failure). The caller observes it as [`TransportError::NoReply`].
#[async_trait]
pub trait RpcHandler<Req, Resp>: Send + Sync
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn handle(&self, from: &NodeId, request: Req) -> Option<Resp>;
}
