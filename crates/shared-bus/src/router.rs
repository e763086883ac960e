//! # In-Memory RPC Router
//!
//! A pluggable transport for deterministic multi-node tests. Every node
//! registers an inbound [`RpcHandler`] and sends through its own
//! [`RouterEndpoint`], which implements the same [`RpcTransport`] port a
//! socket transport would.
//!
//! Partitions are modelled two ways:
//! - `isolate(node)` cuts a node off from everyone until `rejoin(node)`,
//! - `sever(a, b)` cuts a single bidirectional link until `restore(a, b)`.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{NodeId, RpcHandler, RpcTransport, TransportError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

type Handler<Req, Resp> = Arc<dyn RpcHandler<Req, Resp>>;

struct RouterState<Req, Resp> {
    handlers: RwLock<HashMap<NodeId, Handler<Req, Resp>>>,
    isolated: RwLock<HashSet<NodeId>>,
    severed: RwLock<HashSet<(NodeId, NodeId)>>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

/// Delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub delivered: u64,
    pub dropped: u64,
}

/// Shared switchboard connecting every registered node.
pub struct InMemoryRouter<Req, Resp> {
    state: Arc<RouterState<Req, Resp>>,
}

impl<Req, Resp> Clone for InMemoryRouter<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<Req, Resp> Default for InMemoryRouter<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Resp> InMemoryRouter<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            state: Arc::new(RouterState {
                handlers: RwLock::new(HashMap::new()),
                isolated: RwLock::new(HashSet::new()),
                severed: RwLock::new(HashSet::new()),
                delivered: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Register (or replace) the inbound handler for `node`.
    pub fn register(&self, node: NodeId, handler: Handler<Req, Resp>) {
        self.state.handlers.write().insert(node, handler);
    }

    pub fn unregister(&self, node: &NodeId) {
        self.state.handlers.write().remove(node);
    }

    /// Outbound transport bound to `local`.
    pub fn endpoint(&self, local: NodeId) -> RouterEndpoint<Req, Resp> {
        RouterEndpoint {
            local,
            router: self.clone(),
        }
    }

    pub fn isolate(&self, node: &NodeId) {
        self.state.isolated.write().insert(node.clone());
    }

    pub fn rejoin(&self, node: &NodeId) {
        self.state.isolated.write().remove(node);
    }

    pub fn sever(&self, a: &NodeId, b: &NodeId) {
        let mut severed = self.state.severed.write();
        severed.insert((a.clone(), b.clone()));
        severed.insert((b.clone(), a.clone()));
    }

    pub fn restore(&self, a: &NodeId, b: &NodeId) {
        let mut severed = self.state.severed.write();
        severed.remove(&(a.clone(), b.clone()));
        severed.remove(&(b.clone(), a.clone()));
    }

    /// Remove every partition.
    pub fn heal_all(&self) {
        self.state.isolated.write().clear();
        self.state.severed.write().clear();
    }

    pub fn is_reachable(&self, from: &NodeId, to: &NodeId) -> bool {
        {
            let isolated = self.state.isolated.read();
            if isolated.contains(from) || isolated.contains(to) {
                return false;
            }
        }
        !self
            .state
            .severed
            .read()
            .contains(&(from.clone(), to.clone()))
    }

    pub fn stats(&self) -> RouterStats {
        RouterStats {
            delivered: self.state.delivered.load(Ordering::Relaxed),
            dropped: self.state.dropped.load(Ordering::Relaxed),
        }
    }

    async fn deliver(&self, from: &NodeId, to: &NodeId, request: Req) -> Result<Resp, TransportError> {
        if !self.is_reachable(from, to) {
            self.state.dropped.fetch_add(1, Ordering::Relaxed);
            trace!(from = %from, to = %to, "Dropped by partition");
            return Err(TransportError::Unreachable(to.clone()));
        }

        // Clone the handler out so no router lock is held across the await.
        let handler = self.state.handlers.read().get(to).cloned();
        let Some(handler) = handler else {
            self.state.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(TransportError::Unreachable(to.clone()));
        };

        let response = handler.handle(from, request).await;
        self.state.delivered.fetch_add(1, Ordering::Relaxed);
        response.ok_or_else(|| TransportError::NoReply(to.clone()))
    }
}

/// One node's view of the router.
pub struct RouterEndpoint<Req, Resp> {
    local: NodeId,
    router: InMemoryRouter<Req, Resp>,
}

impl<Req, Resp> RouterEndpoint<Req, Resp> {
    pub fn local_id(&self) -> &NodeId {
        &self.local
    }
}

#[async_trait]
impl<Req, Resp> RpcTransport<Req, Resp> for RouterEndpoint<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn send(&self, to: &NodeId, request: Req) -> Result<Resp, TransportError> {
        self.router.deliver(&self.local, to, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo {
        id: NodeId,
    }

    #[async_trait]
    impl RpcHandler<String, String> for Echo {
        async fn handle(&self, from: &NodeId, request: String) -> Option<String> {
            if request == "silent" {
                return None;
            }
            Some(format!("{} -> {}: {}", from, self.id, request))
        }
    }

    fn router_with(ids: &[&str]) -> InMemoryRouter<String, String> {
        let router = InMemoryRouter::new();
        for id in ids {
            let node = NodeId::from(*id);
            router.register(node.clone(), Arc::new(Echo { id: node }));
        }
        router
    }

    #[tokio::test]
    async fn test_delivers_to_registered_handler() {
        let router = router_with(&["a", "b"]);
        let a = router.endpoint(NodeId::from("a"));

        let reply = a.send(&NodeId::from("b"), "hi".to_string()).await.unwrap();
        assert_eq!(reply, "a -> b: hi");
        assert_eq!(router.stats().delivered, 1);
    }

    #[tokio::test]
    async fn test_unknown_peer_is_unreachable() {
        let router = router_with(&["a"]);
        let a = router.endpoint(NodeId::from("a"));

        let err = a.send(&NodeId::from("zz"), "hi".into()).await.unwrap_err();
        assert_eq!(err, TransportError::Unreachable(NodeId::from("zz")));
    }

    #[tokio::test]
    async fn test_isolate_and_rejoin() {
        let router = router_with(&["a", "b"]);
        let a = router.endpoint(NodeId::from("a"));
        let b_id = NodeId::from("b");

        router.isolate(&b_id);
        assert!(a.send(&b_id, "x".into()).await.is_err());
        assert_eq!(router.stats().dropped, 1);

        router.rejoin(&b_id);
        assert!(a.send(&b_id, "x".into()).await.is_ok());
    }

    #[tokio::test]
    async fn test_sever_is_bidirectional() {
        let router = router_with(&["a", "b", "c"]);
        let (a_id, b_id, c_id) = (NodeId::from("a"), NodeId::from("b"), NodeId::from("c"));

        router.sever(&a_id, &b_id);
        assert!(!router.is_reachable(&a_id, &b_id));
        assert!(!router.is_reachable(&b_id, &a_id));
        assert!(router.is_reachable(&a_id, &c_id));

        router.heal_all();
        assert!(router.is_reachable(&a_id, &b_id));
    }

    #[tokio::test]
    async fn test_handler_without_reply() {
        let router = router_with(&["a", "b"]);
        let a = router.endpoint(NodeId::from("a"));

        let err = a.send(&NodeId::from("b"), "silent".into()).await.unwrap_err();
        assert_eq!(err, TransportError::NoReply(NodeId::from("b")));
    }
}
