//! # Cluster Harness
//!
//! Full mesh nodes in one process, wired through a shared
//! [`InMemoryRouter`] and a shared [`ManualTimeSource`]. Every node is a
//! founding federation member with stake, knows every other node's key, and
//! runs with seeded randomness so scenarios replay the same way.

use mesh_02_consensus::ConsensusApi;
use mesh_04_slashing::{BlockHeader, SlashingEvidence};
use mesh_05_trust::TrustConfig;
use node_runtime::{MeshNode, MeshRequest, MeshResponse, NodeConfig, NodeSection, PeerEntry};
use shared_bus::{InMemoryRouter, RouterEndpoint};
use shared_crypto::{Ed25519Identity, Ed25519KeyPair};
use shared_types::{ContentHash, ManualTimeSource, NodeId, Signer, TimeSource, Timestamp};
use std::sync::Arc;
use std::time::Duration;

pub type Router = InMemoryRouter<MeshRequest, MeshResponse>;
pub type Node = MeshNode<RouterEndpoint<MeshRequest, MeshResponse>>;

/// Stake every founding member commits.
pub const STAKE: u64 = 20_000;

/// Wall-clock start of every scenario.
pub const GENESIS_SECS: u64 = 1_000;

pub fn node_id(name: &str) -> NodeId {
    NodeId::from(name)
}

pub struct MeshCluster {
    pub router: Router,
    pub clock: ManualTimeSource,
    nodes: Vec<Arc<Node>>,
    identities: Vec<Ed25519Identity>,
}

impl MeshCluster {
    /// Nodes named `names`; every name in `admins` may issue bans.
    pub fn new(names: &[&str], admins: &[&str]) -> Self {
        let router = Router::new();
        let clock = ManualTimeSource::new(Timestamp::from_secs(GENESIS_SECS));
        let identities: Vec<Ed25519Identity> =
            (0..names.len()).map(|i| Self::identity_for(i, names[i])).collect();

        let nodes = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let config = Self::config_for(i, names, admins, &identities);
                let node = Arc::new(
                    MeshNode::build(
                        &config,
                        Arc::new(Self::identity_for(i, name)),
                        Arc::new(router.endpoint(node_id(name))),
                        Arc::new(clock.clone()),
                    )
                    .expect("cluster node config is valid"),
                );
                router.register(node_id(name), node.clone());
                node
            })
            .collect();

        Self {
            router,
            clock,
            nodes,
            identities,
        }
    }

    fn identity_for(index: usize, name: &str) -> Ed25519Identity {
        Ed25519Identity::new(
            node_id(name),
            Ed25519KeyPair::from_seed([index as u8 + 1; 32]),
        )
    }

    fn config_for(
        index: usize,
        names: &[&str],
        admins: &[&str],
        identities: &[Ed25519Identity],
    ) -> NodeConfig {
        let name = names[index];
        let peers = names
            .iter()
            .zip(identities)
            .filter(|(other, _)| **other != name)
            .map(|(other, key)| PeerEntry {
                public_key: Some(key.public_key()),
                stake: Some(STAKE),
                ..PeerEntry::new(*other, format!("{other}.mesh.io:7000"))
            })
            .collect();

        let mut config = NodeConfig {
            node: NodeSection {
                id: name.to_string(),
                address: format!("{name}.mesh.io:7000"),
                stake: Some(STAKE),
                peers,
                ..NodeSection::default()
            },
            trust: TrustConfig {
                admins: admins.iter().map(|a| node_id(a)).collect(),
                ..TrustConfig::default()
            },
            ..NodeConfig::default()
        };
        config.consensus.rng_seed = Some(100 + index as u64);
        config.gossip.rng_seed = Some(200 + index as u64);
        config
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> &Arc<Node> {
        self.nodes
            .iter()
            .find(|n| n.id().as_str() == name)
            .unwrap_or_else(|| panic!("no node named {name}"))
    }

    pub fn identity(&self, name: &str) -> &Ed25519Identity {
        self.identities
            .iter()
            .find(|k| k.node_id().as_str() == name)
            .unwrap_or_else(|| panic!("no identity for {name}"))
    }

    /// One consensus tick on every node.
    pub async fn tick(&self) {
        for node in &self.nodes {
            let _ = node.consensus().tick().await;
        }
    }

    /// Tick every node until `done` holds, at most `max_ticks` rounds.
    pub async fn tick_until(&self, max_ticks: usize, done: impl Fn(&Self) -> bool) -> bool {
        for _ in 0..max_ticks {
            if done(self) {
                return true;
            }
            self.tick().await;
        }
        done(self)
    }

    pub fn leaders(&self) -> Vec<&Arc<Node>> {
        self.nodes
            .iter()
            .filter(|n| n.consensus().is_leader())
            .collect()
    }

    pub fn leader(&self) -> Option<&Arc<Node>> {
        self.leaders().into_iter().next()
    }

    /// Leaders and their terms among `names`.
    pub fn leaders_among(&self, names: &[&str]) -> Vec<(NodeId, u64)> {
        names
            .iter()
            .map(|name| self.node(name))
            .filter(|n| n.consensus().is_leader())
            .map(|n| (n.id().clone(), n.consensus().status().term))
            .collect()
    }

    /// Two different blocks at `height`, both signed by `name`.
    pub fn double_sign(&self, name: &str, height: u64) -> SlashingEvidence {
        let signer = self.identity(name);
        let header = |fill: u8| {
            BlockHeader::new(
                height,
                ContentHash([fill; 32]),
                ContentHash([0x11; 32]),
                Timestamp::from_secs(GENESIS_SECS - 10),
                node_id(name),
            )
            .signed_by(signer)
            .expect("header signs")
        };
        SlashingEvidence::double_sign(header(0xa1), header(0xb2), self.clock.now())
    }

    pub fn start_all(&self) {
        for node in &self.nodes {
            node.start();
        }
    }

    pub async fn shutdown_all(&self) {
        for node in &self.nodes {
            node.shutdown().await;
        }
    }
}

/// Poll `check` every few milliseconds of real time until it holds or
/// `limit` passes.
pub async fn eventually(limit: Duration, check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
