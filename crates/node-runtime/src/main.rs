//! # Mesh Node
//!
//! Runs one mesh node until Ctrl+C.
//!
//! ## Usage
//!
//! ```text
//! node-runtime [CONFIG.toml]
//! ```
//!
//! The config path falls back to `MESH_CONFIG`; without either the node
//! starts from defaults plus `MESH_*` overrides (at least `MESH_NODE_ID`).
//!
//! ## Transport
//!
//! The node is hosted on a process-local `InMemoryRouter`. Bootstrap peers
//! listed in the config are joined to gossip and consensus, but they are
//! only reachable once something registers them on the same router; a
//! socket transport plugs in behind the same `RpcTransport` trait.
//!
//! ## Startup Sequence
//!
//! 1. Load and validate configuration
//! 2. Initialize logging
//! 3. Derive the signing identity (seeded or freshly generated)
//! 4. Assemble the node and register it on the router
//! 5. Spawn the task loops
//! 6. On Ctrl+C: stop the loops, announce the leave

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use mesh_telemetry::{gather_metrics, init_logging, TelemetryConfig};
use node_runtime::{MeshNode, MeshRequest, MeshResponse, NodeConfig};
use shared_bus::InMemoryRouter;
use shared_crypto::{Ed25519Identity, Ed25519KeyPair};
use shared_types::{Signer, SystemTimeSource};
use tracing::{debug, info, warn};

fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("MESH_CONFIG").map(PathBuf::from))
}

fn load_identity(config: &NodeConfig) -> Result<Ed25519Identity> {
    let id = config.node_id();
    match config.identity_seed()? {
        Some(seed) => Ok(Ed25519Identity::new(id, Ed25519KeyPair::from_seed(seed))),
        None => {
            warn!(node = %id, "No identity seed configured; using an ephemeral key");
            Ok(Ed25519Identity::generate(id))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let path = config_path();
    let config = NodeConfig::load(path.as_deref()).context("Failed to load node configuration")?;

    init_logging(&TelemetryConfig::for_node(&config.node.id))
        .context("Failed to initialize logging")?;

    info!("===========================================");
    info!("  Mesh Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");
    if let Some(path) = &path {
        info!(path = %path.display(), "Configuration loaded");
    }

    let identity = Arc::new(load_identity(&config)?);
    info!(
        node = %config.node.id,
        public_key = %identity.public_key().to_hex(),
        "Identity ready"
    );

    let router = InMemoryRouter::<MeshRequest, MeshResponse>::new();
    let endpoint = Arc::new(router.endpoint(config.node_id()));
    let node = Arc::new(
        MeshNode::build(&config, identity, endpoint, Arc::new(SystemTimeSource))
            .context("Failed to assemble mesh node")?,
    );
    router.register(config.node_id(), node.clone());

    node.start();
    info!(
        address = %config.node.address,
        peers = config.node.peers.len(),
        data_dir = ?config.node.data_dir,
        "Node is running. Press Ctrl+C to stop."
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    info!("Initiating graceful shutdown...");
    node.shutdown().await;
    match gather_metrics() {
        Ok(metrics) => debug!(%metrics, "Final metrics"),
        Err(err) => warn!(error = %err, "Metrics export failed"),
    }
    info!("Shutdown complete");
    Ok(())
}
