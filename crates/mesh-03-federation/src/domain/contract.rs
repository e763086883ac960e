//! Peering contracts: a node's request to join the federation.

use super::error::{PolicyError, PolicyResult};
use serde::{Deserialize, Serialize};
use shared_types::{ContentHash, NodeId, PublicKey, Signature, Signer, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeeringContract {
    pub node_id: NodeId,
    pub public_key: PublicKey,
    pub stake_amount: u64,
    /// `host:port`
    pub endpoint: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub region: String,
    /// Applicant's signature over [`signing_payload`](Self::signing_payload).
    #[serde(default)]
    pub signature: Signature,
    pub submitted_at: Timestamp,
}

#[derive(Serialize)]
struct SignedFields<'a> {
    node_id: &'a NodeId,
    public_key: &'a PublicKey,
    stake_amount: u64,
    endpoint: &'a str,
}

impl PeeringContract {
    pub fn new(
        node_id: NodeId,
        public_key: PublicKey,
        stake_amount: u64,
        endpoint: impl Into<String>,
        submitted_at: Timestamp,
    ) -> Self {
        Self {
            node_id,
            public_key,
            stake_amount,
            endpoint: endpoint.into(),
            organization: String::new(),
            region: String::new(),
            signature: Signature::default(),
            submitted_at,
        }
    }

    pub fn with_organization(
        mut self,
        organization: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        self.organization = organization.into();
        self.region = region.into();
        self
    }

    /// Canonical bytes the applicant signs: id, key, stake and endpoint.
    pub fn signing_payload(&self) -> PolicyResult<Vec<u8>> {
        let fields = SignedFields {
            node_id: &self.node_id,
            public_key: &self.public_key,
            stake_amount: self.stake_amount,
            endpoint: &self.endpoint,
        };
        Ok(shared_crypto::canonical_json(&fields)?)
    }

    pub fn content_hash(&self) -> PolicyResult<ContentHash> {
        Ok(shared_crypto::sha256(&self.signing_payload()?))
    }

    /// Fill in the public key and signature from `signer`.
    pub fn signed_by(mut self, signer: &dyn Signer) -> PolicyResult<Self> {
        self.public_key = signer.public_key();
        let payload = self.signing_payload()?;
        self.signature = signer.sign(&payload);
        Ok(self)
    }
}

/// Accepts `host:port` with a non-empty host and a port in 1-65535.
pub fn validate_endpoint(endpoint: &str) -> PolicyResult<()> {
    let invalid = || PolicyError::InvalidEndpoint(endpoint.to_string());
    let (host, port) = endpoint.rsplit_once(':').ok_or_else(invalid)?;
    if host.trim().is_empty() || host.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    match port.parse::<u16>() {
        Ok(p) if p > 0 => Ok(()),
        _ => Err(invalid()),
    }
}
