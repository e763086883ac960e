//! # Governance Flows
//!
//! 1. **Slash and ban**: double-sign evidence takes the whole stake, bans
//!    the signer, and the ban proof reaches every other node through the
//!    running governance loops
//! 2. **Replay**: the same evidence a second time changes nothing
//! 3. **Quorum vote**: with six members at a two-thirds quorum a proposal
//!    needs five approvals

#[cfg(test)]
mod tests {
    use crate::harness::{eventually, node_id, MeshCluster, STAKE};
    use mesh_02_consensus::ConsensusApi;
    use mesh_03_federation::{
        FederationService, NodeRegistry, NodeStatus, PeeringContract, PolicyChanges,
        PolicyConfig, PolicyUpdateType, ProposalStatus,
    };
    use mesh_04_slashing::SlashingAction;
    use mesh_05_trust::{BanReason, TrustLevel};
    use shared_bus::InMemoryEventBus;
    use shared_types::{ManualTimeSource, PublicKey, Timestamp};
    use std::sync::Arc;
    use std::time::Duration;

    const NAMES: [&str; 3] = ["n1", "n2", "n3"];

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_double_sign_slashes_and_ban_reaches_every_node() {
        let cluster = MeshCluster::new(&NAMES, &NAMES);
        cluster.start_all();
        let reporter = cluster.node("n1");
        let offender = node_id("n3");

        let evidence = cluster.double_sign("n3", 100);
        let verdict = reporter.submit_evidence(evidence.clone());
        assert!(verdict.is_valid, "{}", verdict.reason);
        assert_eq!(verdict.action, Some(SlashingAction::Ban));
        assert_eq!(verdict.stake_slashed, STAKE);

        let record = reporter.federation().get_node(&offender).unwrap();
        assert_eq!(record.status, NodeStatus::Banned);
        assert_eq!(record.stake_amount, 0);

        let banned_everywhere = eventually(Duration::from_secs(5), || {
            ["n1", "n2"].iter().all(|name| {
                cluster.node(name).trust().get_trust_level(&offender) == TrustLevel::Banned
            })
        })
        .await;
        assert!(banned_everywhere, "ban proof did not reach n2");

        let proof = cluster.node("n2").trust().get_ban_proof(&offender).unwrap();
        assert_eq!(proof.reason, BanReason::DoubleSign);
        assert_eq!(proof.evidence_hash, evidence.evidence_hash);
        assert_eq!(proof.issuer_node_id, node_id("n1"));

        // n2 mirrors the accepted ban into its own federation view.
        let expelled = eventually(Duration::from_secs(5), || {
            cluster
                .node("n2")
                .federation()
                .get_node(&offender)
                .is_some_and(|r| r.status == NodeStatus::Banned)
        })
        .await;
        assert!(expelled);

        let replay = reporter.submit_evidence(evidence);
        assert!(replay.is_replay());
        assert!(!replay.is_valid);
        assert_eq!(reporter.trust().active_bans().len(), 1);

        cluster.shutdown_all().await;
    }

    #[tokio::test]
    async fn test_banned_node_is_cut_off_from_the_mesh() {
        let cluster = MeshCluster::new(&NAMES, &["n1"]);
        let n1 = cluster.node("n1");
        let evidence = cluster.double_sign("n3", 7);
        assert!(n1.submit_evidence(evidence.clone()).is_valid);

        // Drive the governance reaction by hand.
        let proof = n1
            .enforce_ban(&node_id("n3"), "DOUBLE_SIGN", evidence.evidence_hash)
            .unwrap();
        n1.propagate_ban(&proof).await;
        assert!(cluster.node("n2").trust().get_ban_proof(&node_id("n3")).is_some());

        // Requests from n3 are now refused, so its heartbeats go nowhere.
        let before = n1.consensus().status().term;
        let outsider = cluster.node("n3");
        for _ in 0..30 {
            let _ = outsider.consensus().tick().await;
        }
        assert_eq!(n1.consensus().status().term, before);
        assert_eq!(cluster.node("n2").consensus().status().term, before);
    }

    fn federation_of(size: usize) -> FederationService {
        let clock = Arc::new(ManualTimeSource::new(Timestamp::from_secs(10_000)));
        let federation = FederationService::from_config(
            PolicyConfig::default(),
            Arc::new(InMemoryEventBus::new()),
            clock,
        )
        .unwrap();
        for i in 0..size {
            let contract = PeeringContract::new(
                node_id(&format!("m{i}")),
                PublicKey(format!("pk-m{i}").into_bytes()),
                STAKE,
                format!("m{i}.mesh.io:7000"),
                Timestamp::from_secs(9_000),
            );
            federation.admit_node(&contract).unwrap();
        }
        federation
    }

    #[test]
    fn test_policy_needs_five_of_six() {
        let federation = federation_of(6);
        assert_eq!(federation.status().active_nodes, 6);

        let proposed = federation
            .propose_policy_update(
                &node_id("m0"),
                PolicyUpdateType::ParameterChange,
                PolicyChanges::min_stake(15_000),
            )
            .unwrap();
        assert_eq!(proposed.required, 5);
        assert_eq!(proposed.votes_for, 1);
        let id = proposed.proposal_id;

        for voter in ["m1", "m2"] {
            let outcome = federation
                .vote_on_proposal(&id, &node_id(voter), true)
                .unwrap();
            assert_eq!(outcome.status, ProposalStatus::Pending);
        }
        let fourth = federation
            .vote_on_proposal(&id, &node_id("m3"), true)
            .unwrap();
        assert_eq!(fourth.votes_for, 4);
        assert_eq!(fourth.status, ProposalStatus::Pending);

        let fifth = federation
            .vote_on_proposal(&id, &node_id("m4"), true)
            .unwrap();
        assert_eq!(fifth.votes_for, 5);
        assert_eq!(fifth.status, ProposalStatus::Passed);
        assert_eq!(federation.config().min_stake, 15_000);
        assert_eq!(federation.config().version, fifth.config_version);
    }
}
