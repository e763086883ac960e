use super::*;
use mesh_03_federation::{FederationService, PeeringContract, PolicyConfig};
use shared_bus::{EventFilter, EventTopic, InMemoryEventBus};
use shared_crypto::{Ed25519Identity, Ed25519KeyPair, Ed25519Verifier};
use shared_types::{ManualTimeSource, PublicKey, Signature, Signer};

const STAKE: u64 = 20_000;

struct Harness {
    engine: SlashingEngine,
    federation: Arc<FederationService>,
    bus: Arc<InMemoryEventBus>,
    validator: Ed25519Identity,
}

fn id(name: &str) -> NodeId {
    NodeId::from(name)
}

fn harness() -> Harness {
    let bus = Arc::new(InMemoryEventBus::new());
    let clock = Arc::new(ManualTimeSource::new(Timestamp::from_secs(1_000)));
    let federation = Arc::new(
        FederationService::from_config(PolicyConfig::default(), bus.clone(), clock.clone())
            .unwrap(),
    );

    let validator = Ed25519Identity::new(id("v1"), Ed25519KeyPair::from_seed([1; 32]));
    for (name, key) in [("v1", validator.public_key()), ("v2", PublicKey(b"pk-v2".to_vec()))] {
        let contract = PeeringContract::new(
            id(name),
            key,
            STAKE,
            format!("{name}.mesh.io:8080"),
            Timestamp::from_secs(900),
        );
        federation.admit_node(&contract).unwrap();
    }

    let engine = SlashingEngine::new(
        SlashingConfig::default(),
        federation.clone(),
        bus.clone(),
        clock,
    )
    .with_verifier(Arc::new(Ed25519Verifier));

    Harness {
        engine,
        federation,
        bus,
        validator,
    }
}

fn header(h: &Harness, height: u64, block: u8) -> BlockHeader {
    BlockHeader::new(
        height,
        ContentHash([block; 32]),
        ContentHash([0; 32]),
        Timestamp::from_secs(950),
        id("v1"),
    )
    .signed_by(&h.validator)
    .unwrap()
}

fn node(h: &Harness, name: &str) -> NodeRecord {
    NodeRegistry::get_node(h.federation.as_ref(), &id(name)).unwrap()
}

#[tokio::test]
async fn test_double_sign_is_full_slash_and_ban() {
    let h = harness();
    let mut sub = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Governance]));

    let evidence = SlashingEvidence::double_sign(
        header(&h, 100, 0xaa),
        header(&h, 100, 0xbb),
        Timestamp::from_secs(1_000),
    )
    .reported_by(id("v2"));

    let verdict = h.engine.process_evidence(evidence.clone());
    assert!(verdict.is_valid, "{}", verdict.reason);
    assert_eq!(verdict.action, Some(SlashingAction::Ban));
    assert_eq!(verdict.stake_slashed, STAKE);
    assert_eq!(verdict.code, SlashingVerdict::PUNISHED);

    let record = node(&h, "v1");
    assert_eq!(record.status, NodeStatus::Banned);
    assert_eq!(record.stake_amount, 0);
    assert_eq!(record.slashing_events, vec![verdict.verdict_hash]);

    let events = sub.drain();
    assert!(events.contains(&MeshEvent::NodeSlashed {
        accused: id("v1"),
        violation: "DOUBLE_SIGN".into(),
        action: "BAN".into(),
        stake_slashed: STAKE,
        evidence_hash: evidence.evidence_hash,
        verdict_hash: verdict.verdict_hash,
    }));

    let replay = h.engine.process_evidence(evidence);
    assert!(!replay.is_valid);
    assert!(replay.is_replay());
    assert!(replay.reason.starts_with("REPLAY"));
    assert_eq!(h.engine.get_verdicts(Some(&id("v1"))).len(), 1);
}

#[test]
fn test_verdict_hash_is_reproducible() {
    let h = harness();
    let evidence = SlashingEvidence::double_sign(
        header(&h, 7, 1),
        header(&h, 7, 2),
        Timestamp::from_secs(1_000),
    );
    let verdict = h.engine.process_evidence(evidence);

    let expected = verdict_hash(
        true,
        &verdict.evidence_hash,
        verdict.stake_slashed,
        verdict.processed_at,
    )
    .unwrap();
    assert_eq!(verdict.verdict_hash, expected);
}

#[test]
fn test_forged_signature_rejected_and_not_punished() {
    let h = harness();
    let mut forged = header(&h, 100, 0xbb);
    forged.signature = Signature(vec![9; 64]);
    let evidence =
        SlashingEvidence::double_sign(header(&h, 100, 0xaa), forged, Timestamp::from_secs(1_000));

    let verdict = h.engine.process_evidence(evidence.clone());
    assert!(!verdict.is_valid);
    assert_eq!(verdict.code, "BAD_SIGNATURE");
    assert_eq!(node(&h, "v1").status, NodeStatus::Active);
    assert_eq!(node(&h, "v1").stake_amount, STAKE);

    // Invalid evidence is still remembered.
    assert!(h.engine.process_evidence(evidence).is_replay());
}

#[test]
fn test_tampered_evidence_does_not_reserve_hash() {
    let h = harness();
    let genuine = SlashingEvidence::double_sign(
        header(&h, 100, 0xaa),
        header(&h, 100, 0xbb),
        Timestamp::from_secs(1_000),
    );

    let mut tampered = genuine.clone();
    tampered.header_b.as_mut().unwrap().height = 101;
    let verdict = h.engine.process_evidence(tampered);
    assert_eq!(verdict.code, "HASH_MISMATCH");
    assert!(!h.engine.is_processed(&genuine.evidence_hash));

    assert!(h.engine.process_evidence(genuine).is_valid);
}

#[test]
fn test_unknown_accused() {
    let h = harness();
    let evidence = SlashingEvidence::downtime(id("ghost"), 7_200, Timestamp::from_secs(1_000));
    let verdict = h.engine.process_evidence(evidence);
    assert_eq!(verdict.code, "UNKNOWN_ACCUSED");
    assert_eq!(h.engine.status().valid_slashings, 0);
}

#[test]
fn test_downtime_puts_on_probation() {
    let h = harness();
    let short = SlashingEvidence::downtime(id("v2"), 600, Timestamp::from_secs(1_000));
    assert_eq!(h.engine.process_evidence(short).code, "INSUFFICIENT_DOWNTIME");

    let long = SlashingEvidence::downtime(id("v2"), 7_200, Timestamp::from_secs(1_000));
    let verdict = h.engine.process_evidence(long);
    assert!(verdict.is_valid);
    assert_eq!(verdict.action, Some(SlashingAction::Probation));
    assert_eq!(verdict.stake_slashed, STAKE / 10);

    let record = node(&h, "v2");
    assert_eq!(record.status, NodeStatus::Probation);
    assert_eq!(record.stake_amount, STAKE - STAKE / 10);
}

#[test]
fn test_censorship_slashes_quarter() {
    let h = harness();
    let evidence = SlashingEvidence::censorship(
        id("v2"),
        vec![ContentHash([1; 32]), ContentHash([2; 32])],
        Timestamp::from_secs(1_000),
    );
    let verdict = h.engine.process_evidence(evidence);
    assert_eq!(verdict.stake_slashed, STAKE / 4);
    assert_eq!(node(&h, "v2").status, NodeStatus::Probation);
}

#[test]
fn test_minor_violation_warns_without_slash() {
    let h = harness();
    let evidence = SlashingEvidence::new(ViolationType::LateBlock, id("v2"), Timestamp::from_secs(1));
    let verdict = h.engine.process_evidence(evidence);

    assert!(verdict.is_valid);
    assert_eq!(verdict.action, Some(SlashingAction::Warn));
    assert_eq!(verdict.stake_slashed, 0);
    let record = node(&h, "v2");
    assert_eq!(record.warnings, 1);
    assert_eq!(record.stake_amount, STAKE);
    assert_eq!(record.status, NodeStatus::Active);
}

#[test]
fn test_check_double_signing() {
    let h = harness();
    let a = header(&h, 5, 1);
    assert!(h.engine.check_double_signing(&a, &a).is_none());
    assert!(h.engine.check_double_signing(&a, &header(&h, 6, 2)).is_none());

    let evidence = h.engine.check_double_signing(&a, &header(&h, 5, 2)).unwrap();
    assert_eq!(evidence.accused_id, id("v1"));
    assert!(h.engine.process_evidence(evidence).is_valid);
}

#[test]
fn test_status_totals() {
    let h = harness();
    h.engine.process_evidence(SlashingEvidence::downtime(
        id("v2"),
        7_200,
        Timestamp::from_secs(1),
    ));
    h.engine.process_evidence(SlashingEvidence::double_sign(
        header(&h, 100, 1),
        header(&h, 100, 2),
        Timestamp::from_secs(1),
    ));
    h.engine.process_evidence(SlashingEvidence::downtime(id("ghost"), 7_200, Timestamp::from_secs(1)));

    let status = h.engine.status();
    assert_eq!(status.total_evidence_processed, 3);
    assert_eq!(status.total_verdicts, 3);
    assert_eq!(status.valid_slashings, 2);
    assert_eq!(status.total_stake_slashed, STAKE / 10 + STAKE);
    assert_eq!(status.violations_by_type[&ViolationType::DoubleSign], 1);
    assert_eq!(status.violations_by_type[&ViolationType::Downtime], 1);
}

#[test]
fn test_audit_log_is_bounded() {
    let bus = Arc::new(InMemoryEventBus::new());
    let clock = Arc::new(ManualTimeSource::new(Timestamp::from_secs(1)));
    let federation = Arc::new(
        FederationService::from_config(PolicyConfig::default(), bus.clone(), clock.clone())
            .unwrap(),
    );
    let config = SlashingConfig {
        audit_log_limit: 2,
        ..SlashingConfig::default()
    };
    let engine = SlashingEngine::new(config, federation, bus, clock);

    for i in 0..3 {
        engine.process_evidence(SlashingEvidence::downtime(
            id(&format!("ghost{i}")),
            7_200,
            Timestamp::from_secs(1),
        ));
    }
    let verdicts = engine.get_verdicts(None);
    assert_eq!(verdicts.len(), 2);
    assert_eq!(verdicts[0].accused_id, id("ghost1"));
    assert_eq!(engine.status().total_verdicts, 3);
}
