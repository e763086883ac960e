//! # Mesh Benchmarks
//!
//! Hot paths of the governance plane:
//!
//! | Path | Work per call |
//! |------|---------------|
//! | Ban proof intake | id recompute + Ed25519 verify + registry update |
//! | Slashing verdict | evidence rehash + two header verifies + stake update |
//! | Evidence sealing | canonical JSON + SHA-256 of two headers |

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use mesh_03_federation::{FederationService, PeeringContract, PolicyConfig};
use mesh_04_slashing::{BlockHeader, SlashingApi, SlashingConfig, SlashingEngine, SlashingEvidence};
use mesh_05_trust::{BanReason, BanRequest, InMemoryTrustStore, TrustConfig, TrustService};
use shared_bus::InMemoryEventBus;
use shared_crypto::{Ed25519Identity, Ed25519KeyPair, Ed25519Verifier};
use shared_types::{ContentHash, ManualTimeSource, NodeId, Signer, Timestamp};
use std::sync::Arc;

fn clock() -> Arc<ManualTimeSource> {
    Arc::new(ManualTimeSource::new(Timestamp::from_secs(1_000)))
}

fn identity(name: &str, seed: u8) -> Ed25519Identity {
    Ed25519Identity::new(NodeId::from(name), Ed25519KeyPair::from_seed([seed; 32]))
}

fn trust_service(admin: &Ed25519Identity) -> TrustService {
    let trust = TrustService::open(
        TrustConfig {
            admins: vec![admin.node_id().clone()],
            ..TrustConfig::default()
        },
        Arc::new(Ed25519Verifier),
        Arc::new(InMemoryTrustStore::new()),
        Arc::new(InMemoryEventBus::new()),
        clock(),
    )
    .unwrap();
    trust
        .register_identity(admin.node_id(), admin.public_key())
        .unwrap();
    trust
}

fn bench_ban_proof_intake(c: &mut Criterion) {
    let admin = identity("admin", 1);
    let issuer = trust_service(&admin);
    let proof = issuer
        .issue_ban(
            BanRequest::new(NodeId::from("rogue"), BanReason::DoubleSign, ContentHash([7; 32])),
            &admin,
        )
        .unwrap();

    c.bench_function("trust/process_ban_gossip", |b| {
        b.iter_batched(
            || trust_service(&admin),
            |receiver| black_box(receiver.process_ban_gossip(&proof).is_ok()),
            BatchSize::SmallInput,
        )
    });
}

fn double_sign(offender: &Ed25519Identity, height: u64) -> SlashingEvidence {
    let header = |fill: u8| {
        BlockHeader::new(
            height,
            ContentHash([fill; 32]),
            ContentHash([0; 32]),
            Timestamp::from_secs(990),
            offender.node_id().clone(),
        )
        .signed_by(offender)
        .unwrap()
    };
    SlashingEvidence::double_sign(header(0xaa), header(0xbb), Timestamp::from_secs(1_000))
}

fn slashing_engine(offender: &Ed25519Identity) -> SlashingEngine {
    let events = Arc::new(InMemoryEventBus::new());
    let federation = Arc::new(
        FederationService::from_config(PolicyConfig::default(), events.clone(), clock()).unwrap(),
    );
    federation
        .admit_node(&PeeringContract::new(
            offender.node_id().clone(),
            offender.public_key(),
            20_000,
            "offender.mesh.io:7000",
            Timestamp::from_secs(500),
        ))
        .unwrap();
    SlashingEngine::new(SlashingConfig::default(), federation, events, clock())
        .with_verifier(Arc::new(Ed25519Verifier))
}

fn bench_slashing_verdict(c: &mut Criterion) {
    let offender = identity("offender", 3);
    let evidence = double_sign(&offender, 100);

    c.bench_function("slashing/double_sign_verdict", |b| {
        b.iter_batched(
            || slashing_engine(&offender),
            |engine| black_box(engine.process_evidence(evidence.clone()).is_valid),
            BatchSize::SmallInput,
        )
    });

    let engine = slashing_engine(&offender);
    engine.process_evidence(evidence.clone());
    c.bench_function("slashing/replay_rejection", |b| {
        b.iter(|| black_box(engine.process_evidence(evidence.clone()).is_replay()))
    });
}

fn bench_evidence_sealing(c: &mut Criterion) {
    let offender = identity("offender", 3);
    let mut height = 0;
    c.bench_function("slashing/seal_double_sign", |b| {
        b.iter(|| {
            height += 1;
            black_box(double_sign(&offender, height).evidence_hash)
        })
    });
}

criterion_group!(
    benches,
    bench_ban_proof_intake,
    bench_slashing_verdict,
    bench_evidence_sealing
);
criterion_main!(benches);
