use super::*;
use crate::adapters::{InMemoryStateStore, KeyValueStateMachine};
use serde_json::json;
use shared_bus::InMemoryEventBus;
use shared_types::{ManualTimeSource, Timestamp};
use std::collections::VecDeque;

fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

fn config() -> ConsensusConfig {
    ConsensusConfig {
        rng_seed: Some(7),
        ..Default::default()
    }
}

fn build(
    me: &str,
    peers: &[&str],
    store: InMemoryStateStore,
    kv: Arc<KeyValueStateMachine>,
) -> RaftNode {
    RaftNode::new(
        id(me),
        peers.iter().map(|p| id(p)).collect(),
        config(),
        RaftPorts {
            store: Box::new(store),
            commit_handler: kv,
            events: Arc::new(InMemoryEventBus::new()),
            clock: Arc::new(ManualTimeSource::new(Timestamp::from_secs(1))),
        },
    )
    .unwrap()
}

fn simple(me: &str, peers: &[&str]) -> RaftNode {
    build(
        me,
        peers,
        InMemoryStateStore::new(),
        Arc::new(KeyValueStateMachine::new()),
    )
}

struct Cluster {
    nodes: HashMap<NodeId, RaftNode>,
    kvs: HashMap<NodeId, Arc<KeyValueStateMachine>>,
}

impl Cluster {
    fn new(ids: &[&str]) -> Self {
        let mut nodes = HashMap::new();
        let mut kvs = HashMap::new();
        for me in ids {
            let peers: Vec<&str> = ids.iter().copied().filter(|p| p != me).collect();
            let kv = Arc::new(KeyValueStateMachine::new());
            nodes.insert(id(me), build(me, &peers, InMemoryStateStore::new(), kv.clone()));
            kvs.insert(id(me), kv);
        }
        Self { nodes, kvs }
    }

    fn node(&mut self, name: &str) -> &mut RaftNode {
        self.nodes.get_mut(&id(name)).unwrap()
    }

    /// Deliver messages (and every follow-up) synchronously.
    fn pump(&mut self, from: &str, outbound: Vec<Outbound>) {
        let mut queue: VecDeque<(NodeId, Outbound)> =
            outbound.into_iter().map(|o| (id(from), o)).collect();

        while let Some((sender, msg)) = queue.pop_front() {
            let Ok(response) = self.nodes.get_mut(&msg.to).unwrap().handle_request(&msg.request)
            else {
                continue;
            };
            let more = self
                .nodes
                .get_mut(&sender)
                .unwrap()
                .handle_response(&response)
                .unwrap();
            queue.extend(more.into_iter().map(|o| (sender.clone(), o)));
        }
    }

    fn elect(&mut self, name: &str) {
        let out = self.node(name).start_election().unwrap();
        self.pump(name, out);
        assert!(self.node(name).is_leader());
    }
}

#[test]
fn test_follower_times_out_into_candidate() {
    let mut node = simple("n1", &["n2", "n3"]);
    let mut requests = Vec::new();
    for _ in 0..config().election_timeout_max_ticks {
        requests = node.tick().unwrap();
        if !requests.is_empty() {
            break;
        }
    }

    assert_eq!(node.role(), Role::Candidate);
    assert_eq!(node.current_term(), 1);
    assert_eq!(node.voted_for(), Some(&id("n1")));
    assert_eq!(requests.len(), 2);
    assert!(requests
        .iter()
        .all(|o| matches!(o.request, RaftRequest::RequestVote(ref r) if r.term == 1)));
}

#[test]
fn test_single_node_commits_on_propose() {
    let kv = Arc::new(KeyValueStateMachine::new());
    let mut node = build("solo", &[], InMemoryStateStore::new(), kv.clone());

    node.start_election().unwrap();
    assert!(node.is_leader());

    let (index, out) = node
        .propose(json!({"action": "SET", "key": "x", "value": 1}))
        .unwrap();
    assert_eq!(index, 1);
    assert!(out.is_empty());
    assert_eq!(node.commit_index(), 1);
    assert_eq!(kv.get("x"), Some(json!(1)));
}

#[test]
fn test_vote_persisted_before_reply() {
    let store = InMemoryStateStore::new();
    let mut node = build(
        "n1",
        &["n2", "n3"],
        store.clone(),
        Arc::new(KeyValueStateMachine::new()),
    );

    let resp = node
        .handle_request_vote(&RequestVoteRequest {
            term: 5,
            candidate_id: id("n2"),
            last_log_index: 0,
            last_log_term: 0,
        })
        .unwrap();

    assert!(resp.vote_granted);
    let saved = store.snapshot().unwrap();
    assert_eq!(saved.current_term, 5);
    assert_eq!(saved.voted_for, Some(id("n2")));
}

#[test]
fn test_one_vote_per_term() {
    let mut node = simple("n1", &["n2", "n3"]);
    let ask = |candidate: &str| RequestVoteRequest {
        term: 1,
        candidate_id: id(candidate),
        last_log_index: 0,
        last_log_term: 0,
    };

    assert!(node.handle_request_vote(&ask("n2")).unwrap().vote_granted);
    assert!(!node.handle_request_vote(&ask("n3")).unwrap().vote_granted);
    // Repeated request from the same candidate is idempotent.
    assert!(node.handle_request_vote(&ask("n2")).unwrap().vote_granted);
}

#[test]
fn test_vote_denied_to_stale_log() {
    let mut cluster = Cluster::new(&["n1", "n2", "n3"]);
    cluster.elect("n1");
    let (_, out) = cluster
        .node("n1")
        .propose(json!({"action": "SET", "key": "a", "value": 1}))
        .unwrap();
    cluster.pump("n1", out);

    let n3 = cluster.node("n3");
    let resp = n3
        .handle_request_vote(&RequestVoteRequest {
            term: 2,
            candidate_id: id("n2"),
            last_log_index: 0,
            last_log_term: 0,
        })
        .unwrap();

    assert!(!resp.vote_granted);
    assert_eq!(resp.term, 2);
    assert_eq!(n3.voted_for(), None);
}

#[test]
fn test_stale_term_requests_rejected() {
    let mut node = simple("n1", &["n2"]);
    node.handle_request_vote(&RequestVoteRequest {
        term: 3,
        candidate_id: id("n2"),
        last_log_index: 0,
        last_log_term: 0,
    })
    .unwrap();

    let resp = node
        .handle_append_entries(&AppendEntriesRequest {
            term: 2,
            leader_id: id("n2"),
            prev_log_index: 0,
            prev_log_term: 0,
            entries: vec![],
            leader_commit: 0,
        })
        .unwrap();

    assert!(!resp.success);
    assert_eq!(resp.term, 3);
    assert_eq!(node.leader_id(), None);
}

#[test]
fn test_higher_term_response_forces_step_down() {
    let mut cluster = Cluster::new(&["n1", "n2", "n3"]);
    cluster.elect("n1");

    let out = cluster
        .node("n1")
        .handle_append_response(&AppendEntriesResponse {
            term: 9,
            success: false,
            follower_id: id("n2"),
            match_index: 0,
        })
        .unwrap();

    let n1 = cluster.node("n1");
    assert!(out.is_empty());
    assert_eq!(n1.role(), Role::Follower);
    assert_eq!(n1.current_term(), 9);
}

#[test]
fn test_replication_reaches_every_log() {
    let mut cluster = Cluster::new(&["n1", "n2", "n3"]);
    cluster.elect("n1");

    let command = json!({"action": "SET", "key": "x", "value": 42});
    let (index, out) = cluster.node("n1").propose(command.clone()).unwrap();
    cluster.pump("n1", out);
    // Followers learn the commit index on the next heartbeat.
    for _ in 0..config().heartbeat_interval_ticks {
        let out = cluster.node("n1").tick().unwrap();
        cluster.pump("n1", out);
    }

    for name in ["n1", "n2", "n3"] {
        let node = cluster.node(name);
        assert_eq!(node.log().get(index).unwrap().command, command);
        assert_eq!(node.commit_index(), index);
        assert_eq!(cluster.kvs[&id(name)].get("x"), Some(json!(42)));
    }
}

#[test]
fn test_conflicting_suffix_is_overwritten() {
    let mut cluster = Cluster::new(&["n1", "n2", "n3"]);
    cluster.elect("n1");

    // Entry that never leaves n1.
    let (_, _dropped) = cluster.node("n1").propose(json!({"orphan": true})).unwrap();

    // n2 takes over in a higher term and replicates its own entry.
    let out = cluster.node("n2").start_election().unwrap();
    let out: Vec<Outbound> = out.into_iter().filter(|o| o.to == id("n3")).collect();
    cluster.pump("n2", out);
    assert!(cluster.node("n2").is_leader());

    let (_, out) = cluster.node("n2").propose(json!({"winner": true})).unwrap();
    cluster.pump("n2", out);

    let n1 = cluster.node("n1");
    assert_eq!(n1.role(), Role::Follower);
    assert_eq!(n1.log().get(1).unwrap().command, json!({"winner": true}));
    assert_eq!(n1.log().last_index(), 1);
}

#[test]
fn test_previous_term_entry_commits_only_with_current_term_entry() {
    let mut cluster = Cluster::new(&["n1", "n2", "n3"]);
    cluster.elect("n1");
    let (_, _dropped) = cluster.node("n1").propose(json!({"old": true})).unwrap();

    // Re-elected in term 2 while carrying the unreplicated term-1 entry.
    cluster.elect("n1");
    let n1 = cluster.node("n1");
    assert_eq!(n1.current_term(), 2);
    assert_eq!(n1.commit_index(), 0, "term-1 entry must not commit by counting");
    assert_eq!(cluster.node("n2").log().last_index(), 1);

    let (index, out) = cluster.node("n1").propose(json!({"new": true})).unwrap();
    cluster.pump("n1", out);

    assert_eq!(index, 2);
    assert_eq!(cluster.node("n1").commit_index(), 2);
    assert_eq!(cluster.kvs[&id("n1")].applied_indices(), vec![1, 2]);
}

#[test]
fn test_propose_on_follower_names_leader() {
    let mut cluster = Cluster::new(&["n1", "n2", "n3"]);
    cluster.elect("n1");

    let err = cluster.node("n2").propose(json!({})).unwrap_err();
    assert_eq!(
        err,
        ConsensusError::NotLeader {
            leader: Some(id("n1"))
        }
    );
}

#[test]
fn test_persistence_failure_halts_engine() {
    let store = InMemoryStateStore::new();
    let mut node = build(
        "n1",
        &["n2", "n3"],
        store.clone(),
        Arc::new(KeyValueStateMachine::new()),
    );
    store.set_fail_writes(true);

    let result = node.handle_request_vote(&RequestVoteRequest {
        term: 1,
        candidate_id: id("n2"),
        last_log_index: 0,
        last_log_term: 0,
    });

    assert!(matches!(result, Err(ConsensusError::Persistence(_))));
    assert!(node.is_halted());
    assert_eq!(node.tick().unwrap_err(), ConsensusError::Halted);

    store.set_fail_writes(false);
    assert_eq!(node.start_election().unwrap_err(), ConsensusError::Halted);
}

#[test]
fn test_restart_restores_term_and_vote() {
    let store = InMemoryStateStore::new();
    {
        let mut node = build(
            "n1",
            &["n2", "n3"],
            store.clone(),
            Arc::new(KeyValueStateMachine::new()),
        );
        node.handle_request_vote(&RequestVoteRequest {
            term: 4,
            candidate_id: id("n2"),
            last_log_index: 0,
            last_log_term: 0,
        })
        .unwrap();
    }

    let mut restarted = build(
        "n1",
        &["n2", "n3"],
        store,
        Arc::new(KeyValueStateMachine::new()),
    );
    assert_eq!(restarted.current_term(), 4);
    assert_eq!(restarted.voted_for(), Some(&id("n2")));

    let resp = restarted
        .handle_request_vote(&RequestVoteRequest {
            term: 4,
            candidate_id: id("n3"),
            last_log_index: 0,
            last_log_term: 0,
        })
        .unwrap();
    assert!(!resp.vote_granted, "a restart must not allow a second vote in term 4");
}

#[test]
fn test_commit_index_never_regresses() {
    let mut cluster = Cluster::new(&["n1", "n2", "n3"]);
    cluster.elect("n1");
    let (_, out) = cluster.node("n1").propose(json!({"a": 1})).unwrap();
    cluster.pump("n1", out);
    let out = cluster.node("n1").broadcast_append();
    cluster.pump("n1", out);
    assert_eq!(cluster.node("n2").commit_index(), 1);

    // A delayed heartbeat carrying an older commit index changes nothing.
    let resp = cluster
        .node("n2")
        .handle_append_entries(&AppendEntriesRequest {
            term: 1,
            leader_id: id("n1"),
            prev_log_index: 0,
            prev_log_term: 0,
            entries: vec![],
            leader_commit: 0,
        })
        .unwrap();
    assert!(resp.success);
    assert_eq!(cluster.node("n2").commit_index(), 1);
}
