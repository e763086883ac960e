//! Key-value state machine fed by committed log entries.
//!
//! Understands `{"action": "SET", "key", "value"}` and
//! `{"action": "DELETE", "key"}`. Other commands are recorded as applied and
//! otherwise ignored.

use crate::domain::LogEntry;
use crate::ports::CommitHandler;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
enum KvCommand {
    Set { key: String, value: serde_json::Value },
    Delete { key: String },
}

#[derive(Default)]
pub struct KeyValueStateMachine {
    data: RwLock<BTreeMap<String, serde_json::Value>>,
    applied: RwLock<Vec<u64>>,
}

impl KeyValueStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.data.read().get(key).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, serde_json::Value> {
        self.data.read().clone()
    }

    /// Indices applied so far, in application order.
    pub fn applied_indices(&self) -> Vec<u64> {
        self.applied.read().clone()
    }
}

impl CommitHandler for KeyValueStateMachine {
    fn apply(&self, entry: &LogEntry) {
        match serde_json::from_value::<KvCommand>(entry.command.clone()) {
            Ok(KvCommand::Set { key, value }) => {
                self.data.write().insert(key, value);
            }
            Ok(KvCommand::Delete { key }) => {
                self.data.write().remove(&key);
            }
            Err(_) => debug!(index = entry.index, "Ignoring non key-value command"),
        }
        self.applied.write().push(entry.index);
    }
}
