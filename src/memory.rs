//! Bounded per-user conversation log.
//!
//! Entries are created lazily on first append and live until `clear` or
//! process exit. Appends for one user are serialized by the map's shard
//! lock, so push and trim happen as one step.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, content)
    }
}

/// Keyed store of conversation logs, each capped at `capacity` turns (FIFO).
pub struct ConversationMemory {
    capacity: usize,
    logs: DashMap<String, VecDeque<ConversationTurn>>,
}

impl ConversationMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            logs: DashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of a user's turns, oldest first. Unknown users have none.
    pub fn history_for(&self, user_id: &str) -> Vec<ConversationTurn> {
        self.logs
            .get(user_id)
            .map(|turns| turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn append(&self, user_id: &str, sender: Sender, content: impl Into<String>) {
        let mut turns = self.logs.entry(user_id.to_string()).or_default();
        turns.push_back(ConversationTurn::new(sender, content));
        while turns.len() > self.capacity {
            turns.pop_front();
        }
    }

    pub fn clear(&self, user_id: &str) {
        self.logs.remove(user_id);
    }

    /// Number of users with a live log.
    pub fn user_count(&self) -> usize {
        self.logs.len()
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn keeps_only_the_most_recent_twenty_in_order() {
        let memory = ConversationMemory::default();
        for i in 0..25 {
            memory.append("u1", Sender::User, format!("message {}", i));
        }
        let history = memory.history_for("u1");
        assert_eq!(history.len(), 20);
        let contents: Vec<String> = history.iter().map(|t| t.content.clone()).collect();
        let expected: Vec<String> = (5..25).map(|i| format!("message {}", i)).collect();
        assert_eq!(contents, expected);
    }

    #[test]
    fn users_are_isolated_and_clear_removes_entry() {
        let memory = ConversationMemory::default();
        memory.append("alice", Sender::User, "how many invoices?");
        memory.append("alice", Sender::Assistant, "There are 12 invoices.");
        memory.append("bob", Sender::User, "hello");

        assert_eq!(memory.history_for("alice").len(), 2);
        assert_eq!(memory.history_for("bob").len(), 1);
        assert_eq!(memory.user_count(), 2);

        memory.clear("alice");
        assert!(memory.history_for("alice").is_empty());
        assert_eq!(memory.history_for("bob").len(), 1);
        assert_eq!(memory.user_count(), 1);
    }

    #[test]
    fn unknown_user_has_empty_history() {
        let memory = ConversationMemory::default();
        assert!(memory.history_for("nobody").is_empty());
        assert_eq!(memory.user_count(), 0);
    }

    #[test]
    fn concurrent_appends_for_one_user_are_not_lost() {
        let memory = Arc::new(ConversationMemory::new(1000));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let memory = Arc::clone(&memory);
                thread::spawn(move || {
                    for i in 0..50 {
                        memory.append("shared", Sender::User, format!("{}-{}", t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(memory.history_for("shared").len(), 400);
    }

    #[test]
    fn concurrent_appends_never_exceed_capacity() {
        let memory = Arc::new(ConversationMemory::default());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let memory = Arc::clone(&memory);
                thread::spawn(move || {
                    for i in 0..30 {
                        memory.append("busy", Sender::Assistant, format!("{}-{}", t, i));
                        assert!(memory.history_for("busy").len() <= 20);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(memory.history_for("busy").len(), 20);
    }

    #[test]
    fn sender_renders_lowercase() {
        assert_eq!(ConversationTurn::assistant("ok").sender.to_string(), "assistant");
    }
}
