//! Activity Logging
//!
//! One structured record per handled question, kept in a bounded in-memory
//! log and mirrored to `tracing`.

use crate::intent::IntentSource;
use crate::security::policy::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_ACTIVITY_CAPACITY: usize = 1000;

/// Activity log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub activity_id: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub user_role: Role,
    pub question: String,
    pub intent_source: IntentSource,
    pub sql: Option<String>,
    pub success: bool,
    pub row_count: usize,
    pub execution_time_ms: u64,
    pub message: String,
}

impl ActivityRecord {
    pub fn new(user_id: impl Into<String>, user_role: Role, question: impl Into<String>) -> Self {
        Self {
            activity_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            user_id: user_id.into(),
            user_role,
            question: question.into(),
            intent_source: IntentSource::Fallback,
            sql: None,
            success: false,
            row_count: 0,
            execution_time_ms: 0,
            message: String::new(),
        }
    }

    pub fn with_source(mut self, source: IntentSource) -> Self {
        self.intent_source = source;
        self
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        self.sql = if sql.is_empty() { None } else { Some(sql) };
        self
    }

    pub fn with_outcome(mut self, success: bool, message: impl Into<String>) -> Self {
        self.success = success;
        self.message = message.into();
        self
    }

    pub fn with_rows(mut self, row_count: usize, execution_time_ms: u64) -> Self {
        self.row_count = row_count;
        self.execution_time_ms = execution_time_ms;
        self
    }
}

/// Activity log store, oldest entries dropped past `capacity`.
pub struct ActivityLog {
    capacity: usize,
    records: Mutex<VecDeque<ActivityRecord>>,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record(&self, record: ActivityRecord) {
        if record.success {
            info!(
                activity_id = %record.activity_id,
                user_id = %record.user_id,
                role = %record.user_role,
                source = %record.intent_source,
                rows = record.row_count,
                elapsed_ms = record.execution_time_ms,
                "Question answered"
            );
        } else {
            warn!(
                activity_id = %record.activity_id,
                user_id = %record.user_id,
                role = %record.user_role,
                source = %record.intent_source,
                sql = record.sql.as_deref().unwrap_or(""),
                message = %record.message,
                "Question not answered"
            );
        }

        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
    }

    /// Up to `n` most recent records, newest first.
    pub fn recent(&self, n: usize) -> Vec<ActivityRecord> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.iter().rev().take(n).cloned().collect()
    }

    /// All retained records for one user, oldest first.
    pub fn for_user(&self, user_id: &str) -> Vec<ActivityRecord> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records
            .iter()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let record = ActivityRecord::new("u1", Role::Manager, "how many invoices?")
            .with_source(IntentSource::Model)
            .with_sql("SELECT COUNT(*) FROM invoices")
            .with_rows(1, 12)
            .with_outcome(true, "Query returned 1 row.");
        assert_eq!(record.sql.as_deref(), Some("SELECT COUNT(*) FROM invoices"));
        assert_eq!(record.intent_source, IntentSource::Model);
        assert!(record.success);
        assert_eq!(record.execution_time_ms, 12);
        assert_eq!(record.activity_id.len(), 36);
    }

    #[test]
    fn empty_sql_is_recorded_as_none() {
        let record = ActivityRecord::new("u1", Role::Visitor, "hi").with_sql("");
        assert!(record.sql.is_none());
    }

    #[test]
    fn log_is_bounded_and_recent_is_newest_first() {
        let log = ActivityLog::new(3);
        for i in 0..5 {
            log.record(ActivityRecord::new("u1", Role::Viewer, format!("q{}", i)));
        }
        assert_eq!(log.len(), 3);
        let questions: Vec<String> = log.recent(2).into_iter().map(|r| r.question).collect();
        assert_eq!(questions, vec!["q4".to_string(), "q3".to_string()]);
    }

    #[test]
    fn filters_by_user() {
        let log = ActivityLog::default();
        log.record(ActivityRecord::new("alice", Role::Admin, "a"));
        log.record(ActivityRecord::new("bob", Role::Viewer, "b"));
        log.record(ActivityRecord::new("alice", Role::Admin, "c"));
        let alice: Vec<String> = log.for_user("alice").into_iter().map(|r| r.question).collect();
        assert_eq!(alice, vec!["a".to_string(), "c".to_string()]);
        assert!(log.for_user("carol").is_empty());
    }
}
