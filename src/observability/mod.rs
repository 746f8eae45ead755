pub mod activity_log;

pub use activity_log::{ActivityLog, ActivityRecord, DEFAULT_ACTIVITY_CAPACITY};
