//! # Task Result Log
//!
//! Append-only record of every unit a job processed, in processing order.
//! Entries are immutable once appended; the log is owned by its job.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a unit of work was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    File,
    Folder,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::File => "file",
            ItemType::Folder => "folder",
        }
    }
}

/// How processing a unit ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Persisted something new or changed
    Success,
    /// Already up to date; nothing written
    Skipped,
    /// Processing aborted for this unit
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Skipped => "skipped",
            Outcome::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome record for one processed filesystem entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    /// Entry path relative to the job root, `/`-separated
    pub item: String,
    pub item_type: ItemType,
    pub outcome: Outcome,
    /// Error description when `outcome` is `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Non-fatal annotations, e.g. capture time fallback
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Processing time in seconds
    pub duration_seconds: f64,
}

impl TaskResult {
    pub fn success(item: impl Into<String>, item_type: ItemType, elapsed: Duration) -> Self {
        Self::new(item.into(), item_type, Outcome::Success, None, elapsed)
    }

    pub fn skipped(item: impl Into<String>, item_type: ItemType, elapsed: Duration) -> Self {
        Self::new(item.into(), item_type, Outcome::Skipped, None, elapsed)
    }

    pub fn failed(
        item: impl Into<String>,
        item_type: ItemType,
        error: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self::new(
            item.into(),
            item_type,
            Outcome::Failed,
            Some(error.into()),
            elapsed,
        )
    }

    fn new(
        item: String,
        item_type: ItemType,
        outcome: Outcome,
        error: Option<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            item,
            item_type,
            outcome,
            error,
            warnings: Vec::new(),
            duration_seconds: elapsed.as_secs_f64(),
        }
    }

    /// Attach warning annotations
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Ordered, append-only list of task results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskResultLog {
    entries: Vec<TaskResult>,
}

impl TaskResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result; existing entries are never modified
    pub fn append(&mut self, result: TaskResult) {
        self.entries.push(result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TaskResult] {
        &self.entries
    }

    /// Number of entries with the given outcome
    pub fn count(&self, outcome: Outcome) -> usize {
        self.entries.iter().filter(|r| r.outcome == outcome).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_preserves_order_and_counts() {
        let mut log = TaskResultLog::new();
        log.append(TaskResult::success("sub", ItemType::Folder, Duration::ZERO));
        log.append(TaskResult::skipped("sub/a.jpg", ItemType::File, Duration::ZERO));
        log.append(TaskResult::failed(
            "sub/b.jpg",
            ItemType::File,
            "decode error",
            Duration::from_millis(1500),
        ));

        let items: Vec<_> = log.entries().iter().map(|r| r.item.as_str()).collect();
        assert_eq!(items, vec!["sub", "sub/a.jpg", "sub/b.jpg"]);
        assert_eq!(log.len(), 3);
        assert_eq!(log.count(Outcome::Failed), 1);
        assert_eq!(log.count(Outcome::Success), 1);
        assert_eq!(log.entries()[2].duration_seconds, 1.5);
    }

    #[test]
    fn test_task_result_serialization() {
        let result = TaskResult::success("a.jpg", ItemType::File, Duration::from_millis(250))
            .with_warnings(vec!["capture time taken from file modification time".into()]);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["item"], "a.jpg");
        assert_eq!(json["itemType"], "file");
        assert_eq!(json["outcome"], "success");
        assert_eq!(json["durationSeconds"], 0.25);
        assert!(json.get("error").is_none());
        assert_eq!(json["warnings"].as_array().map(Vec::len), Some(1));
    }
}
