//! # Sync Job State Machine
//!
//! Lifecycle of a sync job with validated state transitions.
//!
//! ## State Machine
//!
//! ```text
//! Pending → Running → Completed
//!    │        ↑ ↓  ↘
//!    │       Paused → Stopped
//!    ├──────────────→ Stopped
//!    └──────────────→ Failed ← Running
//! ```
//!
//! `Completed`, `Failed` and `Stopped` are terminal: every counter and the
//! result log are frozen once a job reaches one of them.
//!
//! Only the worker executing a job mutates it. Everyone else reads a
//! [`JobSnapshot`].

use crate::task_log::{Outcome, TaskResult, TaskResultLog};
use crate::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique, time-sortable identifier for a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Create a new time-ordered job ID
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse a job ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| SyncError::InvalidJobId(e.to_string()))?,
        ))
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Status Types
// ============================================================================

/// The current status of a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, waiting for a worker
    Pending,
    /// A worker is dispatching units
    Running,
    /// Dispatch suspended; progress kept
    Paused,
    /// Every unit was processed
    Completed,
    /// The job could not start processing
    Failed,
    /// A stop request was honored
    Stopped,
}

impl JobStatus {
    /// Check if this status represents a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped
        )
    }

    /// Check if this status represents an active state
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Stopped => "stopped",
        }
    }
}

impl FromStr for JobStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "paused" => Ok(JobStatus::Paused),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "stopped" => Ok(JobStatus::Stopped),
            _ => Err(SyncError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Job Entity
// ============================================================================

/// One tracked execution of a sync over a directory subtree
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Unique identifier for this job
    pub id: JobId,
    /// Current status
    status: JobStatus,
    /// Sync root as an album path (`/` is the library root)
    pub root_path: String,
    /// When the job was created
    pub created_at: i64,
    /// When a worker picked the job up
    started_at: Option<i64>,
    /// When the job reached a terminal state
    completed_at: Option<i64>,
    /// Units discovered by the walk
    total_tasks: u64,
    /// Units not processed yet
    remaining_tasks: u64,
    /// Results in processing order
    log: TaskResultLog,
    /// Reason the job failed
    error_message: Option<String>,
}

impl Job {
    /// Create a new job in pending state
    pub fn new(root_path: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::Pending,
            root_path: root_path.into(),
            created_at,
            started_at: None,
            completed_at: None,
            total_tasks: 0,
            remaining_tasks: 0,
            log: TaskResultLog::new(),
            error_message: None,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn total_tasks(&self) -> u64 {
        self.total_tasks
    }

    pub fn remaining_tasks(&self) -> u64 {
        self.remaining_tasks
    }

    pub fn results(&self) -> &TaskResultLog {
        &self.log
    }

    /// A worker picked the job up
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not in `Pending` state
    pub fn start(&mut self, now: i64) -> Result<()> {
        self.validate_transition(JobStatus::Running)?;
        self.status = JobStatus::Running;
        self.started_at = Some(now);
        Ok(())
    }

    /// Record the size of the walk. Allowed once, before any result.
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not running or already has results
    pub fn set_total(&mut self, total: u64) -> Result<()> {
        if self.status != JobStatus::Running || !self.log.is_empty() {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: "set_total".to_string(),
                reason: "Total can only be set on a running job before any result".to_string(),
            });
        }

        self.total_tasks = total;
        self.remaining_tasks = total;
        Ok(())
    }

    /// Append the result of one unit and decrement the remaining count
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not running or no units remain
    pub fn record(&mut self, result: TaskResult) -> Result<()> {
        if self.status != JobStatus::Running {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: "record".to_string(),
                reason: "Job must be running to record results".to_string(),
            });
        }
        if self.remaining_tasks == 0 {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: "record".to_string(),
                reason: "No remaining tasks".to_string(),
            });
        }

        self.remaining_tasks -= 1;
        self.log.append(result);
        Ok(())
    }

    /// Suspend dispatch
    pub fn pause(&mut self) -> Result<()> {
        self.validate_transition(JobStatus::Paused)?;
        self.status = JobStatus::Paused;
        Ok(())
    }

    /// Continue dispatch after a pause
    pub fn resume(&mut self) -> Result<()> {
        if self.status != JobStatus::Paused {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: JobStatus::Running.as_str().to_string(),
                reason: "Only a paused job can resume".to_string(),
            });
        }
        self.status = JobStatus::Running;
        Ok(())
    }

    /// Mark the job as completed
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not running or units remain
    pub fn complete(&mut self, now: i64) -> Result<()> {
        self.validate_transition(JobStatus::Completed)?;
        if self.remaining_tasks != 0 {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: JobStatus::Completed.as_str().to_string(),
                reason: format!("{} tasks remain", self.remaining_tasks),
            });
        }
        self.status = JobStatus::Completed;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Mark the job as failed before processing
    pub fn fail(&mut self, message: impl Into<String>, now: i64) -> Result<()> {
        self.validate_transition(JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(now);
        Ok(())
    }

    /// Honor a stop request; results so far are kept
    pub fn stop(&mut self, now: i64) -> Result<()> {
        self.validate_transition(JobStatus::Stopped)?;
        self.status = JobStatus::Stopped;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Stop after an internal error, keeping the error message
    ///
    /// Used where `Failed` is not a legal transition, such as from `Paused`.
    pub fn abort(&mut self, message: impl Into<String>, now: i64) -> Result<()> {
        self.stop(now)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Seconds between start and terminal state
    pub fn duration_secs(&self) -> Option<u64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end.saturating_sub(start).max(0) as u64),
            _ => None,
        }
    }

    /// Point-in-time copy for readers
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.to_string(),
            status: self.status,
            root_path: self.root_path.clone(),
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            total_tasks: self.total_tasks,
            remaining_tasks: self.remaining_tasks,
            error: self.error_message.clone(),
            task_results: self.log.entries().to_vec(),
        }
    }

    /// Validate a state transition
    fn validate_transition(&self, to: JobStatus) -> Result<()> {
        let valid = match (self.status, to) {
            // From Pending
            (JobStatus::Pending, JobStatus::Running) => true,
            (JobStatus::Pending, JobStatus::Failed) => true,
            (JobStatus::Pending, JobStatus::Stopped) => true,

            // From Running
            (JobStatus::Running, JobStatus::Paused) => true,
            (JobStatus::Running, JobStatus::Completed) => true,
            (JobStatus::Running, JobStatus::Failed) => true,
            (JobStatus::Running, JobStatus::Stopped) => true,

            // From Paused
            (JobStatus::Paused, JobStatus::Running) => true,
            (JobStatus::Paused, JobStatus::Stopped) => true,

            // Terminal states cannot transition
            (JobStatus::Completed, _) => false,
            (JobStatus::Failed, _) => false,
            (JobStatus::Stopped, _) => false,

            _ => false,
        };

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.status.as_str(),
                    to.as_str()
                ),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Read-only view of a job, serialized for callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: String,
    pub status: JobStatus,
    pub root_path: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    pub total_tasks: u64,
    pub remaining_tasks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub task_results: Vec<TaskResult>,
}

impl JobSnapshot {
    /// Number of results with the given outcome
    pub fn count(&self, outcome: Outcome) -> usize {
        self.task_results
            .iter()
            .filter(|r| r.outcome == outcome)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_log::ItemType;
    use std::time::Duration;

    fn result(item: &str) -> TaskResult {
        TaskResult::success(item, ItemType::File, Duration::ZERO)
    }

    #[test]
    fn test_job_id_parsing() {
        let first = JobId::new();
        assert_ne!(first, JobId::new());
        assert_eq!(JobId::from_string(&first.as_str()).unwrap(), first);
        assert!(JobId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Paused,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Stopped,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("cancelled".parse::<JobStatus>().is_err());
        assert!(JobStatus::Stopped.is_terminal());
        assert!(JobStatus::Paused.is_active());
    }

    #[test]
    fn test_happy_path() {
        let mut job = Job::new("/", 100);
        job.start(101).unwrap();
        job.set_total(2).unwrap();
        job.record(result("a.jpg")).unwrap();
        assert_eq!(job.remaining_tasks(), 1);
        job.record(result("b.jpg")).unwrap();
        job.complete(105).unwrap();

        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.duration_secs(), Some(4));
        assert_eq!(job.results().len(), 2);
    }

    #[test]
    fn test_complete_requires_all_tasks() {
        let mut job = Job::new("/", 100);
        job.start(100).unwrap();
        job.set_total(1).unwrap();
        assert!(job.complete(101).is_err());
    }

    #[test]
    fn test_abort_paused_job_keeps_error() {
        let mut job = Job::new("/", 100);
        job.start(100).unwrap();
        job.pause().unwrap();
        assert!(job.fail("store closed", 102).is_err());

        job.abort("store closed", 102).unwrap();
        let snapshot = job.snapshot();
        assert_eq!(snapshot.status, JobStatus::Stopped);
        assert_eq!(snapshot.error.as_deref(), Some("store closed"));
    }

    #[test]
    fn test_record_cannot_exceed_total() {
        let mut job = Job::new("/", 100);
        job.start(100).unwrap();
        job.set_total(1).unwrap();
        job.record(result("a.jpg")).unwrap();
        assert!(job.record(result("b.jpg")).is_err());
        assert!(job.set_total(5).is_err());
    }

    #[test]
    fn test_pause_resume_cycle() {
        let mut job = Job::new("/", 100);
        assert!(job.pause().is_err());
        job.start(100).unwrap();
        job.pause().unwrap();
        assert!(job.record(result("a.jpg")).is_err());
        job.resume().unwrap();
        assert_eq!(job.status(), JobStatus::Running);
        assert!(job.resume().is_err());
    }

    #[test]
    fn test_stop_from_every_active_state() {
        let mut pending = Job::new("/", 100);
        pending.stop(101).unwrap();
        assert_eq!(pending.status(), JobStatus::Stopped);

        let mut paused = Job::new("/", 100);
        paused.start(100).unwrap();
        paused.set_total(3).unwrap();
        paused.record(result("a.jpg")).unwrap();
        paused.pause().unwrap();
        paused.stop(102).unwrap();
        assert_eq!(paused.remaining_tasks(), 2);
        assert_eq!(paused.results().len(), 1);
    }

    #[test]
    fn test_terminal_states_are_frozen() {
        let mut job = Job::new("/", 100);
        job.start(100).unwrap();
        job.fail("store unavailable", 101).unwrap();

        assert!(job.start(102).is_err());
        assert!(job.stop(102).is_err());
        assert!(job.pause().is_err());
        assert!(job.set_total(3).is_err());
        assert!(job.record(result("a.jpg")).is_err());
        assert_eq!(job.total_tasks(), 0);
    }

    #[test]
    fn test_snapshot_serialization() {
        let mut job = Job::new("/trip", 1_714_564_800);
        job.start(1_714_564_801).unwrap();
        job.set_total(1).unwrap();
        job.record(result("a.jpg")).unwrap();

        let json = serde_json::to_value(job.snapshot()).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["rootPath"], "/trip");
        assert_eq!(json["createdAt"], 1_714_564_800);
        assert_eq!(json["startedAt"], 1_714_564_801);
        assert!(json.get("completedAt").is_none());
        assert_eq!(json["totalTasks"], 1);
        assert_eq!(json["remainingTasks"], 0);
        assert_eq!(json["taskResults"][0]["item"], "a.jpg");
    }
}
