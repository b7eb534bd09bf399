//! # Sync & Ingestion Module
//!
//! Turns directory subtrees of the library root into albums and media
//! records.
//!
//! ## Overview
//!
//! A sync job walks one directory subtree and, for every entry:
//! - Reconciles sub-directories into albums (created if missing)
//! - Ingests supported photo and video files: content hash, thumbnail,
//!   embedded metadata, capture time, blob write and record upsert
//! - Skips files whose content hash is unchanged since the last sync
//! - Records a per-entry result in the job's log
//!
//! ## Components
//!
//! - **Job State Machine** (`job`): Job lifecycle with validated state transitions
//! - **Task Result Log** (`task_log`): Ordered per-entry outcomes
//! - **Directory Walk** (`walker`): Deterministic unit-of-work discovery
//! - **Album Reconciler** (`reconciler`): Directory to album mapping
//! - **Media Ingestor** (`ingestor`): Per-file ingestion pipeline
//! - **Job Scheduler** (`scheduler`): Worker pool, pause/resume/stop control

pub mod config;
pub mod error;
pub mod ingestor;
pub mod job;
pub mod reconciler;
pub mod scheduler;
pub mod task_log;
pub mod walker;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use ingestor::{IngestOutcome, MediaIngestor, MTIME_FALLBACK_WARNING};
pub use job::{Job, JobId, JobSnapshot, JobStatus};
pub use reconciler::{AlbumTreeReconciler, Reconciled};
pub use scheduler::{JobScheduler, SubmissionGuard};
pub use task_log::{ItemType, Outcome, TaskResult, TaskResultLog};
pub use walker::{walk, UnitKind, WorkUnit};
