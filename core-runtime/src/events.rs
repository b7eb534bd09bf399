//! # Event Bus System
//!
//! Provides an event-driven notification channel for the gallery core using
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enums for job lifecycle and library changes
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! Events are notifications only. Job status snapshots remain the source of
//! truth; a subscriber that lags or drops events can always re-read the job.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, JobEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Job(JobEvent::Started {
//!         job_id: "job-1".to_string(),
//!     }))
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Job(JobEvent::Started { .. })));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! Publishers ignore the error returned when nobody is subscribed.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Sync job lifecycle events
    Job(JobEvent),
    /// Album and media changes
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Job(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Job(JobEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Job(JobEvent::Completed { failed, .. }) if *failed > 0 => {
                EventSeverity::Warning
            }
            CoreEvent::Job(JobEvent::Completed { .. })
            | CoreEvent::Job(JobEvent::Stopped { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Job Events
// ============================================================================

/// Lifecycle events of a sync job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum JobEvent {
    /// Job accepted and waiting for a worker.
    Queued {
        job_id: String,
        /// Root path relative to the library root.
        root_path: String,
    },
    /// A worker picked the job up.
    Started { job_id: String },
    /// One unit of work finished.
    Progress {
        job_id: String,
        /// Name of the processed file or folder.
        item: String,
        /// `success`, `skipped` or `failed`.
        outcome: String,
        total_tasks: u64,
        remaining_tasks: u64,
    },
    /// The worker honored a pause request.
    Paused { job_id: String, remaining_tasks: u64 },
    /// The worker resumed dispatching.
    Resumed { job_id: String },
    /// Every unit was processed.
    Completed {
        job_id: String,
        total_tasks: u64,
        /// Units whose outcome was `failed`.
        failed: u64,
        duration_secs: u64,
    },
    /// The job could not start processing.
    Failed { job_id: String, message: String },
    /// The worker honored a stop request.
    Stopped {
        job_id: String,
        processed_tasks: u64,
        remaining_tasks: u64,
    },
}

impl JobEvent {
    fn description(&self) -> &str {
        match self {
            JobEvent::Queued { .. } => "Job queued",
            JobEvent::Started { .. } => "Job started",
            JobEvent::Progress { .. } => "Job in progress",
            JobEvent::Paused { .. } => "Job paused",
            JobEvent::Resumed { .. } => "Job resumed",
            JobEvent::Completed { .. } => "Job completed",
            JobEvent::Failed { .. } => "Job failed",
            JobEvent::Stopped { .. } => "Job stopped",
        }
    }

    /// Id of the job this event belongs to.
    pub fn job_id(&self) -> &str {
        match self {
            JobEvent::Queued { job_id, .. }
            | JobEvent::Started { job_id }
            | JobEvent::Progress { job_id, .. }
            | JobEvent::Paused { job_id, .. }
            | JobEvent::Resumed { job_id }
            | JobEvent::Completed { job_id, .. }
            | JobEvent::Failed { job_id, .. }
            | JobEvent::Stopped { job_id, .. } => job_id,
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

/// Events related to album and media changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A folder was reconciled into a new album.
    AlbumCreated { album_id: String, path: String },
    /// An album and its descendants were deleted.
    AlbumDeleted { album_id: String, path: String },
    /// A media record was created or replaced.
    MediaIngested {
        media_id: String,
        album_id: String,
        filename: String,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::AlbumCreated { .. } => "Album created",
            LibraryEvent::AlbumDeleted { .. } => "Album deleted",
            LibraryEvent::MediaIngested { .. } => "Media ingested",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for core events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// When a subscriber falls behind by more than `capacity` events it
    /// receives `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let jobs_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Job(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            match &self.filter {
                Some(filter) if !filter(&event) => continue,
                _ => return Ok(event),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(job_id: &str) -> CoreEvent {
        CoreEvent::Job(JobEvent::Started {
            job_id: job_id.to_string(),
        })
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_error() {
        let bus = EventBus::new(10);
        assert!(bus.emit(started("job-1")).is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(10);
        let mut sub = bus.subscribe();

        let event = started("job-1");
        assert_eq!(bus.emit(event.clone()).unwrap(), 1);
        assert_eq!(sub.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let event = CoreEvent::Job(JobEvent::Queued {
            job_id: "job-1".to_string(),
            root_path: "/2023".to_string(),
        });
        bus.emit(event.clone()).ok();

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|event| matches!(event, CoreEvent::Job(_)));

        bus.emit(CoreEvent::Library(LibraryEvent::AlbumCreated {
            album_id: "album-1".to_string(),
            path: "/trip".to_string(),
        }))
        .ok();
        let job_event = started("job-2");
        bus.emit(job_event.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), job_event);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(started(&format!("job-{}", i))).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Job(JobEvent::Failed {
            job_id: "job-1".to_string(),
            message: "store unavailable".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let partial = CoreEvent::Job(JobEvent::Completed {
            job_id: "job-1".to_string(),
            total_tasks: 3,
            failed: 1,
            duration_secs: 2,
        });
        assert_eq!(partial.severity(), EventSeverity::Warning);

        let clean = CoreEvent::Job(JobEvent::Completed {
            job_id: "job-1".to_string(),
            total_tasks: 3,
            failed: 0,
            duration_secs: 2,
        });
        assert_eq!(clean.severity(), EventSeverity::Info);
        assert_eq!(started("job-1").severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_job_event_serialization() {
        let event = CoreEvent::Job(JobEvent::Paused {
            job_id: "job-1".to_string(),
            remaining_tasks: 4,
        });
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "Job");
        assert_eq!(json["payload"]["event"], "Paused");
        assert_eq!(json["payload"]["remaining_tasks"], 4);
        assert_eq!(event.description(), "Job paused");
    }

    #[test]
    fn test_job_event_job_id() {
        let event = JobEvent::Stopped {
            job_id: "job-9".to_string(),
            processed_tasks: 1,
            remaining_tasks: 2,
        };
        assert_eq!(event.job_id(), "job-9");
    }
}
