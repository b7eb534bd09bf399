//! # Job Scheduler
//!
//! Accepts sync requests, runs them on a bounded worker pool and exposes
//! job state to callers.
//!
//! ## Workflow
//!
//! 1. `start_sync` validates the path, rejects overlapping active jobs and
//!    registers a `Pending` job
//! 2. A worker task waits for a pool permit, then reconciles the sync root's
//!    album chain and walks the subtree to fix the task total
//! 3. Units are processed in walk order; each result is appended to the
//!    job's log and published as a progress event
//! 4. The job completes once every unit has a result
//!
//! Pause and stop requests are flags the worker checks between units, so a
//! request is honored after at most one more unit. A paused job keeps its
//! pool permit.
//!
//! Job state lives in memory only; nothing survives a restart.

use crate::config::SyncConfig;
use crate::ingestor::{IngestOutcome, MediaIngestor};
use crate::job::{Job, JobId, JobSnapshot, JobStatus};
use crate::reconciler::{AlbumTreeReconciler, Reconciled};
use crate::task_log::{ItemType, Outcome, TaskResult};
use crate::walker::{walk, UnitKind, WorkUnit};
use crate::{Result, SyncError};
use bridge_traits::{BlobStore, Clock};
use core_library::models::{is_descendant_path, Album, ROOT_ALBUM_PATH};
use core_library::repositories::{AlbumRepository, MediaRepository};
use core_metadata::MediaTypeDetector;
use core_runtime::events::{CoreEvent, EventBus, JobEvent};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, RwLock, RwLockReadGuard, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

// ============================================================================
// Job Registry Entries
// ============================================================================

/// A registered job together with its control flags
struct JobEntry {
    id: JobId,
    /// Album path of the sync root
    root_path: String,
    /// Canonical directory on disk
    root_dir: PathBuf,
    job: RwLock<Job>,
    /// Mirrors `job.status()`; lets readers wait for transitions
    status: watch::Sender<JobStatus>,
    /// Set by `stop_job`; never cleared
    stop: CancellationToken,
    /// `true` while a pause is requested
    pause: watch::Sender<bool>,
}

impl JobEntry {
    fn new(job: Job, root_dir: PathBuf) -> Self {
        let (status, _) = watch::channel(job.status());
        let (pause, _) = watch::channel(false);
        Self {
            id: job.id,
            root_path: job.root_path.clone(),
            root_dir,
            job: RwLock::new(job),
            status,
            stop: CancellationToken::new(),
            pause,
        }
    }

    fn current_status(&self) -> JobStatus {
        *self.status.borrow()
    }

    fn stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    fn pause_requested(&self) -> bool {
        *self.pause.borrow()
    }

    /// Apply a mutation and publish the resulting status
    async fn update<T>(&self, f: impl FnOnce(&mut Job) -> Result<T>) -> Result<T> {
        let mut job = self.job.write().await;
        let out = f(&mut job)?;
        self.status.send_replace(job.status());
        Ok(out)
    }

    async fn snapshot(&self) -> JobSnapshot {
        self.job.read().await.snapshot()
    }

    /// Raise the stop flag unless the job already finished
    ///
    /// Holds the job lock so the flag cannot slip in between the worker's
    /// final check and its terminal transition.
    async fn request_stop(&self) -> bool {
        let job = self.job.read().await;
        if job.status().is_terminal() {
            return false;
        }
        self.stop.cancel();
        true
    }
}

/// What the worker does after a safe point
enum Checkpoint {
    Continue,
    Stop,
}

/// Holds off new submissions while alive
///
/// Returned by [`JobScheduler::hold_album_tree`]. `start_sync` waits until
/// every guard is dropped, so no job can start on the held tree meanwhile.
pub struct SubmissionGuard<'a> {
    _jobs: RwLockReadGuard<'a, Vec<Arc<JobEntry>>>,
}

// ============================================================================
// Scheduler
// ============================================================================

/// Runs sync jobs over subtrees of the library root
///
/// Cheap to clone; clones share the same registry and worker pool.
#[derive(Clone)]
pub struct JobScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    library_root: PathBuf,
    root_album_name: String,
    albums: Arc<dyn AlbumRepository>,
    ingestor: MediaIngestor,
    detector: MediaTypeDetector,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    permits: Arc<Semaphore>,
    /// Registry in submission order
    jobs: RwLock<Vec<Arc<JobEntry>>>,
}

impl JobScheduler {
    /// Create a scheduler
    ///
    /// # Errors
    ///
    /// Returns an error if the library root is not an existing directory, the
    /// worker pool is empty or the thumbnail settings are invalid.
    pub fn new(
        config: SyncConfig,
        albums: Arc<dyn AlbumRepository>,
        media: Arc<dyn MediaRepository>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
    ) -> Result<Self> {
        let library_root =
            std::fs::canonicalize(&config.library_root).map_err(|e| SyncError::InvalidPath {
                path: config.library_root.display().to_string(),
                reason: e.to_string(),
            })?;
        if !library_root.is_dir() {
            return Err(SyncError::InvalidPath {
                path: library_root.display().to_string(),
                reason: "library root is not a directory".to_string(),
            });
        }
        if config.worker_pool_size == 0 {
            return Err(SyncError::Config(
                "worker pool size must be at least 1".to_string(),
            ));
        }

        let ingestor = MediaIngestor::new(
            media,
            blobs,
            clock.clone(),
            event_bus.clone(),
            config.thumbnail_encoder()?,
        );

        info!(
            library_root = %library_root.display(),
            workers = config.worker_pool_size,
            "Job scheduler ready"
        );

        Ok(Self {
            inner: Arc::new(SchedulerInner {
                library_root,
                root_album_name: config.root_album_name.clone(),
                albums,
                ingestor,
                detector: config.detector(),
                clock,
                event_bus,
                permits: Arc::new(Semaphore::new(config.worker_pool_size)),
                jobs: RwLock::new(Vec::new()),
            }),
        })
    }

    /// Canonical library root
    pub fn library_root(&self) -> &Path {
        &self.inner.library_root
    }

    /// Submit a sync of the directory at `path`
    ///
    /// Relative paths are resolved against the library root. Returns as soon
    /// as the job is registered; processing happens on a worker.
    ///
    /// # Errors
    ///
    /// - [`SyncError::InvalidPath`] if the path is missing, not a directory
    ///   or outside the library root
    /// - [`SyncError::OverlappingJob`] if an active job covers the same
    ///   directory, an ancestor or a descendant
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn start_sync(&self, path: impl AsRef<Path>) -> Result<JobId> {
        let (root_dir, album_path) = self.inner.resolve(path.as_ref()).await?;

        let entry = {
            let mut jobs = self.inner.jobs.write().await;

            if let Some(active) = jobs.iter().find(|e| {
                e.current_status().is_active()
                    && (e.root_dir.starts_with(&root_dir) || root_dir.starts_with(&e.root_dir))
            }) {
                return Err(SyncError::OverlappingJob {
                    path: album_path,
                    job_id: active.id.to_string(),
                });
            }

            let job = Job::new(album_path.clone(), self.inner.clock.unix_timestamp());
            let entry = Arc::new(JobEntry::new(job, root_dir));
            jobs.push(entry.clone());
            entry
        };

        info!(job_id = %entry.id, root = %album_path, "Sync job queued");
        self.inner.emit(JobEvent::Queued {
            job_id: entry.id.to_string(),
            root_path: album_path,
        });

        let job_id = entry.id;
        tokio::spawn(self.inner.clone().run_job(entry));
        Ok(job_id)
    }

    /// Snapshot of one job
    pub async fn get_job(&self, job_id: JobId) -> Result<JobSnapshot> {
        Ok(self.inner.entry(job_id).await?.snapshot().await)
    }

    /// Snapshots of every job in submission order
    pub async fn list_jobs(&self) -> Vec<JobSnapshot> {
        let entries = self.inner.entries().await;
        let mut snapshots = Vec::with_capacity(entries.len());
        for entry in entries {
            snapshots.push(entry.snapshot().await);
        }
        snapshots
    }

    /// Snapshots of the jobs currently in `status`
    pub async fn list_jobs_by_status(&self, status: JobStatus) -> Vec<JobSnapshot> {
        let mut snapshots = Vec::new();
        for entry in self.inner.entries().await {
            let snapshot = entry.snapshot().await;
            if snapshot.status == status {
                snapshots.push(snapshot);
            }
        }
        snapshots
    }

    /// Toggle the pause flag of a job
    ///
    /// Returns `true` if the job is now set to pause and `false` if a pause
    /// was lifted. The worker observes the flag between units.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidState`] for terminal or stopping jobs.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn pause_job(&self, job_id: JobId) -> Result<bool> {
        let entry = self.inner.entry(job_id).await?;
        ensure_controllable(&entry, "pause")?;

        let paused = !entry.pause_requested();
        entry.pause.send_replace(paused);
        debug!(paused, "Pause flag toggled");
        Ok(paused)
    }

    /// Lift a pause request
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidState`] if no pause is requested or the job
    /// is terminal or stopping.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn resume_job(&self, job_id: JobId) -> Result<()> {
        let entry = self.inner.entry(job_id).await?;
        ensure_controllable(&entry, "resume")?;

        if !entry.pause_requested() {
            return Err(SyncError::InvalidState {
                job_id: job_id.to_string(),
                status: entry.current_status().as_str().to_string(),
                operation: "resume".to_string(),
            });
        }

        entry.pause.send_replace(false);
        Ok(())
    }

    /// Request a stop
    ///
    /// A no-op for jobs that already reached a terminal state. Once this
    /// returns for an active job, the job ends `Stopped`.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn stop_job(&self, job_id: JobId) -> Result<()> {
        let entry = self.inner.entry(job_id).await?;
        if !entry.request_stop().await {
            debug!("Job already finished, nothing to stop");
        }
        Ok(())
    }

    /// Request a stop for every active job
    ///
    /// Returns how many jobs received a new stop request.
    pub async fn stop_all_jobs(&self) -> usize {
        let mut stopped = 0;
        for entry in self.inner.entries().await {
            if !entry.stop_requested() && entry.request_stop().await {
                stopped += 1;
            }
        }

        info!(stopped, "Stop requested for all active jobs");
        stopped
    }

    /// Drop every terminal job from the registry
    ///
    /// Returns the number of jobs removed.
    pub async fn clear_finished_jobs(&self) -> usize {
        let mut jobs = self.inner.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|entry| entry.current_status().is_active());
        let removed = before - jobs.len();

        debug!(removed, "Cleared finished jobs");
        removed
    }

    /// Wait until the job's status satisfies `predicate`
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::JobNotFound`] for unknown ids.
    pub async fn wait_for_status(
        &self,
        job_id: JobId,
        mut predicate: impl FnMut(JobStatus) -> bool,
    ) -> Result<JobSnapshot> {
        let entry = self.inner.entry(job_id).await?;
        let mut status = entry.status.subscribe();
        // The sender lives in `entry`, which outlives this borrow.
        let _ = status.wait_for(|s| predicate(*s)).await;
        Ok(entry.snapshot().await)
    }

    /// Wait until the job reaches a terminal state
    pub async fn wait_for_job(&self, job_id: JobId) -> Result<JobSnapshot> {
        self.wait_for_status(job_id, |s| s.is_terminal()).await
    }

    /// Check that no active job touches the album tree at `album_path` and
    /// keep it that way while the returned guard lives
    ///
    /// Do not call other scheduler methods while holding the guard.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::OverlappingJob`] if an active job's root is the
    /// album, one of its ancestors or one of its descendants.
    pub async fn hold_album_tree(&self, album_path: &str) -> Result<SubmissionGuard<'_>> {
        let jobs = self.inner.jobs.read().await;

        if let Some(active) = jobs.iter().find(|e| {
            e.current_status().is_active()
                && (e.root_path == album_path
                    || is_descendant_path(&e.root_path, album_path)
                    || is_descendant_path(album_path, &e.root_path))
        }) {
            return Err(SyncError::OverlappingJob {
                path: album_path.to_string(),
                job_id: active.id.to_string(),
            });
        }

        Ok(SubmissionGuard { _jobs: jobs })
    }
}

fn ensure_controllable(entry: &JobEntry, operation: &str) -> Result<()> {
    let status = entry.current_status();
    if status.is_terminal() || entry.stop_requested() {
        let status = if status.is_terminal() {
            status.as_str()
        } else {
            "stopping"
        };
        return Err(SyncError::InvalidState {
            job_id: entry.id.to_string(),
            status: status.to_string(),
            operation: operation.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Worker
// ============================================================================

impl SchedulerInner {
    async fn entries(&self) -> Vec<Arc<JobEntry>> {
        self.jobs.read().await.clone()
    }

    async fn entry(&self, job_id: JobId) -> Result<Arc<JobEntry>> {
        self.jobs
            .read()
            .await
            .iter()
            .find(|e| e.id == job_id)
            .cloned()
            .ok_or_else(|| SyncError::JobNotFound {
                job_id: job_id.to_string(),
            })
    }

    fn emit(&self, event: JobEvent) {
        self.event_bus.emit(CoreEvent::Job(event)).ok();
    }

    /// Canonical directory and album path for a requested sync root
    async fn resolve(&self, requested: &Path) -> Result<(PathBuf, String)> {
        let invalid = |reason: &str| SyncError::InvalidPath {
            path: requested.display().to_string(),
            reason: reason.to_string(),
        };

        let candidate = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.library_root.join(requested)
        };

        let root_dir = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|_| invalid("path does not exist"))?;
        let metadata = tokio::fs::metadata(&root_dir)
            .await
            .map_err(|e| invalid(&e.to_string()))?;
        if !metadata.is_dir() {
            return Err(invalid("path is not a directory"));
        }

        let relative = root_dir
            .strip_prefix(&self.library_root)
            .map_err(|_| invalid("path is outside the library root"))?;

        let mut album_path = String::new();
        for component in relative.components() {
            let Component::Normal(name) = component else {
                return Err(invalid("path is outside the library root"));
            };
            let name = name
                .to_str()
                .ok_or_else(|| invalid("path is not valid UTF-8"))?;
            album_path.push('/');
            album_path.push_str(name);
        }
        if album_path.is_empty() {
            album_path.push_str(ROOT_ALBUM_PATH);
        }

        Ok((root_dir, album_path))
    }

    async fn run_job(self: Arc<Self>, entry: Arc<JobEntry>) {
        if let Err(e) = self.execute(&entry).await {
            error!(job_id = %entry.id, error = %e, "Job worker aborted");
            let message = e.to_string();
            let now = self.clock.unix_timestamp();
            let aborted = entry
                .update(|job| match job.status() {
                    JobStatus::Pending | JobStatus::Running => job.fail(message.clone(), now),
                    JobStatus::Paused => job.abort(message.clone(), now),
                    _ => Ok(()),
                })
                .await;
            if aborted.is_err() {
                return;
            }
            match entry.current_status() {
                JobStatus::Failed => self.emit(JobEvent::Failed {
                    job_id: entry.id.to_string(),
                    message,
                }),
                JobStatus::Stopped => {
                    // Paused jobs cannot fail; the error stays on the job.
                    warn!(job_id = %entry.id, "Paused job stopped after worker error");
                    let snapshot = entry.snapshot().await;
                    self.emit(JobEvent::Stopped {
                        job_id: entry.id.to_string(),
                        processed_tasks: snapshot.task_results.len() as u64,
                        remaining_tasks: snapshot.remaining_tasks,
                    });
                }
                _ => {}
            }
        }
    }

    #[instrument(skip(self, entry), fields(job_id = %entry.id))]
    async fn execute(&self, entry: &JobEntry) -> Result<()> {
        let mut pause = entry.pause.subscribe();

        let _permit = tokio::select! {
            biased;
            _ = entry.stop.cancelled() => return self.finish_stopped(entry).await,
            permit = self.permits.clone().acquire_owned() => permit.map_err(|_| {
                SyncError::Storage("worker pool closed".to_string())
            })?,
        };

        let now = self.clock.unix_timestamp();
        let root_path = entry
            .update(|job| {
                job.start(now)?;
                Ok(job.root_path.clone())
            })
            .await?;
        info!(root = %root_path, "Sync job started");
        self.emit(JobEvent::Started {
            job_id: entry.id.to_string(),
        });

        let mut reconciler = AlbumTreeReconciler::new(
            self.albums.clone(),
            self.root_album_name.clone(),
            self.event_bus.clone(),
        );
        let root_album = match reconciler.ensure_path(&root_path).await {
            Ok(album) => album,
            Err(e) => return self.finish_failed(entry, e).await,
        };

        let units = match self.discover(entry, &root_album).await {
            Ok(units) => units,
            Err(e) => return self.finish_failed(entry, e).await,
        };
        let total = units.len() as u64;
        entry.update(|job| job.set_total(total)).await?;
        debug!(total, "Walk finished");

        for unit in units {
            if let Checkpoint::Stop = self.checkpoint(entry, &mut pause).await? {
                return self.finish_stopped(entry).await;
            }

            let result = self.process(&mut reconciler, &unit).await;
            let outcome = result.outcome;
            let remaining = entry
                .update(|job| {
                    job.record(result)?;
                    Ok(job.remaining_tasks())
                })
                .await?;

            self.emit(JobEvent::Progress {
                job_id: entry.id.to_string(),
                item: unit.item.clone(),
                outcome: outcome.as_str().to_string(),
                total_tasks: total,
                remaining_tasks: remaining,
            });
        }

        let now = self.clock.unix_timestamp();
        let completed = entry
            .update(|job| {
                // A stop that landed during the last unit still wins
                if entry.stop_requested() {
                    return Ok(None);
                }
                job.complete(now)?;
                Ok(Some((
                    job.results().count(Outcome::Failed) as u64,
                    job.duration_secs().unwrap_or(0),
                )))
            })
            .await?;
        let Some((failed, duration_secs)) = completed else {
            return self.finish_stopped(entry).await;
        };

        info!(total, failed, duration_secs, "Sync job completed");
        self.emit(JobEvent::Completed {
            job_id: entry.id.to_string(),
            total_tasks: total,
            failed,
            duration_secs,
        });
        Ok(())
    }

    /// Walk the job's directory on a blocking thread
    async fn discover(&self, entry: &JobEntry, root_album: &Album) -> Result<Vec<WorkUnit>> {
        let root_dir = entry.root_dir.clone();
        let album_path = root_album.path.clone();
        let detector = self.detector.clone();

        tokio::task::spawn_blocking(move || walk(&root_dir, &album_path, &detector))
            .await
            .map_err(|e| SyncError::Ingestion(format!("Walk task failed: {}", e)))?
    }

    /// Safe point between units: honor stop, enter or leave a pause
    async fn checkpoint(
        &self,
        entry: &JobEntry,
        pause: &mut watch::Receiver<bool>,
    ) -> Result<Checkpoint> {
        loop {
            if entry.stop_requested() {
                return Ok(Checkpoint::Stop);
            }

            let pause_requested = *pause.borrow_and_update();
            let status = entry.current_status();

            if !pause_requested {
                if status == JobStatus::Paused {
                    entry.update(|job| job.resume()).await?;
                    info!("Sync job resumed");
                    self.emit(JobEvent::Resumed {
                        job_id: entry.id.to_string(),
                    });
                }
                return Ok(Checkpoint::Continue);
            }

            if status != JobStatus::Paused {
                let remaining = entry
                    .update(|job| {
                        job.pause()?;
                        Ok(job.remaining_tasks())
                    })
                    .await?;
                info!(remaining, "Sync job paused");
                self.emit(JobEvent::Paused {
                    job_id: entry.id.to_string(),
                    remaining_tasks: remaining,
                });
            }

            tokio::select! {
                biased;
                _ = entry.stop.cancelled() => return Ok(Checkpoint::Stop),
                changed = pause.changed() => {
                    if changed.is_err() {
                        return Ok(Checkpoint::Stop);
                    }
                }
            }
        }
    }

    /// Process one unit; every failure becomes a `failed` result
    async fn process(&self, reconciler: &mut AlbumTreeReconciler, unit: &WorkUnit) -> TaskResult {
        let started = Instant::now();

        match unit.kind {
            UnitKind::Folder => match reconciler.reconcile(&unit.album_path).await {
                Ok(Reconciled::Created(_)) => {
                    TaskResult::success(&unit.item, ItemType::Folder, started.elapsed())
                }
                Ok(Reconciled::Existing(_)) => {
                    TaskResult::skipped(&unit.item, ItemType::Folder, started.elapsed())
                }
                Err(e) => {
                    warn!(item = %unit.item, error = %e, "Folder failed");
                    TaskResult::failed(&unit.item, ItemType::Folder, e.to_string(), started.elapsed())
                }
            },
            UnitKind::File(kind) => {
                let ingested: Result<IngestOutcome> = async {
                    let album = reconciler.album_for(&unit.album_path).await?;
                    self.ingestor.ingest(&unit.path, &album, kind).await
                }
                .await;

                match ingested {
                    Ok(IngestOutcome::Unchanged) => {
                        TaskResult::skipped(&unit.item, ItemType::File, started.elapsed())
                    }
                    Ok(IngestOutcome::Ingested { warnings, .. }) => {
                        TaskResult::success(&unit.item, ItemType::File, started.elapsed())
                            .with_warnings(warnings)
                    }
                    Err(e) => {
                        warn!(item = %unit.item, error = %e, "File failed");
                        TaskResult::failed(&unit.item, ItemType::File, e.to_string(), started.elapsed())
                    }
                }
            }
        }
    }

    async fn finish_stopped(&self, entry: &JobEntry) -> Result<()> {
        let now = self.clock.unix_timestamp();
        let (processed, remaining) = entry
            .update(|job| {
                job.stop(now)?;
                Ok((job.results().len() as u64, job.remaining_tasks()))
            })
            .await?;

        info!(processed, remaining, "Sync job stopped");
        self.emit(JobEvent::Stopped {
            job_id: entry.id.to_string(),
            processed_tasks: processed,
            remaining_tasks: remaining,
        });
        Ok(())
    }

    async fn finish_failed(&self, entry: &JobEntry, cause: SyncError) -> Result<()> {
        let message = cause.to_string();
        let now = self.clock.unix_timestamp();
        entry.update(|job| job.fail(message.clone(), now)).await?;

        error!(error = %message, "Sync job failed");
        self.emit(JobEvent::Failed {
            job_id: entry.id.to_string(),
            message,
        });
        Ok(())
    }
}
