//! Job queue and the single background worker.
//!
//! `submit` returns immediately; exactly one worker task executes jobs
//! in FIFO order so the domain runner never runs concurrently with
//! itself. The registry mutex guards both reads and writes, and every
//! mutation is a whole-record replacement, so readers never observe a
//! torn update.

use crate::metrics;
use echo_core::{JobParams, JobRecord, JobResult, JobStatus};
use echo_runner::Runner;
use echo_store::{validate, write_pointer};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

type JobRegistry = Arc<Mutex<HashMap<Uuid, JobRecord>>>;

struct QueuedJob {
    job_id: Uuid,
    params: JobParams,
}

/// Single-worker FIFO job queue.
///
/// Owns the registry explicitly (constructor-injected into the shared
/// state) so multiple brokers can coexist in tests without shared
/// mutable state.
pub struct JobQueue {
    jobs: JobRegistry,
    tx: mpsc::UnboundedSender<QueuedJob>,
}

impl JobQueue {
    /// Create a queue and spawn its worker task.
    ///
    /// The worker holds only the registry and the runner, not the queue
    /// itself, and exits when the queue (and with it the sender) is
    /// dropped.
    pub fn new(
        runner: Arc<dyn Runner>,
        artifact_name: impl Into<String>,
        manifest_name: impl Into<String>,
    ) -> Self {
        let jobs: JobRegistry = Arc::new(Mutex::new(HashMap::new()));
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = Worker {
            jobs: jobs.clone(),
            runner,
            artifact_name: artifact_name.into(),
            manifest_name: manifest_name.into(),
        };
        tokio::spawn(worker.run(rx));

        Self { jobs, tx }
    }

    /// Register a job and enqueue it. Never blocks on the computation.
    pub async fn submit(&self, params: JobParams) -> Uuid {
        let job_id = Uuid::new_v4();
        self.jobs.lock().await.insert(job_id, JobRecord::pending());

        metrics::JOBS_SUBMITTED.inc();
        metrics::QUEUE_DEPTH.inc();
        tracing::info!(
            job_id = %job_id,
            features = %params.features_path.display(),
            track_id = params.track_id.as_deref().unwrap_or(""),
            config_hash = params.config_hash.as_deref().unwrap_or(""),
            "job submitted"
        );

        if self.tx.send(QueuedJob { job_id, params }).is_err() {
            // Worker task is gone; the job can never run. The depth
            // gauge is balanced here since the worker will never see
            // this job.
            set_error(&self.jobs, job_id, "worker unavailable".to_string()).await;
            metrics::QUEUE_DEPTH.dec();
            metrics::JOBS_FAILED.inc();
        }
        job_id
    }

    /// Look up a job record. `None` for unknown ids.
    pub async fn get(&self, job_id: Uuid) -> Option<JobRecord> {
        self.jobs.lock().await.get(&job_id).cloned()
    }
}

struct Worker {
    jobs: JobRegistry,
    runner: Arc<dyn Runner>,
    artifact_name: String,
    manifest_name: String,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<QueuedJob>) {
        while let Some(item) = rx.recv().await {
            self.process(item).await;
            metrics::QUEUE_DEPTH.dec();
        }
    }

    async fn process(&self, item: QueuedJob) {
        let QueuedJob { job_id, params } = item;

        set_status(&self.jobs, job_id, JobStatus::Running).await;
        tracing::info!(
            job_id = %job_id,
            track_id = params.track_id.as_deref().unwrap_or(""),
            "job started"
        );

        let output = match self.runner.run(&params).await {
            Ok(output) => output,
            Err(e) => {
                // Stored verbatim; the broker itself must never crash
                // from a runner failure.
                tracing::error!(job_id = %job_id, error = %e, "runner failed");
                set_error(&self.jobs, job_id, e.to_string()).await;
                metrics::JOBS_FAILED.inc();
                return;
            }
        };

        let outcome = validate(&output.artifact, &output.manifest).await;
        if !outcome.ok {
            tracing::error!(
                job_id = %job_id,
                artifact = %output.artifact.display(),
                "validation failed after write"
            );
            set_error(
                &self.jobs,
                job_id,
                "validation_failed: hash_mismatch".to_string(),
            )
            .await;
            metrics::JOBS_FAILED.inc();
            return;
        }

        if let (Some(track_id), Some(etag)) = (params.effective_track_id(), &outcome.etag) {
            if let Err(e) = self
                .write_pointer_for(&params, track_id, etag, &output.manifest)
                .await
            {
                tracing::error!(job_id = %job_id, error = %e, "index pointer write failed");
                set_error(&self.jobs, job_id, e.to_string()).await;
                metrics::JOBS_FAILED.inc();
                return;
            }
        }

        let result = JobResult {
            artifact_path: output.artifact.to_string_lossy().to_string(),
            manifest_path: output.manifest.to_string_lossy().to_string(),
            etag: outcome.etag.clone(),
        };
        tracing::info!(
            job_id = %job_id,
            track_id = params.track_id.as_deref().unwrap_or(""),
            etag = outcome.etag.as_deref().unwrap_or(""),
            artifact = %result.artifact_path,
            "job done"
        );
        set_done(&self.jobs, job_id, result).await;
        metrics::JOBS_COMPLETED.inc();
    }

    /// Derive the CAS coordinates from the manifest's parent directory
    /// names and write the "latest" pointer for the track.
    async fn write_pointer_for(
        &self,
        params: &JobParams,
        track_id: &str,
        etag: &str,
        manifest_path: &std::path::Path,
    ) -> Result<(), echo_store::StoreError> {
        let source_dir = manifest_path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string());
        let config_dir = manifest_path
            .parent()
            .and_then(|p| p.parent())
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string());

        let (Some(source_hash), Some(config_hash)) = (source_dir, config_dir) else {
            return Err(echo_store::StoreError::NotFound(format!(
                "malformed manifest path: {}",
                manifest_path.display()
            )));
        };

        write_pointer(
            &params.out_root,
            track_id,
            &config_hash,
            &source_hash,
            etag,
            &self.artifact_name,
            &self.manifest_name,
        )
        .await?;
        Ok(())
    }
}

/// Replace a job's status, never leaving a terminal state.
async fn set_status(jobs: &JobRegistry, job_id: Uuid, status: JobStatus) {
    let mut jobs = jobs.lock().await;
    if let Some(record) = jobs.get_mut(&job_id) {
        if !record.status.is_terminal() {
            record.status = status;
        }
    }
}

async fn set_error(jobs: &JobRegistry, job_id: Uuid, error: String) {
    let mut jobs = jobs.lock().await;
    if let Some(record) = jobs.get_mut(&job_id) {
        if !record.status.is_terminal() {
            record.status = JobStatus::Error;
            record.error = Some(error);
        }
    }
}

async fn set_done(jobs: &JobRegistry, job_id: Uuid, result: JobResult) {
    let mut jobs = jobs.lock().await;
    if let Some(record) = jobs.get_mut(&job_id) {
        if !record.status.is_terminal() {
            record.status = JobStatus::Done;
            record.result = Some(result);
        }
    }
}
