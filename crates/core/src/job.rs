//! Job lifecycle types.
//!
//! Jobs are ephemeral and in-memory: created on submission, mutated only
//! by the queue's worker, discarded on process restart.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Job state machine: `pending -> running -> {done | error}`.
///
/// Terminal states never transition again; a failed job is not retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Error,
}

impl JobStatus {
    /// String form used in HTTP bodies and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// Successful job output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobResult {
    pub artifact_path: String,
    pub manifest_path: String,
    pub etag: Option<String>,
}

/// One job's externally visible record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobRecord {
    pub status: JobStatus,
    pub error: Option<String>,
    pub result: Option<JobResult>,
}

impl JobRecord {
    /// Fresh record as inserted at submission time.
    pub fn pending() -> Self {
        Self {
            status: JobStatus::Pending,
            error: None,
            result: None,
        }
    }
}

/// Everything a runner needs to produce one artifact.
#[derive(Clone, Debug)]
pub struct JobParams {
    /// Input feature payload (must exist at submission time).
    pub features_path: PathBuf,
    /// CAS root the artifact and manifest are written under.
    pub out_root: PathBuf,
    pub track_id: Option<String>,
    pub run_id: Option<String>,
    /// Caller-supplied config hash; derived from the probe configuration
    /// when absent.
    pub config_hash: Option<String>,
    pub db_path: Option<PathBuf>,
    pub db_hash: Option<String>,
    /// Opaque options forwarded to the probe.
    pub probe_kwargs: Map<String, Value>,
    /// Runner-level overrides (schema ids, version, auto_db_hash).
    pub runner_kwargs: Map<String, Value>,
}

impl JobParams {
    /// Track id carried by this job, if non-empty.
    pub fn effective_track_id(&self) -> Option<&str> {
        self.track_id.as_deref().filter(|id| !id.is_empty())
    }
}
