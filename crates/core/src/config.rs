//! Configuration types shared across crates.

use crate::{DEFAULT_ARTIFACT_NAME, DEFAULT_MANIFEST_NAME};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cas: CasConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
}

impl AppConfig {
    /// Create a test configuration rooted at the given directory.
    ///
    /// **For testing only.**
    pub fn for_testing(cas_root: impl Into<PathBuf>) -> Self {
        Self {
            server: ServerConfig {
                metrics_enabled: false,
                ..Default::default()
            },
            cas: CasConfig {
                root: cas_root.into(),
                ..Default::default()
            },
            runner: RunnerConfig::default(),
        }
    }
}

/// HTTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8099").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

/// Content-addressed storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CasConfig {
    /// Root directory of the content-addressed layout.
    #[serde(default = "default_cas_root")]
    pub root: PathBuf,
    /// Artifact filename inside each CAS directory.
    #[serde(default = "default_artifact_name")]
    pub artifact_name: String,
    /// Manifest filename inside each CAS directory.
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,
}

/// Runner adapter configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Schema id stamped into artifacts.
    #[serde(default = "default_schema_id")]
    pub schema_id: String,
    /// Schema id stamped into manifests.
    #[serde(default = "default_manifest_schema_id")]
    pub manifest_schema_id: String,
    /// Runner name recorded in manifests.
    #[serde(default = "default_runner_name")]
    pub runner_name: String,
    /// Runner version recorded in manifests.
    #[serde(default = "default_runner_version")]
    pub runner_version: String,
    /// Default auxiliary reference database, if any.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// Compute a file-level hash of the reference database when the job
    /// does not supply one. May be slow on large databases.
    #[serde(default)]
    pub auto_db_hash: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8099".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_cas_root() -> PathBuf {
    PathBuf::from("data/echo_cas")
}

fn default_artifact_name() -> String {
    DEFAULT_ARTIFACT_NAME.to_string()
}

fn default_manifest_name() -> String {
    DEFAULT_MANIFEST_NAME.to_string()
}

fn default_schema_id() -> String {
    "historical_echo.v1".to_string()
}

fn default_manifest_schema_id() -> String {
    "historical_echo_manifest.v1".to_string()
}

fn default_runner_name() -> String {
    "historical_echo_runner".to_string()
}

fn default_runner_version() -> String {
    "unversioned".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl Default for CasConfig {
    fn default() -> Self {
        Self {
            root: default_cas_root(),
            artifact_name: default_artifact_name(),
            manifest_name: default_manifest_name(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            schema_id: default_schema_id(),
            manifest_schema_id: default_manifest_schema_id(),
            runner_name: default_runner_name(),
            runner_version: default_runner_version(),
            db_path: None,
            auto_db_hash: false,
        }
    }
}
