//! The concrete runner adapter.

use crate::error::{RunnerError, RunnerResult};
use crate::{Probe, RunOutput, Runner};
use async_trait::async_trait;
use echo_core::config::RunnerConfig;
use echo_core::{
    ArtifactRef, ContentHash, JobParams, Manifest, RunnerInfo, canonical_bytes, cas, sha256_hex,
};
use echo_store::{validate, write_atomic, write_canonical};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::fs;
use tokio::io::AsyncReadExt;
use uuid::Uuid;

/// Read size for file-level database hashing (1 MiB).
const DB_HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// Runner adapter: wraps a [`Probe`], stamps provenance, writes the
/// canonical artifact + manifest pair into the CAS.
pub struct EchoRunner {
    probe: Arc<dyn Probe>,
    config: RunnerConfig,
    artifact_name: String,
    manifest_name: String,
}

/// Effective per-run settings after applying `runner_kwargs` overrides.
struct RunSettings {
    schema_id: String,
    manifest_schema_id: String,
    runner_version: String,
    auto_db_hash: bool,
}

impl EchoRunner {
    /// Create a new adapter around the injected probe.
    pub fn new(
        probe: Arc<dyn Probe>,
        config: RunnerConfig,
        artifact_name: impl Into<String>,
        manifest_name: impl Into<String>,
    ) -> Self {
        Self {
            probe,
            config,
            artifact_name: artifact_name.into(),
            manifest_name: manifest_name.into(),
        }
    }

    /// Resolve schema ids, runner version and the db-hash opt-in,
    /// letting `runner_kwargs` override the configured defaults.
    fn settings(&self, kwargs: &Map<String, Value>) -> RunSettings {
        let string_override = |key: &str, default: &str| -> String {
            kwargs
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };
        RunSettings {
            schema_id: string_override("schema_id", &self.config.schema_id),
            manifest_schema_id: string_override(
                "manifest_schema_id",
                &self.config.manifest_schema_id,
            ),
            runner_version: string_override("runner_version", &self.config.runner_version),
            auto_db_hash: kwargs
                .get("auto_db_hash")
                .and_then(Value::as_bool)
                .unwrap_or(self.config.auto_db_hash),
        }
    }
}

#[async_trait]
impl Runner for EchoRunner {
    async fn run(&self, params: &JobParams) -> RunnerResult<RunOutput> {
        let features_path = std::path::absolute(&params.features_path)?;
        let out_root = std::path::absolute(&params.out_root)?;
        if !fs::try_exists(&features_path).await.unwrap_or(false) {
            return Err(RunnerError::FeaturesNotFound(features_path));
        }

        let settings = self.settings(&params.runner_kwargs);
        let db_path = match params.db_path.clone().or_else(|| self.config.db_path.clone()) {
            Some(path) => Some(std::path::absolute(path)?),
            None => None,
        };

        let track_id = params
            .effective_track_id()
            .map(str::to_string)
            .unwrap_or_else(|| features_stem(&features_path));
        let run_id = params
            .run_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // Source hash: canonical hash of the input payload itself, so
        // formatting differences in the features file do not change the
        // address.
        let features_bytes = fs::read(&features_path).await?;
        let features_obj: Value = serde_json::from_slice(&features_bytes)?;
        let source_hash = sha256_hex(&canonical_bytes(&features_obj));

        // Config hash: hash of how the result is computed, not of what.
        let config_hash = match &params.config_hash {
            Some(hash) => hash.clone(),
            None => {
                let material = json!({
                    "schema_id": settings.schema_id,
                    "manifest_schema_id": settings.manifest_schema_id,
                    "db_path": db_path.as_ref().map(|p| p.to_string_lossy().to_string()),
                    "probe_kwargs": Value::Object(params.probe_kwargs.clone()),
                });
                sha256_hex(&canonical_bytes(&material))
            }
        };

        let artifact_path =
            cas::cas_path(&out_root, &config_hash, &source_hash, &self.artifact_name);
        let manifest_path =
            cas::cas_path(&out_root, &config_hash, &source_hash, &self.manifest_name);

        // Identical inputs land on the same address. When a validating
        // pair is already there its bytes are authoritative, so the
        // probe is skipped and the stored artifact stays byte-stable
        // across resubmissions.
        let existing = validate(&artifact_path, &manifest_path).await;
        if existing.ok {
            tracing::info!(
                track_id = %track_id,
                artifact = %artifact_path.display(),
                "artifact already present, skipping probe"
            );
            return Ok(RunOutput {
                artifact: artifact_path,
                manifest: manifest_path,
            });
        }

        let db_hash = match &params.db_hash {
            Some(hash) => Some(hash.clone()),
            None if settings.auto_db_hash => match &db_path {
                Some(path) => file_sha256(path).await?,
                None => None,
            },
            None => None,
        };

        let payload = self
            .probe
            .probe(&features_path, db_path.as_deref(), &params.probe_kwargs)
            .await?;
        let mut payload = match payload {
            Value::Object(map) => map,
            other => {
                return Err(RunnerError::Probe(format!(
                    "probe returned non-object payload: {other}"
                )));
            }
        };

        // Stamp required provenance fields into the artifact.
        let generated_at = OffsetDateTime::now_utc().format(&Rfc3339)?;
        payload.insert("schema_id".to_string(), json!(settings.schema_id));
        payload.insert("track_id".to_string(), json!(track_id));
        payload.insert("run_id".to_string(), json!(run_id));
        payload.insert("source_hash".to_string(), json!(source_hash));
        payload.insert("config_hash".to_string(), json!(config_hash));
        payload.insert("db_hash".to_string(), json!(db_hash));
        payload.insert("generated_at".to_string(), json!(generated_at));

        let artifact_bytes = canonical_bytes(&Value::Object(payload));
        let artifact_sha = sha256_hex(&artifact_bytes);
        write_atomic(&artifact_path, &artifact_bytes).await?;

        let manifest = Manifest {
            schema_id: settings.manifest_schema_id,
            source_hash,
            config_hash,
            db_hash,
            runner: RunnerInfo {
                runner_name: self.config.runner_name.clone(),
                version: settings.runner_version,
                input_features_path: features_path.to_string_lossy().to_string(),
            },
            artifact: ArtifactRef {
                path: self.artifact_name.clone(),
                sha256: artifact_sha.clone(),
                etag: artifact_sha,
                size: artifact_bytes.len() as u64,
            },
        };
        let manifest_value =
            serde_json::to_value(&manifest).map_err(RunnerError::InvalidFeatures)?;
        write_canonical(&manifest_path, &manifest_value).await?;

        tracing::info!(
            track_id = %track_id,
            artifact = %artifact_path.display(),
            "artifact and manifest written"
        );

        Ok(RunOutput {
            artifact: artifact_path,
            manifest: manifest_path,
        })
    }
}

/// Default track id: the features filename without its extension.
fn features_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// File-level SHA-256 of the reference database, read incrementally.
///
/// Returns `None` when the path does not name a readable file, matching
/// the opt-in, best-effort nature of database hashing.
async fn file_sha256(path: &Path) -> RunnerResult<Option<String>> {
    let mut file = match fs::File::open(path).await {
        Ok(file) => file,
        Err(_) => return Ok(None),
    };
    let mut hasher = ContentHash::hasher();
    let mut buf = vec![0u8; DB_HASH_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Some(hasher.finalize().to_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProbe(Value);

    struct CountingProbe(AtomicUsize);

    #[async_trait]
    impl Probe for CountingProbe {
        async fn probe(
            &self,
            _features_path: &Path,
            _db_path: Option<&Path>,
            _kwargs: &Map<String, Value>,
        ) -> RunnerResult<Value> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"echo": true}))
        }
    }

    #[async_trait]
    impl Probe for FixedProbe {
        async fn probe(
            &self,
            _features_path: &Path,
            _db_path: Option<&Path>,
            _kwargs: &Map<String, Value>,
        ) -> RunnerResult<Value> {
            Ok(self.0.clone())
        }
    }

    struct FailingProbe;

    #[async_trait]
    impl Probe for FailingProbe {
        async fn probe(
            &self,
            _features_path: &Path,
            _db_path: Option<&Path>,
            _kwargs: &Map<String, Value>,
        ) -> RunnerResult<Value> {
            Err(RunnerError::Probe("spine db offline".to_string()))
        }
    }

    fn runner_with(probe: Arc<dyn Probe>) -> EchoRunner {
        EchoRunner::new(
            probe,
            RunnerConfig::default(),
            "historical_echo.json",
            "manifest.json",
        )
    }

    fn params(features: &Path, out_root: &Path) -> JobParams {
        JobParams {
            features_path: features.to_path_buf(),
            out_root: out_root.to_path_buf(),
            track_id: Some("track-1".to_string()),
            run_id: None,
            config_hash: None,
            db_path: None,
            db_hash: None,
            probe_kwargs: Map::new(),
            runner_kwargs: Map::new(),
        }
    }

    async fn write_features(dir: &Path) -> PathBuf {
        let path = dir.join("song.features.json");
        fs::write(&path, br#"{"tempo": 120, "key": "A"}"#).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_run_writes_validating_pair() {
        let dir = tempfile::tempdir().unwrap();
        let features = write_features(dir.path()).await;
        let runner = runner_with(Arc::new(FixedProbe(json!({"echo": [1, 2, 3]}))));

        let output = runner.run(&params(&features, dir.path())).await.unwrap();
        let outcome = validate(&output.artifact, &output.manifest).await;
        assert!(outcome.ok);
        assert!(outcome.etag.is_some());

        let artifact: Value =
            serde_json::from_slice(&fs::read(&output.artifact).await.unwrap()).unwrap();
        assert_eq!(artifact["echo"], json!([1, 2, 3]));
        assert_eq!(artifact["schema_id"], "historical_echo.v1");
        assert_eq!(artifact["track_id"], "track-1");
        assert!(artifact["run_id"].is_string());
        assert!(artifact["generated_at"].is_string());
        assert!(artifact["source_hash"].is_string());
        assert_eq!(
            artifact["config_hash"].as_str().unwrap(),
            output
                .artifact
                .parent()
                .unwrap()
                .parent()
                .unwrap()
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_idempotent_addressing() {
        let dir = tempfile::tempdir().unwrap();
        let features = write_features(dir.path()).await;
        let runner = runner_with(Arc::new(FixedProbe(json!({"echo": true}))));

        // No pinned run_id: the stored bytes must still be stable,
        // because the first validating pair at the address wins.
        let first = runner.run(&params(&features, dir.path())).await.unwrap();
        let first_bytes = fs::read(&first.artifact).await.unwrap();

        let second = runner.run(&params(&features, dir.path())).await.unwrap();
        let second_bytes = fs::read(&second.artifact).await.unwrap();

        assert_eq!(first.artifact, second.artifact);
        assert_eq!(first.manifest, second.manifest);
        assert_eq!(first_bytes, second_bytes);
    }

    #[tokio::test]
    async fn test_resubmission_skips_probe() {
        let dir = tempfile::tempdir().unwrap();
        let features = write_features(dir.path()).await;
        let probe = Arc::new(CountingProbe(AtomicUsize::new(0)));
        let runner = runner_with(probe.clone());

        runner.run(&params(&features, dir.path())).await.unwrap();
        runner.run(&params(&features, dir.path())).await.unwrap();
        assert_eq!(probe.0.load(Ordering::SeqCst), 1);

        // A changed configuration is a new address and probes again.
        let mut tweaked = params(&features, dir.path());
        tweaked.probe_kwargs.insert("top_k".to_string(), json!(5));
        runner.run(&tweaked).await.unwrap();
        assert_eq!(probe.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_corrupted_artifact_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let features = write_features(dir.path()).await;
        let runner = runner_with(Arc::new(FixedProbe(json!({"echo": true}))));

        let first = runner.run(&params(&features, dir.path())).await.unwrap();
        fs::write(&first.artifact, b"{\"tampered\":true}").await.unwrap();

        let second = runner.run(&params(&features, dir.path())).await.unwrap();
        let outcome = validate(&second.artifact, &second.manifest).await;
        assert!(outcome.ok);
    }

    #[tokio::test]
    async fn test_config_hash_sensitive_to_probe_kwargs() {
        let dir = tempfile::tempdir().unwrap();
        let features = write_features(dir.path()).await;
        let runner = runner_with(Arc::new(FixedProbe(json!({}))));

        let base = params(&features, dir.path());
        let mut tweaked = base.clone();
        tweaked
            .probe_kwargs
            .insert("top_k".to_string(), json!(20));

        let first = runner.run(&base).await.unwrap();
        let second = runner.run(&tweaked).await.unwrap();
        assert_ne!(first.artifact, second.artifact);
    }

    #[tokio::test]
    async fn test_supplied_config_hash_wins() {
        let dir = tempfile::tempdir().unwrap();
        let features = write_features(dir.path()).await;
        let runner = runner_with(Arc::new(FixedProbe(json!({}))));

        let mut fixed = params(&features, dir.path());
        fixed.config_hash = Some("pinnedcfg".to_string());
        let output = runner.run(&fixed).await.unwrap();
        assert!(
            output
                .artifact
                .to_string_lossy()
                .contains("/echo/pinnedcfg/")
        );
    }

    #[tokio::test]
    async fn test_probe_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let features = write_features(dir.path()).await;
        let runner = runner_with(Arc::new(FailingProbe));

        let err = runner.run(&params(&features, dir.path())).await.unwrap_err();
        assert!(err.to_string().contains("spine db offline"));
    }

    #[tokio::test]
    async fn test_missing_features_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_with(Arc::new(FixedProbe(json!({}))));

        let missing = dir.path().join("absent.features.json");
        let err = runner.run(&params(&missing, dir.path())).await.unwrap_err();
        assert!(matches!(err, RunnerError::FeaturesNotFound(_)));
    }

    #[tokio::test]
    async fn test_auto_db_hash_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        let features = write_features(dir.path()).await;
        let db_path = dir.path().join("echo.db");
        fs::write(&db_path, b"reference database bytes").await.unwrap();

        let runner = runner_with(Arc::new(FixedProbe(json!({}))));

        // Separate roots: the opt-in changes the bytes but not the
        // address, so sharing a root would reuse the first artifact.
        let root_without = dir.path().join("without");
        let root_with = dir.path().join("with");

        // Without the opt-in, db_hash stays null.
        let mut without = params(&features, &root_without);
        without.db_path = Some(db_path.clone());
        let output = runner.run(&without).await.unwrap();
        let artifact: Value =
            serde_json::from_slice(&fs::read(&output.artifact).await.unwrap()).unwrap();
        assert!(artifact["db_hash"].is_null());

        // With the opt-in, it is the file-level digest.
        let mut with = params(&features, &root_with);
        with.db_path = Some(db_path);
        with.runner_kwargs
            .insert("auto_db_hash".to_string(), json!(true));
        let output = runner.run(&with).await.unwrap();
        let artifact: Value =
            serde_json::from_slice(&fs::read(&output.artifact).await.unwrap()).unwrap();
        assert_eq!(
            artifact["db_hash"].as_str().unwrap(),
            sha256_hex(b"reference database bytes")
        );
    }

    #[tokio::test]
    async fn test_track_id_defaults_to_features_stem() {
        let dir = tempfile::tempdir().unwrap();
        let features = write_features(dir.path()).await;
        let runner = runner_with(Arc::new(FixedProbe(json!({}))));

        let mut anonymous = params(&features, dir.path());
        anonymous.track_id = None;
        let output = runner.run(&anonymous).await.unwrap();
        let artifact: Value =
            serde_json::from_slice(&fs::read(&output.artifact).await.unwrap()).unwrap();
        assert_eq!(artifact["track_id"], "song.features");
    }
}
