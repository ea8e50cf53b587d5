//! Core domain types and shared logic for the echo artifact broker.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Canonical JSON serialization and SHA-256 hashing
//! - Content-addressed path layout
//! - Manifest structure
//! - Index pointer records
//! - Job lifecycle types
//! - Configuration types

pub mod canon;
pub mod cas;
pub mod config;
pub mod error;
pub mod hash;
pub mod job;
pub mod manifest;
pub mod pointer;

pub use canon::{canonical_bytes, sha256_hex};
pub use cas::{artifact_url, cas_path, index_path, is_safe_segment, is_safe_track_id};
pub use config::{AppConfig, CasConfig, RunnerConfig, ServerConfig};
pub use error::{Error, Result};
pub use hash::{ContentHash, ContentHasher};
pub use job::{JobParams, JobRecord, JobResult, JobStatus};
pub use manifest::{ArtifactRef, Manifest, RunnerInfo};
pub use pointer::IndexPointer;

/// Default artifact filename inside a CAS directory.
pub const DEFAULT_ARTIFACT_NAME: &str = "historical_echo.json";

/// Default manifest filename inside a CAS directory.
pub const DEFAULT_MANIFEST_NAME: &str = "manifest.json";

/// Path prefix for all content-addressed objects, relative to the CAS root.
pub const CAS_PREFIX: &str = "echo";
