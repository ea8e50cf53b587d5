//! Filesystem layer for the content-addressed artifact store.
//!
//! This crate owns every byte that touches the CAS root:
//! - Atomic canonical-JSON writes (temp file + rename)
//! - Artifact/manifest validation against the recorded hash
//! - Index pointer read/write

pub mod error;
pub mod pointer;
pub mod validate;
pub mod write;

pub use error::{StoreError, StoreResult};
pub use pointer::{read_pointer, write_pointer};
pub use validate::{Validation, validate};
pub use write::{write_atomic, write_canonical};
