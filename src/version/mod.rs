// src/version/mod.rs

//! Cross-file version synchronization.

pub mod bump;
pub mod sync;

pub use bump::{next_version, parse_version, ReleaseKind, VersionRequest};
pub use sync::{BumpReport, FileReport, VersionRule, VersionSynchronizer};
