// src/watch/mod.rs

//! File watching.
//!
//! This module is responsible for:
//! - Compiling each watch rule's `files` / `exclude` globs.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//!
//! It does **not** debounce or run anything; it only turns filesystem
//! changes into [`crate::engine::LoopEvent::Changed`] for the watch loop.

pub mod event_handler;
pub mod patterns;
pub mod watcher;

pub use event_handler::{pipelines_for_path, relative_str};
pub use patterns::{build_profiles, WatchProfile};
pub use watcher::{spawn_watcher, WatcherHandle};
