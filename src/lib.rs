//! Milestone countdown tracking library
//!
//! This library provides functionality for creating, organizing and
//! tracking dated milestones: folders with built-in virtual views,
//! soft deletion with restore and purge, fuzzy search, and full
//! ZIP backups of the data set.

mod cli;
mod config;
mod errors;
mod folder;
mod helper;
mod milestone;
mod ordering;
mod storage;
mod types;

// Re-export key components
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use folder::*;
pub use helper::*;
pub use milestone::*;
pub use ordering::*;
pub use storage::*;
pub use types::*;
