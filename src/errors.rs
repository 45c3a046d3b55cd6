//! Error types for the mstone application.
//!
//! This module defines custom error types that categorize different failures
//! that can occur during milestone and folder management operations.

use std::{io, path::PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// The main error type for the mstone application.
#[derive(Error, Debug)]
pub enum MsError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Errors related to zip operations.
    #[error("Zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// Milestone was not found when performing an operation.
    #[error("Milestone not found: {id}")]
    MilestoneNotFound { id: String },

    /// An id prefix matched more than one milestone.
    #[error("Milestone id prefix '{prefix}' is ambiguous ({count} matches)")]
    AmbiguousId { prefix: String, count: usize },

    /// Milestone titles must contain at least one non-whitespace character.
    #[error("Milestone title must not be empty")]
    EmptyTitle,

    /// Operation requires a milestone that is still live.
    #[error("Milestone {id} is already in Recently Deleted")]
    AlreadyDeleted { id: Uuid },

    /// Operation requires a milestone that sits in Recently Deleted.
    #[error("Milestone {id} is not in Recently Deleted; delete it first")]
    NotDeleted { id: Uuid },

    /// Folder was not found by name or id.
    #[error("Folder not found: {name}")]
    FolderNotFound { name: String },

    /// Another folder already carries this name (comparison ignores case).
    #[error("Folder name already in use: {name}")]
    FolderNameTaken { name: String },

    /// The name collides with one of the built-in views.
    #[error("'{name}' is a reserved folder name")]
    ReservedFolderName { name: String },

    /// Folder names must contain at least one non-whitespace character.
    #[error("Folder name must not be empty")]
    EmptyFolderName,

    /// A date argument could not be parsed.
    #[error("Invalid date '{input}': expected YYYY-MM-DD or an RFC 3339 timestamp")]
    InvalidDate { input: String },

    /// Invalid record format or content on disk.
    #[error("Invalid record format: {message}")]
    InvalidFormat { message: String },

    /// Errors related to backup operations.
    #[error("Backup failed: {message}")]
    BackupFailed { message: String },

    /// Error when attempting to restore from backup.
    #[error("Restore failed: {message}")]
    RestoreFailed { message: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// Generic application error with a custom message.
    #[error("{message}")]
    ApplicationError { message: String },

    /// for mutex lock acquisition issues
    #[error("{message}")]
    LockAcquisitionFailed { message: String },
}
