//! Core shared types for the mstone application.
//!
//! This module contains the Result alias, the CLI command surface, and
//! the summary types returned by bulk operations.
use std::path::PathBuf;

use clap::Subcommand;

use crate::MsError;

/// A specialized Result type for mstone operations.
pub type Result<T> = std::result::Result<T, MsError>;

/// Summary of a backup restoration operation
#[derive(Debug, Clone)]
pub struct RestoreBackupSummary {
    /// Path to the backup file that was restored
    pub backup_file: PathBuf,
    /// Total number of records found in the backup
    pub total_records: usize,
    /// Number of records successfully restored
    pub restored: usize,
    /// Number of records skipped (e.g., already present with overwrite disabled)
    pub skipped: usize,
    /// Details about records that failed to restore
    pub failed: Vec<(String, String)>, // (entry_name, error_message)
}

/// Available subcommands for the mstone application
#[derive(Subcommand)]
pub enum Commands {
    /// Add a new milestone
    Add {
        /// Title of the milestone
        title: String,

        /// Target date (YYYY-MM-DD, or RFC 3339 for an exact instant)
        #[clap(short, long)]
        date: String,

        /// Free-form remark shown under the title
        #[clap(short, long)]
        remark: Option<String>,

        /// Folder to file the milestone under
        #[clap(short, long)]
        folder: Option<String>,

        /// Pin the milestone to the top of its list
        #[clap(short, long)]
        pin: bool,
    },

    /// View a milestone by id
    View {
        /// Milestone id (a unique prefix is enough)
        id: String,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// List milestones in a folder view
    List {
        /// View to list: all, pinned, deleted, or a folder name
        #[clap(default_value = "all")]
        folder: String,

        /// Limit the number of milestones returned (0 shows everything)
        #[clap(short = 'n', long, default_value_t = 0)]
        limit: usize,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,

        /// Only show ids, day counts and titles
        #[clap(short, long)]
        brief: bool,
    },

    /// Search milestones by title or remark
    Search {
        /// Search query text
        query: String,

        /// Limit the number of search results
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Edit an existing milestone
    Edit {
        /// Milestone id (a unique prefix is enough)
        id: String,

        /// New title for the milestone
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// New target date (YYYY-MM-DD or RFC 3339)
        #[clap(short, long)]
        date: Option<String>,

        /// New remark for the milestone
        #[clap(short, long)]
        remark: Option<String>,

        /// Remove the existing remark
        #[clap(long, conflicts_with = "remark")]
        clear_remark: bool,
    },

    /// Pin a milestone to the top of its list
    Pin {
        /// Milestone id (a unique prefix is enough)
        id: String,
    },

    /// Remove a milestone's pin
    Unpin {
        /// Milestone id (a unique prefix is enough)
        id: String,
    },

    /// Move a milestone into a folder, restoring it if deleted
    Move {
        /// Milestone id (a unique prefix is enough)
        id: String,

        /// Destination folder name, or "none" to leave it unfiled
        folder: String,
    },

    /// Move a milestone to Recently Deleted
    Delete {
        /// Milestone id (a unique prefix is enough)
        id: String,
    },

    /// Bring a milestone back from Recently Deleted
    Restore {
        /// Milestone id (a unique prefix is enough)
        id: String,

        /// Folder to restore into (unfiled when omitted)
        #[clap(short, long)]
        folder: Option<String>,
    },

    /// Permanently remove soft-deleted milestones
    Purge {
        /// Milestone id (a unique prefix is enough)
        #[clap(required_unless_present = "all")]
        id: Option<String>,

        /// Purge everything in Recently Deleted
        #[clap(long, conflicts_with = "id")]
        all: bool,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Folder operations
    Folder {
        #[clap(subcommand)]
        command: FolderCommands,
    },

    /// Create a backup of all milestones and folders
    Backup {
        /// Path for the backup file (default uses config setting)
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Restore milestones and folders from a backup archive
    RestoreBackup {
        /// Path to the backup file
        backup_file: PathBuf,

        /// Overwrite records that already exist
        #[clap(long)]
        overwrite: bool,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,

        /// Update a configuration setting (key=value)
        #[clap(short, long)]
        set: Option<String>,

        /// Reset configuration to defaults
        #[clap(short, long)]
        reset: bool,
    },
}

/// Folder subcommands
#[derive(Subcommand)]
pub enum FolderCommands {
    /// Create a new folder
    Add {
        /// Name of the folder
        name: String,
    },

    /// List the built-in views and user folders with counts
    List {
        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Rename a folder
    Rename {
        /// Current folder name
        name: String,

        /// New folder name
        new_name: String,
    },

    /// Delete a folder, moving its milestones to Recently Deleted
    Delete {
        /// Name of the folder
        name: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },
}
