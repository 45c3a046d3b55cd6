//! Folders and the built-in virtual views.
//!
//! Only user folders are persisted. The All/Pinned/Recently Deleted views
//! exist purely as [`FolderSelector`] variants so they can never collide
//! with, or be shadowed by, a stored record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display name of the view holding every live milestone.
pub const ALL_FOLDER_NAME: &str = "All Milestones";
/// Display name of the view holding pinned live milestones.
pub const PINNED_FOLDER_NAME: &str = "Pinned";
/// Display name of the view holding soft-deleted milestones.
pub const DELETED_FOLDER_NAME: &str = "Recently Deleted";

/// Represents a user-created folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    /// Unique identifier for the folder
    pub id: Uuid,
    /// Folder display name, unique among user folders ignoring case
    pub name: String,
    /// Position in the folder list, assigned at creation time
    pub sort_order: u32,
    /// When the folder was created
    pub created_at: DateTime<Utc>,
}

impl Folder {
    /// Creates a new folder with the given name and list position
    pub fn new(name: String, sort_order: u32) -> Self {
        Folder {
            id: Uuid::new_v4(),
            name,
            sort_order,
            created_at: Utc::now(),
        }
    }
}

/// Identifies which folder view a listing runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderSelector {
    /// Every milestone that is not soft-deleted.
    All,
    /// Pinned milestones that are not soft-deleted.
    Pinned,
    /// Soft-deleted milestones only.
    Deleted,
    /// A user folder, by id.
    User(Uuid),
}

impl FolderSelector {
    /// Maps the built-in view names and their short CLI forms to a
    /// selector. Returns `None` for anything that should resolve to a
    /// user folder instead.
    pub fn from_view_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "all" => Some(FolderSelector::All),
            "pinned" => Some(FolderSelector::Pinned),
            "deleted" | "trash" => Some(FolderSelector::Deleted),
            lowered if lowered == ALL_FOLDER_NAME.to_lowercase() => Some(FolderSelector::All),
            lowered if lowered == DELETED_FOLDER_NAME.to_lowercase() => {
                Some(FolderSelector::Deleted)
            }
            _ => None,
        }
    }
}

/// True when `name` would collide with a built-in view and therefore
/// cannot be used for a user folder. The comparison ignores case and
/// surrounding whitespace.
pub fn is_reserved_folder_name(name: &str) -> bool {
    FolderSelector::from_view_name(name).is_some()
}

/// Which kind of row a folder overview entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderKind {
    All,
    Pinned,
    User,
    Deleted,
}

/// One row of the folder overview: a view or user folder plus how many
/// milestones it currently shows.
#[derive(Debug, Clone, Serialize)]
pub struct FolderOverview {
    /// Display name of the view or folder
    pub name: String,
    /// Whether this row is a built-in view or a user folder
    pub kind: FolderKind,
    /// Number of milestones the view currently shows
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_names_resolve_ignoring_case() {
        assert_eq!(FolderSelector::from_view_name("ALL"), Some(FolderSelector::All));
        assert_eq!(
            FolderSelector::from_view_name("recently deleted"),
            Some(FolderSelector::Deleted)
        );
        assert_eq!(
            FolderSelector::from_view_name("  Pinned "),
            Some(FolderSelector::Pinned)
        );
        assert_eq!(FolderSelector::from_view_name("Work"), None);
    }

    #[test]
    fn trash_is_a_shorthand_for_deleted() {
        assert_eq!(
            FolderSelector::from_view_name("trash"),
            Some(FolderSelector::Deleted)
        );
    }

    #[test]
    fn reserved_names_are_blocked_ignoring_case() {
        assert!(is_reserved_folder_name("All Milestones"));
        assert!(is_reserved_folder_name("recently DELETED"));
        assert!(is_reserved_folder_name(" pinned"));
        assert!(!is_reserved_folder_name("Deadlines"));
        assert!(!is_reserved_folder_name("All My Milestones"));
    }

    #[test]
    fn new_folder_carries_name_and_position() {
        let folder = Folder::new("Trips".to_string(), 3);
        assert_eq!(folder.name, "Trips");
        assert_eq!(folder.sort_order, 3);
    }
}
