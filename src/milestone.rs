//! Core milestone record for the mstone application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a single dated milestone in our system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    /// Unique identifier for the milestone
    pub id: Uuid,
    /// Owning user folder, if any. Detached milestones still appear in
    /// the All Milestones view.
    pub folder_id: Option<Uuid>,
    /// Milestone title
    pub title: String,
    /// Optional free-form remark shown under the title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    /// The date the milestone counts toward (or since)
    pub date: DateTime<Utc>,
    /// Pinned milestones sort ahead of everything else
    #[serde(default)]
    pub pinned: bool,
    /// Set when the milestone is moved to Recently Deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// When the milestone was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Milestone {
    /// Creates a new live, unpinned milestone with the given title and date
    pub fn new(title: String, date: DateTime<Utc>, folder_id: Option<Uuid>) -> Self {
        let now = Utc::now();

        Milestone {
            id: Uuid::new_v4(),
            folder_id,
            title,
            remark: None,
            date,
            pinned: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when the milestone sits in Recently Deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Leading id segment used in listings; any unique prefix resolves back.
    pub fn short_id(&self) -> String {
        self.id.to_string()[..8].to_string()
    }
}
