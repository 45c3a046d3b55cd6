use std::{fs, path::Path};

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use log::{debug, error, trace};

use crate::{Folder, FolderSelector, Milestone, MsError, Result};

/// Helper method to load a single milestone from file
pub fn load_milestone_from_file(path: &Path) -> Result<Milestone> {
    debug!("Loading milestone from file: {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| {
        error!("Failed to open milestone file {}: {}", path.display(), e);
        MsError::Io(e)
    })?;

    let milestone: Milestone = serde_json::from_str(&content)?;

    // Validate milestone
    if milestone.title.trim().is_empty() {
        let error_mgs = format!("Milestone from {} has an empty title", path.display());
        error!("{}", error_mgs);
        return Err(MsError::InvalidFormat { message: error_mgs });
    }

    trace!("Successfully loaded milestone: {}", milestone.id);
    Ok(milestone)
}

/// Helper method to load a single folder from file
pub fn load_folder_from_file(path: &Path) -> Result<Folder> {
    debug!("Loading folder from file: {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| {
        error!("Failed to open folder file {}: {}", path.display(), e);
        MsError::Io(e)
    })?;

    let folder: Folder = serde_json::from_str(&content)?;

    // Validate folder
    if folder.name.trim().is_empty() {
        let error_mgs = format!("Folder from {} has an empty name", path.display());
        error!("{}", error_mgs);
        return Err(MsError::InvalidFormat { message: error_mgs });
    }

    trace!("Successfully loaded folder: {}", folder.id);
    Ok(folder)
}

/// Parses a user-supplied date argument.
///
/// Accepts a plain `YYYY-MM-DD`, taken as midnight in the local time
/// zone, or a full RFC 3339 timestamp. A calendar date that does not
/// exist locally (a DST gap swallowing midnight) is rejected rather
/// than silently shifted.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let midnight = date.and_time(NaiveTime::MIN);
        return Local
            .from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| MsError::InvalidDate {
                input: input.to_string(),
            });
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| MsError::InvalidDate {
            input: input.to_string(),
        })
}

/// Resolves a CLI folder argument to a selector.
///
/// Built-in view names win over user folders; anything else must match
/// a user folder name, ignoring case.
pub fn resolve_selector(input: &str, folders: &[Folder]) -> Result<FolderSelector> {
    if let Some(selector) = FolderSelector::from_view_name(input) {
        return Ok(selector);
    }

    let lowered = input.trim().to_lowercase();
    folders
        .iter()
        .find(|f| f.name.to_lowercase() == lowered)
        .map(|f| FolderSelector::User(f.id))
        .ok_or_else(|| MsError::FolderNotFound {
            name: input.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use chrono::Datelike;

    use super::*;

    #[test]
    fn plain_date_lands_on_local_midnight() {
        let parsed = parse_date("2025-03-15").expect("parse plain date");
        let local = parsed.with_timezone(&Local);

        assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
        assert_eq!(local.time(), NaiveTime::MIN);
    }

    #[test]
    fn rfc3339_keeps_the_exact_instant() {
        let parsed = parse_date("2025-02-20T18:30:00+02:00").expect("parse rfc3339");
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 2, 20, 16, 30, 0).unwrap());
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let parsed = parse_date("  2025-01-02  ").expect("parse padded date");
        assert_eq!(parsed.with_timezone(&Local).day(), 2);
    }

    #[test]
    fn garbage_dates_are_rejected() {
        assert!(parse_date("someday").is_err());
        assert!(parse_date("2025-13-40").is_err());
        assert!(parse_date("20-02-2025").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn selector_prefers_views_over_folders() {
        let folders = vec![Folder::new("Work".to_string(), 1)];

        assert_eq!(
            resolve_selector("all", &folders).expect("resolve all"),
            FolderSelector::All
        );
        assert_eq!(
            resolve_selector("deleted", &folders).expect("resolve deleted"),
            FolderSelector::Deleted
        );
    }

    #[test]
    fn selector_finds_user_folders_ignoring_case() {
        let folder = Folder::new("Work".to_string(), 1);
        let id = folder.id;

        let resolved = resolve_selector("wOrK", &[folder]).expect("resolve folder");
        assert_eq!(resolved, FolderSelector::User(id));
    }

    #[test]
    fn unknown_folder_names_error() {
        assert!(matches!(
            resolve_selector("nope", &[]),
            Err(MsError::FolderNotFound { .. })
        ));
    }
}
