use std::{
    cmp::{Ordering, Reverse},
    collections::{BinaryHeap, HashMap, HashSet},
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::SystemTime,
};

use chrono::{DateTime, Utc};
use log::{debug, error, info, trace, warn};
use tempfile::NamedTempFile;
use uuid::Uuid;
use walkdir::WalkDir;
use zip::{write::FileOptions, ZipArchive, ZipWriter};

use crate::{
    is_reserved_folder_name, load_folder_from_file, load_milestone_from_file, ordering, Config,
    Folder, FolderKind, FolderOverview, FolderSelector, Milestone, MsError, RestoreBackupSummary,
    Result, ALL_FOLDER_NAME, DELETED_FOLDER_NAME, PINNED_FOLDER_NAME,
};

/// Prefix shared by all full backup archives.
const BACKUP_FILE_PREFIX: &str = "mstone_backup_";

/// Manages the storage, retrieval, and lifecycle of milestones and folders.
///
/// Records live as one JSON file each under the data directory, with an
/// in-memory cache in front. Milestones are sharded into subdirectories
/// by the first two characters of their id; folders are few enough to
/// stay flat.
pub struct MilestoneStorage {
    /// Application configuration
    config: Config,

    /// In-memory cache of milestones, indexed by id
    milestones: Arc<Mutex<HashMap<Uuid, Milestone>>>,

    /// In-memory cache of folders, indexed by id
    folders: Arc<Mutex<HashMap<Uuid, Folder>>>,

    /// Flag indicating if the storage system is ready
    initialized: bool,
}

impl MilestoneStorage {
    /// Creates a new MilestoneStorage instance with the provided configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            milestones: Arc::new(Mutex::new(HashMap::new())),
            folders: Arc::new(Mutex::new(HashMap::new())),
            initialized: false,
        }
    }

    /// Initializes the storage system: ensures the data and backup
    /// directories exist and loads all records into the caches.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        info!(
            "Initializing MilestoneStorage with config: data_dir={}, backup_dir={}",
            self.config.data_dir.display(),
            self.config.backup_dir.display()
        );

        for dir in [
            self.milestones_dir(),
            self.folders_dir(),
            self.config.backup_dir.clone(),
        ] {
            if !dir.exists() {
                debug!("Creating directory: {}", dir.display());
                fs::create_dir_all(&dir).map_err(|e| {
                    error!("Failed to create directory {}: {}", dir.display(), e);
                    MsError::DirectoryError { path: dir.clone() }
                })?;
            }
        }

        let (milestones, folders) = self.load_records()?;
        info!("Loaded {} milestones and {} folders", milestones, folders);

        self.initialized = true;
        Ok(())
    }

    /// Loads all milestones and folders from disk into the caches.
    ///
    /// Returns the number of records of each kind that loaded cleanly.
    /// Unreadable files are logged and skipped so one corrupt record
    /// cannot take the whole data set down with it.
    pub fn load_records(&mut self) -> Result<(usize, usize)> {
        // Buffer everything before touching the locks
        let mut milestone_buffer = HashMap::new();
        for entry in WalkDir::new(self.milestones_dir())
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                match load_milestone_from_file(path) {
                    Ok(milestone) => {
                        milestone_buffer.insert(milestone.id, milestone);
                    }
                    Err(e) => {
                        warn!("Failed to load milestone from {}: {}", path.display(), e);
                    }
                }
            }
        }

        let mut folder_buffer = HashMap::new();
        for entry in WalkDir::new(self.folders_dir())
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                match load_folder_from_file(path) {
                    Ok(folder) => {
                        folder_buffer.insert(folder.id, folder);
                    }
                    Err(e) => {
                        warn!("Failed to load folder from {}: {}", path.display(), e);
                    }
                }
            }
        }

        let counts = (milestone_buffer.len(), folder_buffer.len());

        // Acquire each lock once and swap in the freshly loaded set
        {
            let mut cache = self.lock_milestones()?;
            cache.clear();
            cache.extend(milestone_buffer);
        }
        {
            let mut cache = self.lock_folders()?;
            cache.clear();
            cache.extend(folder_buffer);
        }

        Ok(counts)
    }

    fn milestones_dir(&self) -> PathBuf {
        self.config.data_dir.join("milestones")
    }

    fn folders_dir(&self) -> PathBuf {
        self.config.data_dir.join("folders")
    }

    /// Helper method to get the file path for a milestone.
    /// Layout: data_dir/milestones/first_2_chars_of_id/id.json
    fn milestone_path(&self, id: Uuid) -> PathBuf {
        let id_str = id.to_string();
        self.milestones_dir()
            .join(&id_str[..2])
            .join(format!("{}.json", id_str))
    }

    /// Helper method to get the file path for a folder
    fn folder_path(&self, id: Uuid) -> PathBuf {
        self.folders_dir().join(format!("{}.json", id))
    }

    fn lock_milestones(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, Milestone>>> {
        self.milestones
            .lock()
            .map_err(|_| MsError::LockAcquisitionFailed {
                message: "Failed to acquire lock on milestone cache".to_string(),
            })
    }

    fn lock_folders(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, Folder>>> {
        self.folders
            .lock()
            .map_err(|_| MsError::LockAcquisitionFailed {
                message: "Failed to acquire lock on folder cache".to_string(),
            })
    }

    /// Serializes `value` to `file_path` through a temporary file in the
    /// same directory, so a crash mid-write never leaves a half-written
    /// record behind.
    fn write_atomically<T: serde::Serialize>(&self, value: &T, file_path: &Path) -> Result<()> {
        if let Some(parent) = file_path.parent() {
            if !parent.exists() {
                debug!("Creating parent directory: {}", parent.display());
                fs::create_dir_all(parent).map_err(|e| {
                    error!("Failed to create directory {}: {}", parent.display(), e);
                    MsError::Io(e)
                })?;
            }
        }

        let dir = file_path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| {
            error!("Failed to create temporary file: {}", e);
            MsError::Io(e)
        })?;

        let json = serde_json::to_string_pretty(value)?;

        temp_file.write_all(json.as_bytes()).map_err(|e| {
            error!("Failed to write to temporary file: {}", e);
            MsError::Io(e)
        })?;
        temp_file.flush().map_err(|e| {
            error!("Failed to flush temporary file: {}", e);
            MsError::Io(e)
        })?;

        temp_file.persist(file_path).map_err(|e| {
            error!("Failed to persist file {}: {}", file_path.display(), e.error);
            MsError::Io(e.error)
        })?;

        Ok(())
    }

    /// Saves a milestone to storage using atomic operations.
    ///
    /// An empty title is rejected here, at the single choke point every
    /// create and update funnels through.
    pub fn save_milestone(&self, milestone: &Milestone) -> Result<()> {
        info!("Saving milestone: {}", milestone.id);

        if milestone.title.trim().is_empty() {
            return Err(MsError::EmptyTitle);
        }

        let file_path = self.milestone_path(milestone.id);
        debug!("File path for milestone: {}", file_path.display());

        self.write_atomically(milestone, &file_path)?;

        if self.initialized {
            trace!("Updating milestone in cache");
            self.lock_milestones()?
                .insert(milestone.id, milestone.clone());
        }

        if self.config.auto_backup {
            match self.backup_milestone(milestone) {
                Ok(_) => trace!("Backup copy created successfully"),
                Err(e) => warn!("Failed to create backup copy: {}", e),
            }
        }

        info!("Milestone saved successfully: {}", milestone.id);
        Ok(())
    }

    /// Creates a timestamped copy of the milestone in the backup directory
    fn backup_milestone(&self, milestone: &Milestone) -> Result<()> {
        let timestamp = Utc::now().timestamp();
        let backup_path = self
            .config
            .backup_dir
            .join(format!("{}_{}.json", milestone.id, timestamp));

        if !self.config.backup_dir.exists() {
            fs::create_dir_all(&self.config.backup_dir).map_err(|e| {
                error!("Failed to create backup directory: {}", e);
                MsError::Io(e)
            })?;
        }

        let json = serde_json::to_string_pretty(milestone)?;
        fs::write(&backup_path, json).map_err(|e| {
            error!("Failed to write backup file {}: {}", backup_path.display(), e);
            MsError::Io(e)
        })?;

        debug!("Backup copy created at: {}", backup_path.display());
        Ok(())
    }

    /// Saves a folder to storage using atomic operations
    pub fn save_folder(&self, folder: &Folder) -> Result<()> {
        info!("Saving folder: {} ({})", folder.name, folder.id);

        let file_path = self.folder_path(folder.id);
        self.write_atomically(folder, &file_path)?;

        if self.initialized {
            self.lock_folders()?.insert(folder.id, folder.clone());
        }

        Ok(())
    }

    /// Retrieves a milestone by its id.
    /// Returns Some(Milestone) if found, or None if not found.
    pub fn get_milestone(&self, id: Uuid) -> Option<Milestone> {
        debug!("Retrieving milestone by id: {}", id);

        match self.milestones.lock() {
            Ok(cache) => {
                if let Some(milestone) = cache.get(&id) {
                    trace!("Milestone found in cache: {}", id);
                    return Some(milestone.clone());
                }
            }
            Err(e) => {
                error!("Failed to acquire lock on cache: {}", e);
                // Fall through to the file system check
            }
        }

        // Not in cache, try to load from disk
        let file_path = self.milestone_path(id);
        if file_path.exists() {
            match load_milestone_from_file(&file_path) {
                Ok(milestone) => {
                    if let Ok(mut cache) = self.milestones.lock() {
                        cache.insert(id, milestone.clone());
                    }
                    return Some(milestone);
                }
                Err(e) => {
                    error!("Error loading milestone from file: {}", e);
                    return None;
                }
            }
        }

        debug!("Milestone not found: {}", id);
        None
    }

    /// Resolves a full id or a unique id prefix to a milestone.
    ///
    /// Prefixes are matched against the canonical lowercase hyphenated
    /// form, so anything copied out of a listing resolves back.
    pub fn resolve_milestone(&self, input: &str) -> Result<Milestone> {
        let needle = input.trim().to_lowercase();

        if needle.is_empty() {
            return Err(MsError::MilestoneNotFound {
                id: input.to_string(),
            });
        }

        if let Ok(id) = Uuid::parse_str(&needle) {
            return self
                .get_milestone(id)
                .ok_or_else(|| MsError::MilestoneNotFound {
                    id: input.to_string(),
                });
        }

        let matches: Vec<Milestone> = {
            let cache = self.lock_milestones()?;
            cache
                .values()
                .filter(|m| m.id.to_string().starts_with(&needle))
                .cloned()
                .collect()
        };

        if matches.len() > 1 {
            return Err(MsError::AmbiguousId {
                prefix: input.trim().to_string(),
                count: matches.len(),
            });
        }

        matches
            .into_iter()
            .next()
            .ok_or_else(|| MsError::MilestoneNotFound {
                id: input.to_string(),
            })
    }

    /// Updates an existing milestone.
    ///
    /// The id and creation timestamp are immutable; an update that tries
    /// to change either is rejected.
    pub fn update_milestone(&self, updated: Milestone) -> Result<()> {
        info!("Updating milestone: {}", updated.id);

        let original = self
            .get_milestone(updated.id)
            .ok_or_else(|| MsError::MilestoneNotFound {
                id: updated.id.to_string(),
            })?;

        if updated.created_at != original.created_at {
            let error_msg = "Cannot change milestone creation timestamp during update".to_string();
            error!("{}", error_msg);
            return Err(MsError::ApplicationError { message: error_msg });
        }

        self.save_milestone(&updated)
    }

    /// Pins or unpins a milestone, returning the stored record.
    pub fn set_pinned(&self, id: Uuid, pinned: bool) -> Result<Milestone> {
        let mut milestone = self
            .get_milestone(id)
            .ok_or_else(|| MsError::MilestoneNotFound { id: id.to_string() })?;

        if milestone.pinned == pinned {
            return Ok(milestone);
        }

        milestone.pinned = pinned;
        milestone.updated_at = Utc::now();
        self.save_milestone(&milestone)?;
        Ok(milestone)
    }

    /// Moves a milestone into `folder_id` (or out of any folder when
    /// `None`). Moving a soft-deleted milestone also restores it.
    pub fn move_milestone(&self, id: Uuid, folder_id: Option<Uuid>) -> Result<Milestone> {
        let mut milestone = self
            .get_milestone(id)
            .ok_or_else(|| MsError::MilestoneNotFound { id: id.to_string() })?;

        if let Some(folder_id) = folder_id {
            if self.get_folder(folder_id).is_none() {
                return Err(MsError::FolderNotFound {
                    name: folder_id.to_string(),
                });
            }
        }

        milestone.folder_id = folder_id;
        if milestone.deleted_at.is_some() {
            debug!("Move restores soft-deleted milestone: {}", id);
            milestone.deleted_at = None;
        }
        milestone.updated_at = Utc::now();

        self.save_milestone(&milestone)?;
        Ok(milestone)
    }

    /// Moves a milestone to Recently Deleted.
    ///
    /// The record stays on disk; it is detached from its folder and
    /// stamped with the deletion time so listings can exclude it.
    pub fn delete_milestone(&self, id: Uuid) -> Result<Milestone> {
        info!("Soft-deleting milestone: {}", id);

        let mut milestone = self
            .get_milestone(id)
            .ok_or_else(|| MsError::MilestoneNotFound { id: id.to_string() })?;

        if milestone.is_deleted() {
            return Err(MsError::AlreadyDeleted { id });
        }

        let now = Utc::now();
        milestone.folder_id = None;
        milestone.deleted_at = Some(now);
        milestone.updated_at = now;

        self.save_milestone(&milestone)?;
        Ok(milestone)
    }

    /// Brings a milestone back from Recently Deleted, optionally filing
    /// it straight into a folder.
    pub fn restore_milestone(&self, id: Uuid, folder_id: Option<Uuid>) -> Result<Milestone> {
        info!("Restoring milestone: {}", id);

        let milestone = self
            .get_milestone(id)
            .ok_or_else(|| MsError::MilestoneNotFound { id: id.to_string() })?;

        if !milestone.is_deleted() {
            return Err(MsError::NotDeleted { id });
        }

        // move_milestone clears the deletion stamp
        self.move_milestone(id, folder_id)
    }

    /// Permanently removes a single soft-deleted milestone.
    ///
    /// Only records already in Recently Deleted can be purged; a live
    /// milestone has to be deleted first.
    pub fn purge_milestone(&self, id: Uuid) -> Result<Milestone> {
        info!("Purging milestone: {}", id);

        let milestone = self
            .get_milestone(id)
            .ok_or_else(|| MsError::MilestoneNotFound { id: id.to_string() })?;

        if !milestone.is_deleted() {
            error!("Refusing to purge live milestone: {}", id);
            return Err(MsError::NotDeleted { id });
        }

        // Keep a final copy before the file goes away
        if self.config.auto_backup {
            if let Err(e) = self.backup_milestone(&milestone) {
                warn!("Failed to create pre-purge backup: {}", e);
            }
        }

        let file_path = self.milestone_path(id);
        if file_path.exists() {
            fs::remove_file(&file_path).map_err(|e| {
                error!("Failed to delete file {}: {}", file_path.display(), e);
                MsError::Io(e)
            })?;

            if let Some(parent) = file_path.parent() {
                if parent != self.milestones_dir() {
                    self.cleanup_empty_directory(parent);
                }
            }
        } else {
            debug!("Milestone file already gone, only removing from cache");
        }

        match self.milestones.lock() {
            Ok(mut cache) => {
                cache.remove(&id);
            }
            Err(e) => {
                // The file is gone already, so log and carry on
                warn!("Failed to acquire lock to update cache after purge: {}", e);
            }
        }

        info!("Milestone {} purged", id);
        Ok(milestone)
    }

    /// Permanently removes every milestone in Recently Deleted.
    /// Returns how many records were purged.
    pub fn purge_all_deleted(&self) -> Result<usize> {
        let deleted_ids: Vec<Uuid> = {
            let cache = self.lock_milestones()?;
            cache
                .values()
                .filter(|m| m.is_deleted())
                .map(|m| m.id)
                .collect()
        };

        let mut purged = 0;
        for id in deleted_ids {
            match self.purge_milestone(id) {
                Ok(_) => purged += 1,
                Err(e) => warn!("Failed to purge milestone {}: {}", id, e),
            }
        }

        info!("Purged {} milestones from Recently Deleted", purged);
        Ok(purged)
    }

    /// Helper method to recursively clean up empty shard directories
    fn cleanup_empty_directory(&self, dir_path: &Path) {
        if !dir_path.exists() || dir_path == self.milestones_dir() {
            return;
        }

        match fs::read_dir(dir_path) {
            Ok(entries) => {
                if entries.count() == 0 {
                    debug!("Removing empty directory: {}", dir_path.display());
                    match fs::remove_dir(dir_path) {
                        Ok(_) => {
                            if let Some(parent) = dir_path.parent() {
                                if parent != self.milestones_dir() {
                                    self.cleanup_empty_directory(parent);
                                }
                            }
                        }
                        Err(e) => warn!(
                            "Failed to remove empty directory {}: {}",
                            dir_path.display(),
                            e
                        ),
                    }
                }
            }
            Err(e) => warn!("Failed to read directory {}: {}", dir_path.display(), e),
        }
    }

    /// Returns the milestones visible in `selector`, in display order.
    pub fn milestones_in(
        &self,
        selector: &FolderSelector,
        now: DateTime<Utc>,
    ) -> Result<Vec<Milestone>> {
        // Snapshot under the lock, order outside it
        let snapshot = {
            let cache = self.lock_milestones()?;
            cache.values().cloned().collect::<Vec<Milestone>>()
        };

        Ok(ordering::order(snapshot, selector, now))
    }

    /// Searches live milestones by title and remark using fuzzy matching.
    /// Returns matches sorted by relevance score, best first.
    pub fn search_milestones(&self, query: &str) -> Vec<Milestone> {
        use fuzzy_matcher::skim::SkimMatcherV2;
        use fuzzy_matcher::FuzzyMatcher;

        info!("Searching milestones with query: '{}'", query);

        let matcher = SkimMatcherV2::default();

        struct ScoredMilestone {
            milestone: Milestone,
            score: i64,
        }

        match self.milestones.lock() {
            Ok(cache) => {
                let mut matched: Vec<ScoredMilestone> = Vec::new();

                for milestone in cache.values() {
                    // Records in Recently Deleted stay out of search results
                    if milestone.is_deleted() {
                        continue;
                    }

                    let title_score = matcher.fuzzy_match(&milestone.title, query).unwrap_or(0);
                    let remark_score = milestone
                        .remark
                        .as_deref()
                        .and_then(|remark| matcher.fuzzy_match(remark, query))
                        .unwrap_or(0);

                    // Title matches are weighted more heavily
                    let final_score = title_score * 2 + remark_score;

                    if final_score > 0 {
                        trace!("Milestone matched with score {}: {}", final_score, milestone.id);
                        matched.push(ScoredMilestone {
                            milestone: milestone.clone(),
                            score: final_score,
                        });
                    }
                }

                matched.sort_by(|a, b| b.score.cmp(&a.score));

                let result: Vec<Milestone> =
                    matched.into_iter().map(|scored| scored.milestone).collect();

                info!("Returning {} sorted search results", result.len());
                result
            }
            Err(err) => {
                error!("Failed to acquire lock on cache during search: {}", err);
                Vec::new()
            }
        }
    }

    /// Validates a candidate folder name: non-empty, not reserved, and
    /// not already taken by another folder (ignoring case). `exclude`
    /// lets a rename keep its own current name.
    fn validate_folder_name(&self, name: &str, exclude: Option<Uuid>) -> Result<()> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(MsError::EmptyFolderName);
        }

        if is_reserved_folder_name(trimmed) {
            return Err(MsError::ReservedFolderName {
                name: trimmed.to_string(),
            });
        }

        let lowered = trimmed.to_lowercase();
        let cache = self.lock_folders()?;
        let taken = cache
            .values()
            .any(|f| Some(f.id) != exclude && f.name.to_lowercase() == lowered);

        if taken {
            return Err(MsError::FolderNameTaken {
                name: trimmed.to_string(),
            });
        }

        Ok(())
    }

    /// Creates a new folder at the end of the folder list.
    pub fn create_folder(&self, name: &str) -> Result<Folder> {
        self.validate_folder_name(name, None)?;

        let sort_order = {
            let cache = self.lock_folders()?;
            cache.len() as u32 + 1
        };

        let folder = Folder::new(name.trim().to_string(), sort_order);
        self.save_folder(&folder)?;

        info!("Created folder '{}' ({})", folder.name, folder.id);
        Ok(folder)
    }

    /// Renames an existing folder. The new name runs through the same
    /// validation as folder creation.
    pub fn rename_folder(&self, id: Uuid, new_name: &str) -> Result<Folder> {
        let mut folder = self
            .get_folder(id)
            .ok_or_else(|| MsError::FolderNotFound {
                name: id.to_string(),
            })?;

        self.validate_folder_name(new_name, Some(id))?;

        let old_name = folder.name.clone();
        folder.name = new_name.trim().to_string();
        self.save_folder(&folder)?;

        info!("Renamed folder '{}' to '{}'", old_name, folder.name);
        Ok(folder)
    }

    /// Deletes a folder and moves its milestones to Recently Deleted.
    /// Returns how many milestones were swept along.
    pub fn delete_folder(&self, id: Uuid) -> Result<usize> {
        let folder = self
            .get_folder(id)
            .ok_or_else(|| MsError::FolderNotFound {
                name: id.to_string(),
            })?;

        info!("Deleting folder '{}' ({})", folder.name, id);

        let member_ids: Vec<Uuid> = {
            let cache = self.lock_milestones()?;
            cache
                .values()
                .filter(|m| m.folder_id == Some(id) && !m.is_deleted())
                .map(|m| m.id)
                .collect()
        };

        let mut swept = 0;
        for member_id in &member_ids {
            match self.delete_milestone(*member_id) {
                Ok(_) => swept += 1,
                Err(e) => warn!("Failed to soft-delete milestone {}: {}", member_id, e),
            }
        }

        let file_path = self.folder_path(id);
        if file_path.exists() {
            fs::remove_file(&file_path).map_err(|e| {
                error!("Failed to delete folder file {}: {}", file_path.display(), e);
                MsError::Io(e)
            })?;
        }

        self.lock_folders()?.remove(&id);

        info!(
            "Folder '{}' deleted, {} milestones moved to Recently Deleted",
            folder.name, swept
        );
        Ok(swept)
    }

    /// Retrieves a folder by its id
    pub fn get_folder(&self, id: Uuid) -> Option<Folder> {
        match self.folders.lock() {
            Ok(cache) => cache.get(&id).cloned(),
            Err(e) => {
                error!("Failed to acquire lock on folder cache: {}", e);
                None
            }
        }
    }

    /// Finds a user folder by display name, ignoring case
    pub fn find_folder_by_name(&self, name: &str) -> Result<Option<Folder>> {
        let lowered = name.trim().to_lowercase();
        let cache = self.lock_folders()?;
        Ok(cache
            .values()
            .find(|f| f.name.to_lowercase() == lowered)
            .cloned())
    }

    /// Returns all user folders in display order
    pub fn list_folders(&self) -> Result<Vec<Folder>> {
        let mut folders: Vec<Folder> = {
            let cache = self.lock_folders()?;
            cache.values().cloned().collect()
        };

        folders.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(folders)
    }

    /// Builds the folder overview: the built-in views and every user
    /// folder with the number of milestones each currently shows.
    /// All comes first, Recently Deleted last, user folders in between.
    pub fn folder_overview(&self) -> Result<Vec<FolderOverview>> {
        let snapshot = {
            let cache = self.lock_milestones()?;
            cache.values().cloned().collect::<Vec<Milestone>>()
        };
        let folders = self.list_folders()?;

        let live = snapshot.iter().filter(|m| !m.is_deleted()).count();
        let pinned = snapshot
            .iter()
            .filter(|m| !m.is_deleted() && m.pinned)
            .count();
        let deleted = snapshot.len() - live;

        let mut overview = Vec::with_capacity(folders.len() + 3);
        overview.push(FolderOverview {
            name: ALL_FOLDER_NAME.to_string(),
            kind: FolderKind::All,
            count: live,
        });
        overview.push(FolderOverview {
            name: PINNED_FOLDER_NAME.to_string(),
            kind: FolderKind::Pinned,
            count: pinned,
        });

        for folder in folders {
            let count = snapshot
                .iter()
                .filter(|m| !m.is_deleted() && m.folder_id == Some(folder.id))
                .count();
            overview.push(FolderOverview {
                name: folder.name,
                kind: FolderKind::User,
                count,
            });
        }

        overview.push(FolderOverview {
            name: DELETED_FOLDER_NAME.to_string(),
            kind: FolderKind::Deleted,
            count: deleted,
        });

        Ok(overview)
    }

    /// Creates a full backup of all milestones and folders in a ZIP
    /// archive.
    ///
    /// With `output` unset the archive lands in the backup directory
    /// under a timestamped name and old archives are rotated out; an
    /// explicit path is written as-is and left out of the rotation.
    pub fn create_full_backup(&self, output: Option<&Path>) -> Result<PathBuf> {
        let backup_path = match output {
            Some(path) => path.to_path_buf(),
            None => {
                if !self.config.backup_dir.exists() {
                    fs::create_dir_all(&self.config.backup_dir).map_err(|e| {
                        MsError::BackupFailed {
                            message: e.to_string(),
                        }
                    })?;
                }
                let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
                self.config
                    .backup_dir
                    .join(format!("{}{}.zip", BACKUP_FILE_PREFIX, timestamp))
            }
        };

        if let Some(parent) = backup_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| MsError::BackupFailed {
                    message: e.to_string(),
                })?;
            }
        }

        let file = File::create(&backup_path).map_err(|e| MsError::BackupFailed {
            message: e.to_string(),
        })?;
        let mut zip = ZipWriter::new(file);

        let milestones = self.lock_milestones()?;
        let folders = self.lock_folders()?;
        let record_count = milestones.len() + folders.len();

        for (id, milestone) in milestones.iter() {
            let options = FileOptions::<zip::write::ExtendedFileOptions>::default()
                .compression_method(zip::CompressionMethod::Deflated)
                .unix_permissions(0o644);

            let json = serde_json::to_string_pretty(milestone)?;
            let id_str = id.to_string();
            let entry_path = format!("milestones/{}/{}.json", &id_str[..2], id_str);

            zip.start_file(entry_path, options)?;
            zip.write_all(json.as_bytes())
                .map_err(|e| MsError::BackupFailed {
                    message: format!("Failed to write milestone {} to backup: {}", id, e),
                })?;
        }

        for (id, folder) in folders.iter() {
            let options = FileOptions::<zip::write::ExtendedFileOptions>::default()
                .compression_method(zip::CompressionMethod::Deflated)
                .unix_permissions(0o644);

            let json = serde_json::to_string_pretty(folder)?;
            let entry_path = format!("folders/{}.json", id);

            zip.start_file(entry_path, options)?;
            zip.write_all(json.as_bytes())
                .map_err(|e| MsError::BackupFailed {
                    message: format!("Failed to write folder {} to backup: {}", id, e),
                })?;
        }

        drop(milestones);
        drop(folders);

        zip.finish()?;

        // Explicit output paths stay out of the rotation
        if output.is_none() {
            self.cleanup_old_backups()?;
        }

        info!(
            "Full backup created with {} records at {}",
            record_count,
            backup_path.display()
        );

        Ok(backup_path)
    }

    /// Removes old backup archives when the count exceeds max_backups.
    /// Uses a min-heap so only the newest archives are retained.
    fn cleanup_old_backups(&self) -> Result<()> {
        if self.config.max_backups == 0 {
            return Ok(());
        }

        #[derive(Debug, Eq)]
        struct BackupFile {
            path: PathBuf,
            modified_time: SystemTime,
        }

        impl PartialEq for BackupFile {
            fn eq(&self, other: &Self) -> bool {
                self.modified_time.eq(&other.modified_time)
            }
        }

        impl PartialOrd for BackupFile {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for BackupFile {
            // Newer files are "greater" than older files
            fn cmp(&self, other: &Self) -> Ordering {
                self.modified_time.cmp(&other.modified_time)
            }
        }

        // Reverse turns this into a min-heap with the oldest file on top
        let mut newest_backups: BinaryHeap<Reverse<BackupFile>> =
            BinaryHeap::with_capacity((self.config.max_backups + 1) as usize);

        for entry in WalkDir::new(&self.config.backup_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            let path = entry.path();

            if path.is_file()
                && path.extension().is_some_and(|ext| ext == "zip")
                && path
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy().starts_with(BACKUP_FILE_PREFIX))
            {
                if let Ok(metadata) = entry.metadata() {
                    if let Ok(modified_time) = metadata.modified() {
                        newest_backups.push(Reverse(BackupFile {
                            path: path.to_path_buf(),
                            modified_time,
                        }));

                        if newest_backups.len() > self.config.max_backups as usize {
                            if let Some(Reverse(oldest)) = newest_backups.pop() {
                                match fs::remove_file(&oldest.path) {
                                    Ok(_) => {
                                        debug!("Removed old backup: {}", oldest.path.display())
                                    }
                                    Err(e) => warn!(
                                        "Failed to remove old backup {}: {}",
                                        oldest.path.display(),
                                        e
                                    ),
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Restores milestones and folders from a full backup ZIP archive.
    ///
    /// Folders restore before milestones so moved-in records land in
    /// folders that already exist. Existing records are skipped unless
    /// `overwrite_existing` is set.
    pub fn restore_full_backup(
        &self,
        backup_path: &Path,
        overwrite_existing: bool,
    ) -> Result<RestoreBackupSummary> {
        if !backup_path.exists() || !backup_path.is_file() {
            return Err(MsError::BackupFailed {
                message: format!("Backup file not found: {}", backup_path.display()),
            });
        }

        if backup_path.extension().map_or(true, |ext| ext != "zip") {
            return Err(MsError::ApplicationError {
                message: format!("Not a valid ZIP file: {}", backup_path.display()),
            });
        }

        let backup_file = File::open(backup_path).map_err(|e| MsError::BackupFailed {
            message: format!("Failed to open backup file: {}", e),
        })?;
        let mut archive = ZipArchive::new(backup_file)?;

        let existing_ids = {
            let milestones = self.lock_milestones()?;
            let folders = self.lock_folders()?;
            let mut ids: HashSet<Uuid> = milestones.keys().copied().collect();
            ids.extend(folders.keys().copied());
            ids
        };

        // First pass: collect entry names, folders ahead of milestones
        let mut folder_entries = Vec::new();
        let mut milestone_entries = Vec::new();
        for i in 0..archive.len() {
            let file = archive.by_index(i).map_err(|e| MsError::BackupFailed {
                message: format!("Failed to read ZIP entry: {}", e),
            })?;
            let name = file.name().to_string();

            if !name.ends_with(".json") {
                continue;
            }

            let parts: Vec<&str> = name.split('/').collect();
            match parts.as_slice() {
                ["folders", file_name] => {
                    if let Some(id) = parse_record_id(file_name) {
                        folder_entries.push((name.clone(), id));
                    }
                }
                ["milestones", _, file_name] => {
                    if let Some(id) = parse_record_id(file_name) {
                        milestone_entries.push((name.clone(), id));
                    }
                }
                _ => {}
            }
        }

        let total_records = folder_entries.len() + milestone_entries.len();
        let mut restored = 0;
        let mut skipped = 0;
        let mut failed: Vec<(String, String)> = Vec::new();

        // Second pass: extract and save each record
        for (entry_name, id) in &folder_entries {
            if !overwrite_existing && existing_ids.contains(id) {
                skipped += 1;
                continue;
            }

            match self.restore_folder_from_zip(&mut archive, entry_name, *id) {
                Ok(_) => restored += 1,
                Err(e) => {
                    warn!("Failed to restore folder {}: {}", id, e);
                    failed.push((entry_name.clone(), e.to_string()));
                }
            }
        }

        for (entry_name, id) in &milestone_entries {
            if !overwrite_existing && existing_ids.contains(id) {
                skipped += 1;
                continue;
            }

            match self.restore_milestone_from_zip(&mut archive, entry_name, *id) {
                Ok(_) => restored += 1,
                Err(e) => {
                    warn!("Failed to restore milestone {}: {}", id, e);
                    failed.push((entry_name.clone(), e.to_string()));
                }
            }
        }

        let summary = RestoreBackupSummary {
            backup_file: backup_path.to_path_buf(),
            total_records,
            restored,
            skipped,
            failed: failed.clone(),
        };

        info!(
            "Backup restoration complete: restored {}, skipped {}, failed {} records from {}",
            restored,
            skipped,
            failed.len(),
            backup_path.display()
        );

        Ok(summary)
    }

    /// Helper method to restore a single milestone from the ZIP archive
    fn restore_milestone_from_zip(
        &self,
        archive: &mut ZipArchive<File>,
        entry_name: &str,
        id: Uuid,
    ) -> Result<()> {
        let content = read_zip_entry(archive, entry_name)?;
        let milestone: Milestone = serde_json::from_str(&content)?;

        if milestone.id != id {
            return Err(MsError::ApplicationError {
                message: format!("Record id mismatch: expected {}, found {}", id, milestone.id),
            });
        }

        self.save_milestone(&milestone)
    }

    /// Helper method to restore a single folder from the ZIP archive
    fn restore_folder_from_zip(
        &self,
        archive: &mut ZipArchive<File>,
        entry_name: &str,
        id: Uuid,
    ) -> Result<()> {
        let content = read_zip_entry(archive, entry_name)?;
        let folder: Folder = serde_json::from_str(&content)?;

        if folder.id != id {
            return Err(MsError::ApplicationError {
                message: format!("Record id mismatch: expected {}, found {}", id, folder.id),
            });
        }

        self.save_folder(&folder)
    }
}

/// Extracts the record id from a `<uuid>.json` file name
fn parse_record_id(file_name: &str) -> Option<Uuid> {
    file_name
        .strip_suffix(".json")
        .and_then(|stem| Uuid::parse_str(stem).ok())
}

/// Reads a ZIP entry fully into a string
fn read_zip_entry(archive: &mut ZipArchive<File>, entry_name: &str) -> Result<String> {
    use std::io::Read;

    let mut entry = archive
        .by_name(entry_name)
        .map_err(|e| MsError::BackupFailed {
            message: format!("Failed to find {} in backup: {}", entry_name, e),
        })?;

    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|e| MsError::BackupFailed {
            message: format!("Failed to read {} content: {}", entry_name, e),
        })?;

    Ok(content)
}

// Implement Clone for MilestoneStorage to use in closures; the caches
// are shared, not duplicated.
impl Clone for MilestoneStorage {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            milestones: Arc::clone(&self.milestones),
            folders: Arc::clone(&self.folders),
            initialized: self.initialized,
        }
    }
}
