//! CLI application handler for the mstone application
//!
//! This module executes CLI commands against the milestone storage
//! system and renders the results.
use std::{
    collections::HashMap,
    io::{stdin, stdout, Write},
    path::PathBuf,
    sync::Arc,
};

use chrono::{Local, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    calendar_days_between, parse_date, resolve_selector, Commands, Config, Countdown,
    FolderCommands, FolderSelector, Milestone, MilestoneStorage, MsError, Result,
    DELETED_FOLDER_NAME,
};

/// CLI application handler - processes CLI commands and interfaces with
/// MilestoneStorage
pub struct App {
    /// The milestone storage backend
    storage: Arc<Mutex<MilestoneStorage>>,

    /// Application configuration
    config: Config,

    /// Where the configuration was loaded from (config command writes here)
    config_path: PathBuf,
}

impl App {
    /// Create a new CLI application with the given storage backend and config
    pub fn new(storage: Arc<Mutex<MilestoneStorage>>, config: Config, config_path: PathBuf) -> Self {
        Self {
            storage,
            config,
            config_path,
        }
    }

    /// Run the CLI application with the given command
    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Add {
                title,
                date,
                remark,
                folder,
                pin,
            } => self.handle_add(title, date, remark, folder, pin).await?,

            Commands::View { id, json } => self.handle_view(id, json).await?,

            Commands::List {
                folder,
                limit,
                json,
                brief,
            } => self.handle_list(folder, limit, json, brief).await?,

            Commands::Search { query, limit, json } => {
                self.handle_search(query, limit, json).await?
            }

            Commands::Edit {
                id,
                title,
                date,
                remark,
                clear_remark,
            } => self.handle_edit(id, title, date, remark, clear_remark).await?,

            Commands::Pin { id } => self.handle_pin(id, true).await?,

            Commands::Unpin { id } => self.handle_pin(id, false).await?,

            Commands::Move { id, folder } => self.handle_move(id, folder).await?,

            Commands::Delete { id } => self.handle_delete(id).await?,

            Commands::Restore { id, folder } => self.handle_restore(id, folder).await?,

            Commands::Purge { id, all: _, force } => match id {
                Some(id) => self.handle_purge_single(id, force).await?,
                // clap guarantees --all when no id was given
                None => self.handle_purge_all(force).await?,
            },

            Commands::Folder { command } => self.handle_folder(command).await?,

            Commands::Backup { output } => self.handle_backup(output).await?,

            Commands::RestoreBackup {
                backup_file,
                overwrite,
                force,
            } => self.handle_restore_backup(backup_file, overwrite, force).await?,

            Commands::Config { show, set, reset } => self.handle_config(show, set, reset)?,
        }

        Ok(())
    }

    async fn handle_add(
        &self,
        title: String,
        date: String,
        remark: Option<String>,
        folder: Option<String>,
        pin: bool,
    ) -> Result<()> {
        let date = parse_date(&date)?;
        let storage = self.storage.lock().await.clone();

        let folder_id = match folder {
            Some(name) => Some(self.folder_id_by_name(&storage, &name)?),
            None => None,
        };

        let mut milestone = Milestone::new(title, date, folder_id);
        milestone.remark = remark.filter(|r| !r.trim().is_empty());
        milestone.pinned = pin;

        storage.save_milestone(&milestone)?;

        println!(
            "Milestone '{}' created with id {} ({})",
            milestone.title,
            milestone.short_id(),
            self.format_countdown(self.local_day_count(&milestone))
        );
        Ok(())
    }

    async fn handle_view(&self, id: String, json: bool) -> Result<()> {
        let storage = self.storage.lock().await.clone();
        let milestone = storage.resolve_milestone(&id)?;

        if json {
            println!("{}", serde_json::to_string_pretty(&milestone)?);
            return Ok(());
        }

        let folder_label = if milestone.is_deleted() {
            DELETED_FOLDER_NAME.to_string()
        } else {
            match milestone.folder_id.and_then(|fid| storage.get_folder(fid)) {
                Some(folder) => folder.name,
                None => "-".to_string(),
            }
        };

        println!("ID:      {}", milestone.id);
        println!("Title:   {}", console::style(&milestone.title).bold());
        println!(
            "Date:    {} ({})",
            milestone.date.with_timezone(&Local).format("%Y-%m-%d"),
            self.format_countdown(self.local_day_count(&milestone))
        );
        println!("Folder:  {}", console::style(folder_label).cyan());
        println!("Pinned:  {}", if milestone.pinned { "yes" } else { "no" });
        if let Some(remark) = &milestone.remark {
            println!("Remark:  {}", remark);
        }
        if let Some(deleted_at) = milestone.deleted_at {
            println!(
                "Deleted: {}",
                deleted_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            );
        }
        println!(
            "Created: {}",
            milestone.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
        println!(
            "Updated: {}",
            milestone.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );

        Ok(())
    }

    /// List milestones in the selected folder view
    async fn handle_list(
        &self,
        folder: String,
        limit: usize,
        json: bool,
        brief: bool,
    ) -> Result<()> {
        let storage = self.storage.lock().await.clone();

        let folders = storage.list_folders()?;
        let selector = resolve_selector(&folder, &folders)?;

        let mut milestones = storage.milestones_in(&selector, Utc::now())?;

        // Apply limit (0 means no limit)
        if limit > 0 && milestones.len() > limit {
            milestones.truncate(limit);
        }

        if milestones.is_empty() {
            match selector {
                FolderSelector::Deleted => println!("Recently Deleted is empty."),
                _ => println!("No milestones found."),
            }
            return Ok(());
        }

        let folder_names: HashMap<Uuid, String> =
            folders.into_iter().map(|f| (f.id, f.name)).collect();

        if json {
            self.display_milestones_json(&milestones, !brief)?;
        } else {
            self.display_milestones_text(&milestones, &folder_names, brief)?;
            println!(
                "\nFound {} milestone{}",
                milestones.len(),
                if milestones.len() == 1 { "" } else { "s" }
            );
        }

        Ok(())
    }

    async fn handle_search(&self, query: String, limit: usize, json: bool) -> Result<()> {
        let mut results = self.storage.lock().await.clone().search_milestones(&query);

        // Apply limit if specified (0 means no limit)
        let truncated = limit > 0 && results.len() > limit;
        if truncated {
            results.truncate(limit);
        }

        if results.is_empty() {
            println!("No milestones found matching query: \"{}\"", query);
            return Ok(());
        }

        if json {
            self.display_milestones_json(&results, false)?;
        } else {
            self.display_milestones_text(&results, &HashMap::new(), true)?;
            if truncated {
                println!(
                    "\nShowing {} of many matching results. Use --limit to show more.",
                    results.len()
                );
            } else {
                println!(
                    "\nFound {} matching milestone{}",
                    results.len(),
                    if results.len() == 1 { "" } else { "s" }
                );
            }
        }

        Ok(())
    }

    async fn handle_edit(
        &self,
        id: String,
        title: Option<String>,
        date: Option<String>,
        remark: Option<String>,
        clear_remark: bool,
    ) -> Result<()> {
        if title.is_none() && date.is_none() && remark.is_none() && !clear_remark {
            return Err(MsError::ApplicationError {
                message: "Nothing to change; pass --title, --date, --remark or --clear-remark"
                    .to_string(),
            });
        }

        let storage = self.storage.lock().await.clone();
        let mut milestone = storage.resolve_milestone(&id)?;

        if let Some(new_title) = title {
            milestone.title = new_title;
        }

        if let Some(new_date) = date {
            milestone.date = parse_date(&new_date)?;
        }

        if clear_remark {
            milestone.remark = None;
        } else if let Some(new_remark) = remark {
            milestone.remark = if new_remark.trim().is_empty() {
                None
            } else {
                Some(new_remark)
            };
        }

        milestone.updated_at = Utc::now();
        storage.update_milestone(milestone.clone())?;

        println!("Milestone {} updated successfully", milestone.short_id());
        Ok(())
    }

    async fn handle_pin(&self, id: String, pinned: bool) -> Result<()> {
        let storage = self.storage.lock().await.clone();
        let milestone = storage.resolve_milestone(&id)?;
        let milestone = storage.set_pinned(milestone.id, pinned)?;

        if pinned {
            println!("Pinned '{}'", milestone.title);
        } else {
            println!("Unpinned '{}'", milestone.title);
        }
        Ok(())
    }

    async fn handle_move(&self, id: String, folder: String) -> Result<()> {
        let storage = self.storage.lock().await.clone();
        let milestone = storage.resolve_milestone(&id)?;
        let was_deleted = milestone.is_deleted();

        let target = if folder.trim().eq_ignore_ascii_case("none") {
            None
        } else {
            Some(self.folder_id_by_name(&storage, &folder)?)
        };

        let milestone = storage.move_milestone(milestone.id, target)?;

        let destination = match target.and_then(|fid| storage.get_folder(fid)) {
            Some(folder) => format!("folder '{}'", folder.name),
            None => "no folder".to_string(),
        };

        if was_deleted {
            println!("Milestone '{}' restored into {}", milestone.title, destination);
        } else {
            println!("Milestone '{}' moved to {}", milestone.title, destination);
        }
        Ok(())
    }

    async fn handle_delete(&self, id: String) -> Result<()> {
        let storage = self.storage.lock().await.clone();
        let milestone = storage.resolve_milestone(&id)?;
        let milestone = storage.delete_milestone(milestone.id)?;

        println!(
            "Milestone '{}' moved to Recently Deleted. Restore it with: mstone restore {}",
            milestone.title,
            milestone.short_id()
        );
        Ok(())
    }

    async fn handle_restore(&self, id: String, folder: Option<String>) -> Result<()> {
        let storage = self.storage.lock().await.clone();
        let milestone = storage.resolve_milestone(&id)?;

        let target = match folder {
            Some(name) => Some(self.folder_id_by_name(&storage, &name)?),
            None => None,
        };

        let milestone = storage.restore_milestone(milestone.id, target)?;

        let destination = match target.and_then(|fid| storage.get_folder(fid)) {
            Some(folder) => format!("folder '{}'", folder.name),
            None => "no folder".to_string(),
        };

        println!("Milestone '{}' restored into {}", milestone.title, destination);
        Ok(())
    }

    async fn handle_purge_single(&self, id: String, force: bool) -> Result<()> {
        let storage = self.storage.lock().await.clone();
        let milestone = storage.resolve_milestone(&id)?;

        if !milestone.is_deleted() {
            return Err(MsError::NotDeleted { id: milestone.id });
        }

        if !force {
            println!("You are about to permanently delete the following milestone:");
            println!("ID:    {}", milestone.id);
            println!("Title: {}", milestone.title);
            println!(
                "Date:  {}",
                milestone.date.with_timezone(&Local).format("%Y-%m-%d")
            );
            println!("\nThis action cannot be undone!");

            if !self.confirm("Are you sure you want to purge this milestone? [y/N]: ")? {
                println!("Purge cancelled.");
                return Ok(());
            }
        }

        let milestone = storage.purge_milestone(milestone.id)?;
        println!(
            "Milestone '{}' ({}) has been permanently deleted.",
            milestone.title,
            milestone.short_id()
        );
        Ok(())
    }

    async fn handle_purge_all(&self, force: bool) -> Result<()> {
        let storage = self.storage.lock().await.clone();

        let deleted = storage.milestones_in(&FolderSelector::Deleted, Utc::now())?;
        if deleted.is_empty() {
            println!("Recently Deleted is empty.");
            return Ok(());
        }

        if !force {
            println!(
                "You are about to permanently delete {} milestone{} from Recently Deleted.",
                deleted.len(),
                if deleted.len() == 1 { "" } else { "s" }
            );
            println!("This action cannot be undone!");

            if !self.confirm("Are you sure you want to empty Recently Deleted? [y/N]: ")? {
                println!("Purge cancelled.");
                return Ok(());
            }
        }

        let purged = storage.purge_all_deleted()?;
        println!(
            "Permanently deleted {} milestone{}.",
            purged,
            if purged == 1 { "" } else { "s" }
        );
        Ok(())
    }

    async fn handle_folder(&self, command: FolderCommands) -> Result<()> {
        match command {
            FolderCommands::Add { name } => {
                let storage = self.storage.lock().await.clone();
                let folder = storage.create_folder(&name)?;
                println!("Folder '{}' created", folder.name);
            }

            FolderCommands::List { json } => {
                let storage = self.storage.lock().await.clone();
                let overview = storage.folder_overview()?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&overview)?);
                } else {
                    let name_width = overview
                        .iter()
                        .map(|row| console::measure_text_width(&row.name))
                        .max()
                        .unwrap_or(0);

                    for row in &overview {
                        let name = console::pad_str(
                            &row.name,
                            name_width,
                            console::Alignment::Left,
                            None,
                        );
                        println!(
                            "{}  {:>5}",
                            console::style(name).cyan(),
                            row.count
                        );
                    }
                }
            }

            FolderCommands::Rename { name, new_name } => {
                let storage = self.storage.lock().await.clone();
                let folder = storage
                    .find_folder_by_name(&name)?
                    .ok_or(MsError::FolderNotFound { name })?;

                let folder = storage.rename_folder(folder.id, &new_name)?;
                println!("Folder renamed to '{}'", folder.name);
            }

            FolderCommands::Delete { name, force } => {
                let storage = self.storage.lock().await.clone();
                let folder = storage
                    .find_folder_by_name(&name)?
                    .ok_or(MsError::FolderNotFound { name })?;

                let members = storage
                    .milestones_in(&FolderSelector::User(folder.id), Utc::now())?
                    .len();

                if !force {
                    println!(
                        "Folder '{}' and its {} milestone{} will move to Recently Deleted.",
                        folder.name,
                        members,
                        if members == 1 { "" } else { "s" }
                    );

                    if !self.confirm("Delete this folder? [y/N]: ")? {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                let swept = storage.delete_folder(folder.id)?;
                println!(
                    "Folder '{}' deleted; {} milestone{} moved to Recently Deleted.",
                    folder.name,
                    swept,
                    if swept == 1 { "" } else { "s" }
                );
            }
        }

        Ok(())
    }

    async fn handle_backup(&self, output: Option<PathBuf>) -> Result<()> {
        let storage = self.storage.lock().await.clone();
        let backup_path = storage.create_full_backup(output.as_deref())?;
        println!("Backup created at: {}", backup_path.display());
        Ok(())
    }

    async fn handle_restore_backup(
        &self,
        backup_file: PathBuf,
        overwrite: bool,
        force: bool,
    ) -> Result<()> {
        if !force {
            println!(
                "You are about to restore from backup: {}",
                backup_file.display()
            );
            if overwrite {
                println!("Existing records WILL be overwritten.");
            } else {
                println!("Existing records will be kept; only new records are restored.");
            }

            if !self.confirm("Continue? [y/N]: ")? {
                println!("Restore cancelled.");
                return Ok(());
            }
        }

        let storage = self.storage.lock().await.clone();
        let summary = storage.restore_full_backup(&backup_file, overwrite)?;

        println!("Restore complete from {}", summary.backup_file.display());
        println!("  Records in backup: {}", summary.total_records);
        println!("  Restored:          {}", summary.restored);
        println!("  Skipped:           {}", summary.skipped);
        if !summary.failed.is_empty() {
            println!("  Failed:            {}", summary.failed.len());
            for (entry, error) in &summary.failed {
                println!("    {}: {}", entry, error);
            }
        }

        Ok(())
    }

    fn handle_config(&self, show: bool, set: Option<String>, reset: bool) -> Result<()> {
        if reset {
            let defaults = Config::default();
            defaults.save(&self.config_path)?;
            println!("Configuration reset to defaults.");
            return Ok(());
        }

        if let Some(assignment) = set {
            let mut config = self.config.clone();
            config.apply_set(&assignment)?;
            config.save(&self.config_path)?;
            println!("Configuration updated; takes effect on the next run.");
            return Ok(());
        }

        // Default to showing the configuration
        let _ = show;
        println!("Configuration file: {}", self.config_path.display());
        println!("{}", serde_json::to_string_pretty(&self.config)?);
        Ok(())
    }

    /// Resolves a user folder name to its id, erroring when no such
    /// folder exists
    fn folder_id_by_name(&self, storage: &MilestoneStorage, name: &str) -> Result<Uuid> {
        storage
            .find_folder_by_name(name)?
            .map(|folder| folder.id)
            .ok_or_else(|| MsError::FolderNotFound {
                name: name.to_string(),
            })
    }

    /// Day count from today to the milestone date, both taken in the
    /// local time zone
    fn local_day_count(&self, milestone: &Milestone) -> i64 {
        let today = Local::now().date_naive();
        let target = milestone.date.with_timezone(&Local).date_naive();
        calendar_days_between(today, target)
    }

    /// Renders a day count the way the listings show it
    fn format_countdown(&self, days: i64) -> String {
        match Countdown::from_days(days) {
            Countdown::Today => format!("{} 🎉", console::style("today").green().bold()),
            Countdown::Remaining(1) => console::style("in 1 day").green().to_string(),
            Countdown::Remaining(n) => console::style(format!("in {} days", n)).green().to_string(),
            Countdown::Elapsed(1) => console::style("1 day ago").yellow().to_string(),
            Countdown::Elapsed(n) => console::style(format!("{} days ago", n)).yellow().to_string(),
        }
    }

    /// Display milestones in JSON format
    fn display_milestones_json(&self, milestones: &[Milestone], detailed: bool) -> Result<()> {
        if detailed {
            // Full records with all fields
            println!("{}", serde_json::to_string_pretty(milestones)?);
        } else {
            // Simplified records with the fields listings care about
            let simplified: Vec<serde_json::Value> = milestones
                .iter()
                .map(|m| {
                    serde_json::json!({
                        "id": m.id,
                        "title": m.title,
                        "date": m.date.to_rfc3339(),
                        "days": self.local_day_count(m),
                        "pinned": m.pinned,
                        "deleted": m.is_deleted(),
                    })
                })
                .collect();

            println!("{}", serde_json::to_string_pretty(&simplified)?);
        }

        Ok(())
    }

    /// Display milestones in text format
    fn display_milestones_text(
        &self,
        milestones: &[Milestone],
        folder_names: &HashMap<Uuid, String>,
        brief: bool,
    ) -> Result<()> {
        // Use terminal width for separators if available
        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, milestone) in milestones.iter().enumerate() {
            let countdown = self.format_countdown(self.local_day_count(milestone));
            let pin_marker = if milestone.pinned { "📌 " } else { "" };

            if brief {
                println!(
                    "{}  {}{}  ({})",
                    milestone.short_id(),
                    pin_marker,
                    console::style(&milestone.title).bold(),
                    countdown
                );
                continue;
            }

            // Add separator between milestones (except before the first)
            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }

            println!(
                "ID: {} | Date: {} | {}",
                milestone.short_id(),
                milestone.date.with_timezone(&Local).format("%Y-%m-%d"),
                countdown
            );
            println!(
                "Title: {}{}",
                pin_marker,
                console::style(&milestone.title).bold()
            );

            if let Some(name) = milestone.folder_id.and_then(|fid| folder_names.get(&fid)) {
                println!("Folder: {}", console::style(name).cyan());
            }

            if let Some(remark) = &milestone.remark {
                println!("{}", remark);
            }
        }

        Ok(())
    }

    /// Ask a yes/no question on stdout and read the answer from stdin
    fn confirm(&self, prompt: &str) -> Result<bool> {
        print!("{}", prompt);
        stdout().flush().map_err(MsError::Io)?;

        let mut input = String::new();
        stdin().read_line(&mut input).map_err(MsError::Io)?;

        let input = input.trim().to_lowercase();
        Ok(input == "y" || input == "yes")
    }
}
