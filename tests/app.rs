use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;
use tokio::sync::Mutex;

use mstone::{
    App, Commands, Config, FolderCommands, FolderSelector, Milestone, MilestoneStorage, MsError,
};

fn test_app() -> (TempDir, App, Arc<Mutex<MilestoneStorage>>) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = Config {
        data_dir: dir.path().join("data"),
        backup_dir: dir.path().join("backups"),
        auto_backup: false,
        max_backups: 3,
    };

    let mut storage = MilestoneStorage::new(config.clone());
    storage.initialize().expect("initialize storage");

    let storage = Arc::new(Mutex::new(storage));
    let config_path = dir.path().join("config.json");
    let app = App::new(Arc::clone(&storage), config, config_path);

    (dir, app, storage)
}

async fn milestones_in(
    storage: &Arc<Mutex<MilestoneStorage>>,
    selector: FolderSelector,
) -> Vec<Milestone> {
    let storage = storage.lock().await.clone();
    storage
        .milestones_in(&selector, Utc::now())
        .expect("list milestones")
}

fn add(title: &str) -> Commands {
    Commands::Add {
        title: title.to_string(),
        date: "2030-05-01".to_string(),
        remark: None,
        folder: None,
        pin: false,
    }
}

#[tokio::test]
async fn add_creates_a_live_unpinned_milestone() {
    let (_dir, app, storage) = test_app();

    app.run(add("Ship v1")).await.expect("run add");

    let all = milestones_in(&storage, FolderSelector::All).await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "Ship v1");
    assert_eq!(all[0].folder_id, None);
    assert!(!all[0].pinned);
    assert!(all[0].deleted_at.is_none());
}

#[tokio::test]
async fn add_refuses_an_unknown_folder() {
    let (_dir, app, storage) = test_app();

    let result = app
        .run(Commands::Add {
            title: "Orphan".to_string(),
            date: "2030-05-01".to_string(),
            remark: None,
            folder: Some("Nope".to_string()),
            pin: false,
        })
        .await;
    assert!(matches!(result, Err(MsError::FolderNotFound { .. })));

    app.run(Commands::Folder {
        command: FolderCommands::Add {
            name: "Work".to_string(),
        },
    })
    .await
    .expect("create folder");

    // Folder names resolve ignoring case
    app.run(Commands::Add {
        title: "Filed".to_string(),
        date: "2030-05-01".to_string(),
        remark: None,
        folder: Some("work".to_string()),
        pin: true,
    })
    .await
    .expect("add into folder");

    let all = milestones_in(&storage, FolderSelector::All).await;
    assert_eq!(all.len(), 1);
    assert!(all[0].folder_id.is_some());
    assert!(all[0].pinned);
}

#[tokio::test]
async fn delete_then_forced_purge_removes_the_record() {
    let (_dir, app, storage) = test_app();

    app.run(add("Doomed")).await.expect("run add");
    let id = milestones_in(&storage, FolderSelector::All).await[0].short_id();

    app.run(Commands::Delete { id: id.clone() })
        .await
        .expect("run delete");

    assert!(milestones_in(&storage, FolderSelector::All).await.is_empty());
    assert_eq!(milestones_in(&storage, FolderSelector::Deleted).await.len(), 1);

    app.run(Commands::Purge {
        id: Some(id),
        all: false,
        force: true,
    })
    .await
    .expect("run purge");

    assert!(milestones_in(&storage, FolderSelector::Deleted).await.is_empty());
}

#[tokio::test]
async fn purge_refuses_a_live_milestone() {
    let (_dir, app, storage) = test_app();

    app.run(add("Still here")).await.expect("run add");
    let id = milestones_in(&storage, FolderSelector::All).await[0].short_id();

    let result = app
        .run(Commands::Purge {
            id: Some(id),
            all: false,
            force: true,
        })
        .await;
    assert!(matches!(result, Err(MsError::NotDeleted { .. })));
}

#[tokio::test]
async fn forced_purge_all_empties_recently_deleted() {
    let (_dir, app, storage) = test_app();

    for title in ["One", "Two"] {
        app.run(add(title)).await.expect("run add");
    }
    for milestone in milestones_in(&storage, FolderSelector::All).await {
        app.run(Commands::Delete {
            id: milestone.id.to_string(),
        })
        .await
        .expect("run delete");
    }

    app.run(Commands::Purge {
        id: None,
        all: true,
        force: true,
    })
    .await
    .expect("run purge --all");

    assert!(milestones_in(&storage, FolderSelector::Deleted).await.is_empty());
}

#[tokio::test]
async fn edit_needs_at_least_one_change() {
    let (_dir, app, storage) = test_app();

    app.run(add("Original")).await.expect("run add");
    let id = milestones_in(&storage, FolderSelector::All).await[0].short_id();

    let result = app
        .run(Commands::Edit {
            id: id.clone(),
            title: None,
            date: None,
            remark: None,
            clear_remark: false,
        })
        .await;
    assert!(matches!(result, Err(MsError::ApplicationError { .. })));

    app.run(Commands::Edit {
        id: id.clone(),
        title: Some("Renamed".to_string()),
        date: None,
        remark: Some("with a remark".to_string()),
        clear_remark: false,
    })
    .await
    .expect("run edit");

    let all = milestones_in(&storage, FolderSelector::All).await;
    assert_eq!(all[0].title, "Renamed");
    assert_eq!(all[0].remark.as_deref(), Some("with a remark"));

    app.run(Commands::Edit {
        id,
        title: None,
        date: None,
        remark: None,
        clear_remark: true,
    })
    .await
    .expect("run edit --clear-remark");

    let all = milestones_in(&storage, FolderSelector::All).await;
    assert_eq!(all[0].remark, None);
}

#[tokio::test]
async fn pin_and_unpin_round_trip() {
    let (_dir, app, storage) = test_app();

    app.run(add("Featured")).await.expect("run add");
    let id = milestones_in(&storage, FolderSelector::All).await[0].short_id();

    app.run(Commands::Pin { id: id.clone() })
        .await
        .expect("run pin");
    assert_eq!(milestones_in(&storage, FolderSelector::Pinned).await.len(), 1);

    app.run(Commands::Unpin { id }).await.expect("run unpin");
    assert!(milestones_in(&storage, FolderSelector::Pinned).await.is_empty());
}

#[tokio::test]
async fn move_out_of_trash_restores_the_milestone() {
    let (_dir, app, storage) = test_app();

    app.run(add("Wanderer")).await.expect("run add");
    let id = milestones_in(&storage, FolderSelector::All).await[0].short_id();

    app.run(Commands::Delete { id: id.clone() })
        .await
        .expect("run delete");

    app.run(Commands::Move {
        id,
        folder: "none".to_string(),
    })
    .await
    .expect("run move");

    let all = milestones_in(&storage, FolderSelector::All).await;
    assert_eq!(all.len(), 1);
    assert!(all[0].deleted_at.is_none());
    assert!(milestones_in(&storage, FolderSelector::Deleted).await.is_empty());
}

#[tokio::test]
async fn restore_files_the_milestone_into_a_folder() {
    let (_dir, app, storage) = test_app();

    app.run(Commands::Folder {
        command: FolderCommands::Add {
            name: "Comeback".to_string(),
        },
    })
    .await
    .expect("create folder");

    app.run(add("Phoenix")).await.expect("run add");
    let id = milestones_in(&storage, FolderSelector::All).await[0].short_id();

    app.run(Commands::Delete { id: id.clone() })
        .await
        .expect("run delete");

    app.run(Commands::Restore {
        id,
        folder: Some("comeback".to_string()),
    })
    .await
    .expect("run restore");

    let all = milestones_in(&storage, FolderSelector::All).await;
    assert_eq!(all.len(), 1);
    assert!(all[0].folder_id.is_some());
}

#[tokio::test]
async fn folder_rename_and_forced_delete() {
    let (_dir, app, storage) = test_app();

    app.run(Commands::Folder {
        command: FolderCommands::Add {
            name: "Drafts".to_string(),
        },
    })
    .await
    .expect("create folder");

    app.run(Commands::Folder {
        command: FolderCommands::Rename {
            name: "drafts".to_string(),
            new_name: "Ideas".to_string(),
        },
    })
    .await
    .expect("rename folder");

    {
        let storage = storage.lock().await.clone();
        let folders = storage.list_folders().expect("list folders");
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].name, "Ideas");
    }

    app.run(Commands::Folder {
        command: FolderCommands::Delete {
            name: "Ideas".to_string(),
            force: true,
        },
    })
    .await
    .expect("delete folder");

    let storage = storage.lock().await.clone();
    assert!(storage.list_folders().expect("list folders").is_empty());
}

#[tokio::test]
async fn backup_command_writes_where_asked() {
    let (dir, app, _storage) = test_app();

    app.run(add("Archived")).await.expect("run add");

    let output = dir.path().join("my-backup.zip");
    app.run(Commands::Backup {
        output: Some(output.clone()),
    })
    .await
    .expect("run backup");

    assert!(output.exists());

    // Forced restore into the same data set skips everything quietly
    app.run(Commands::RestoreBackup {
        backup_file: output,
        overwrite: false,
        force: true,
    })
    .await
    .expect("run restore-backup");
}

#[tokio::test]
async fn config_set_writes_the_config_file() {
    let (dir, app, _storage) = test_app();

    app.run(Commands::Config {
        show: false,
        set: Some("max_backups=7".to_string()),
        reset: false,
    })
    .await
    .expect("run config --set");

    let config_path = dir.path().join("config.json");
    assert!(config_path.exists());

    let written = Config::load(&config_path).expect("load written config");
    assert_eq!(written.max_backups, 7);
}

#[tokio::test]
async fn list_and_view_render_without_errors() {
    let (_dir, app, storage) = test_app();

    app.run(add("Visible")).await.expect("run add");
    let id = milestones_in(&storage, FolderSelector::All).await[0].short_id();

    app.run(Commands::List {
        folder: "all".to_string(),
        limit: 0,
        json: true,
        brief: false,
    })
    .await
    .expect("run list --json");

    app.run(Commands::View { id, json: true })
        .await
        .expect("run view --json");

    // Unknown folder views fail loudly instead of listing nothing
    let result = app
        .run(Commands::List {
            folder: "No Such Folder".to_string(),
            limit: 0,
            json: false,
            brief: false,
        })
        .await;
    assert!(matches!(result, Err(MsError::FolderNotFound { .. })));
}

#[tokio::test]
async fn search_command_finds_titles_and_remarks() {
    let (_dir, app, _storage) = test_app();

    app.run(Commands::Add {
        title: "Quarterly review".to_string(),
        date: "2030-05-01".to_string(),
        remark: Some("prepare slides".to_string()),
        folder: None,
        pin: false,
    })
    .await
    .expect("run add");

    app.run(Commands::Search {
        query: "slides".to_string(),
        limit: 10,
        json: true,
    })
    .await
    .expect("run search");
}
