use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::backup::{self, BackupFile};
use super::{empty_schema, migrate_schema, GroupStore};
use crate::config::Config;
use crate::error::{GroupError, GroupResult};

/// Default primary file name.
pub const GROUPS_FILE: &str = "calendar_groups.json";

/// Backups kept after each new backup is taken.
pub const DEFAULT_MAX_BACKUPS: usize = 10;

/// Backup directory, created beside the primary file.
const BACKUP_DIR: &str = "backups";

/// Temp file prefix. The leading dot keeps it out of casual listings.
const TEMP_PREFIX: &str = ".calendar_groups";

pub struct GroupStorage {
    storage_path: PathBuf,
    backup_dir: PathBuf,
    max_backups: usize,
}

impl GroupStorage {
    /// Use `storage_path` as the primary file. Creates its directory and the
    /// backup directory beside it.
    pub fn new(storage_path: impl Into<PathBuf>) -> GroupResult<Self> {
        let storage_path = storage_path.into();
        let backup_dir = parent_dir(&storage_path).join(BACKUP_DIR);
        fs::create_dir_all(&backup_dir)?;
        Ok(Self {
            storage_path,
            backup_dir,
            max_backups: DEFAULT_MAX_BACKUPS,
        })
    }

    pub fn from_config(config: &Config) -> GroupResult<Self> {
        let storage = Self::new(config.groups_path()?)?;
        Ok(storage.with_max_backups(config.backup_limit()))
    }

    /// At least one backup is always kept.
    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Load and migrate the groups document.
    ///
    /// A missing file yields the empty schema. An unreadable or malformed file
    /// is recovered from the newest readable backup, falling back to the empty
    /// schema when none can be read.
    pub fn load_groups(&self) -> Value {
        if !self.storage_path.exists() {
            debug!(path = %self.storage_path.display(), "No groups file, using empty schema");
            return empty_schema();
        }

        match read_document(&self.storage_path) {
            Ok(data) => migrate_schema(data),
            Err(reason) => {
                warn!(
                    path = %self.storage_path.display(),
                    error = %reason,
                    "Groups file is unreadable, trying backups"
                );
                if let Some(data) = self.restore_from_backup() {
                    return data;
                }
                warn!("No usable backup found, starting with an empty schema");
                empty_schema()
            }
        }
    }

    /// Atomically replace the groups file with `data`.
    ///
    /// The existing file is backed up first. On failure the temp file is
    /// removed and the primary file is left as it was.
    pub fn save_groups(&self, data: &Value) -> GroupResult<()> {
        if self.storage_path.exists() {
            self.backup_file()?;
        }

        let contents = serde_json::to_string_pretty(data)
            .map_err(|e| GroupError::storage(format!("Failed to serialize groups: {}", e)))?;
        self.write_atomic(contents.as_bytes())
            .map_err(|e| GroupError::storage(format!("Failed to save groups: {}", e)))?;

        debug!(path = %self.storage_path.display(), bytes = contents.len(), "Groups saved");
        Ok(())
    }

    /// Copy the current file into the backup directory and prune old backups.
    pub fn backup_file(&self) -> GroupResult<PathBuf> {
        if !self.storage_path.exists() {
            return Err(GroupError::NoBackupSource(self.storage_path.clone()));
        }

        fs::create_dir_all(&self.backup_dir)?;
        let backup_path = self.next_backup_path();
        fs::copy(&self.storage_path, &backup_path).map_err(|e| {
            GroupError::storage(format!(
                "Failed to back up groups to {}: {}",
                backup_path.display(),
                e
            ))
        })?;
        debug!(path = %backup_path.display(), "Backup created");

        self.prune_backups(&backup_path);
        Ok(backup_path)
    }

    /// Backup files, newest first.
    pub fn list_backups(&self) -> Vec<PathBuf> {
        self.backup_files().into_iter().map(|b| b.path).collect()
    }

    fn backup_files(&self) -> Vec<BackupFile> {
        let Ok(entries) = fs::read_dir(&self.backup_dir) else {
            return Vec::new();
        };

        let mut files: Vec<BackupFile> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(backup::is_backup_name)
            })
            .map(|path| BackupFile::from_path(&path))
            .collect();

        files.sort_by(BackupFile::newest_first);
        files
    }

    /// Name for the next backup. It always sorts above every existing
    /// backup: if the clock is behind the newest name (clock stepped back),
    /// the newest stamp is reused with the next sequence number.
    fn next_backup_path(&self) -> PathBuf {
        let now = backup::truncate_to_second(Utc::now().naive_utc());
        let newest = self
            .backup_files()
            .iter()
            .filter_map(BackupFile::parsed)
            .max();
        let (at, mut seq) = match newest {
            Some((stamp, seq)) if stamp >= now => {
                if stamp > now {
                    warn!(newest = %stamp, now = %now, "Clock is behind newest backup");
                }
                (stamp, seq + 1)
            }
            _ => (now, 0),
        };
        loop {
            let candidate = self.backup_dir.join(backup::backup_file_name(at, seq));
            if !candidate.exists() {
                return candidate;
            }
            seq += 1;
        }
    }

    fn restore_from_backup(&self) -> Option<Value> {
        for file in self.backup_files() {
            match read_document(&file.path) {
                Ok(data) => {
                    info!(path = %file.path.display(), "Recovered groups from backup");
                    return Some(migrate_schema(data));
                }
                Err(reason) => {
                    warn!(
                        path = %file.path.display(),
                        error = %reason,
                        "Skipping unreadable backup"
                    );
                }
            }
        }
        None
    }

    /// Keep the newest `max_backups`, never removing `keep`. Best effort:
    /// failures are logged and skipped.
    fn prune_backups(&self, keep: &Path) {
        let stale = self
            .backup_files()
            .into_iter()
            .filter(|file| file.path != keep)
            .skip(self.max_backups.saturating_sub(1));
        for old in stale {
            match fs::remove_file(&old.path) {
                Ok(()) => debug!(path = %old.path.display(), "Pruned old backup"),
                Err(e) => warn!(path = %old.path.display(), error = %e, "Failed to prune backup"),
            }
        }
    }

    fn write_atomic(&self, contents: &[u8]) -> std::io::Result<()> {
        let dir = parent_dir(&self.storage_path);
        // Same directory as the target so the rename stays on one filesystem.
        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".tmp")
            .tempfile_in(&dir)?;

        temp.write_all(contents)?;
        temp.flush()?;
        temp.as_file().sync_all()?;

        // A failed persist hands the temp file back; dropping it deletes it.
        temp.persist(&self.storage_path).map_err(|e| e.error)?;

        #[cfg(unix)]
        {
            if let Err(e) = fs::File::open(&dir).and_then(|d| d.sync_all()) {
                warn!(dir = %dir.display(), error = %e, "Groups directory sync failed");
            }
        }

        Ok(())
    }
}

impl GroupStore for GroupStorage {
    fn load(&self) -> Value {
        self.load_groups()
    }

    fn save(&self, data: &Value) -> GroupResult<()> {
        self.save_groups(data)
    }

    fn backup(&self) -> GroupResult<PathBuf> {
        self.backup_file()
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Read a JSON object from disk. Any other outcome is reported as corrupt.
fn read_document(path: &Path) -> Result<Value, String> {
    let contents = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let value: Value = serde_json::from_str(&contents).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err("groups document is not a JSON object".to_string());
    }
    Ok(value)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn storage(dir: &TempDir) -> GroupStorage {
        GroupStorage::new(dir.path().join(GROUPS_FILE)).unwrap()
    }

    fn doc(group: &str) -> Value {
        json!({
            "version": "1.0",
            "groups": { group: { "name": group, "calendar_ids": ["cal-1"] } }
        })
    }

    #[test]
    fn test_new_creates_backup_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b").join(GROUPS_FILE);
        let storage = GroupStorage::new(&nested).unwrap();
        assert!(storage.backup_dir().is_dir());
        assert_eq!(storage.backup_dir(), dir.path().join("a").join("b").join("backups"));
    }

    #[test]
    fn test_load_missing_file_returns_empty_schema() {
        let dir = TempDir::new().unwrap();
        assert_eq!(storage(&dir).load_groups(), empty_schema());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        storage.save_groups(&doc("Work")).unwrap();
        assert_eq!(storage.load_groups(), doc("Work"));
    }

    #[test]
    fn test_first_save_takes_no_backup() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        storage.save_groups(&doc("Work")).unwrap();
        assert!(storage.list_backups().is_empty());
    }

    #[test]
    fn test_save_backs_up_previous_contents() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        storage.save_groups(&doc("Work")).unwrap();
        storage.save_groups(&doc("Home")).unwrap();

        let backups = storage.list_backups();
        assert_eq!(backups.len(), 1);
        let backed_up: Value =
            serde_json::from_str(&fs::read_to_string(&backups[0]).unwrap()).unwrap();
        assert_eq!(backed_up, doc("Work"));
        assert_eq!(storage.load_groups(), doc("Home"));
    }

    #[test]
    fn test_backups_are_pruned() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        for i in 0..15 {
            storage.save_groups(&doc(&format!("g{}", i))).unwrap();
        }

        let backups = storage.list_backups();
        assert_eq!(backups.len(), DEFAULT_MAX_BACKUPS);
        // Newest backup holds the document written just before the last save
        let newest: Value =
            serde_json::from_str(&fs::read_to_string(&backups[0]).unwrap()).unwrap();
        assert_eq!(newest, doc("g13"));
    }

    #[test]
    fn test_custom_backup_limit() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).with_max_backups(2);
        for i in 0..5 {
            storage.save_groups(&doc(&format!("g{}", i))).unwrap();
        }
        assert_eq!(storage.list_backups().len(), 2);
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        storage.save_groups(&doc("Work")).unwrap();
        storage.save_groups(&doc("Home")).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_save_failure_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("gone");
        let storage = GroupStorage::new(root.join(GROUPS_FILE)).unwrap();
        fs::remove_dir_all(&root).unwrap();

        let err = storage.save_groups(&doc("Work")).unwrap_err();
        assert!(err.is_storage());
        assert!(!storage.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_save_keeps_primary_and_backup() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let root = dir.path().join("data");
        let storage = GroupStorage::new(root.join(GROUPS_FILE)).unwrap();
        storage.save_groups(&doc("First")).unwrap();

        // Primary directory read-only; backups/ keeps its own permissions.
        fs::set_permissions(&root, fs::Permissions::from_mode(0o555)).unwrap();
        let write_check = root.join("write_check");
        if fs::File::create(&write_check).is_ok() {
            // Permissions are not enforced (running as root).
            let _ = fs::remove_file(&write_check);
            fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = storage.save_groups(&doc("Second"));
        let leftovers: Vec<_> = fs::read_dir(&root)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(result.unwrap_err().is_storage());
        assert!(leftovers.is_empty());
        assert_eq!(storage.load_groups(), doc("First"));

        let backups = storage.list_backups();
        assert_eq!(backups.len(), 1);
        let backed_up: Value =
            serde_json::from_str(&fs::read_to_string(&backups[0]).unwrap()).unwrap();
        assert_eq!(backed_up, doc("First"));
    }

    #[test]
    fn test_backup_sorts_newest_when_clock_is_behind() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let ahead = backup::truncate_to_second(Utc::now().naive_utc())
            + chrono::Duration::minutes(30);
        for seq in 0..DEFAULT_MAX_BACKUPS as u32 {
            fs::write(
                storage.backup_dir().join(backup::backup_file_name(ahead, seq)),
                doc("Future").to_string(),
            )
            .unwrap();
        }

        storage.save_groups(&doc("Old")).unwrap();
        storage.save_groups(&doc("Current")).unwrap();

        let backups = storage.list_backups();
        assert_eq!(backups.len(), DEFAULT_MAX_BACKUPS);
        let newest: Value =
            serde_json::from_str(&fs::read_to_string(&backups[0]).unwrap()).unwrap();
        assert_eq!(newest, doc("Old"));

        fs::write(storage.path(), "{ not json").unwrap();
        assert_eq!(storage.load_groups(), doc("Old"));
    }

    #[test]
    fn test_prune_never_removes_new_backup() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).with_max_backups(1);
        storage.save_groups(&doc("Work")).unwrap();
        fs::write(
            storage.backup_dir().join("calendar_groups_29990101_000000.json"),
            doc("Far").to_string(),
        )
        .unwrap();

        let path = storage.backup_file().unwrap();
        assert!(path.exists());
        assert_eq!(storage.list_backups(), vec![path]);
    }

    #[test]
    fn test_backup_without_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = storage(&dir).backup_file().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_backup_file_copies() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        storage.save_groups(&doc("Work")).unwrap();

        let path = storage.backup_file().unwrap();
        assert!(path.starts_with(storage.backup_dir()));
        assert!(storage.path().exists());
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(backup::parse_backup_name(name).is_some());
    }

    #[test]
    fn test_corrupt_file_recovers_from_newest_backup() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        storage.save_groups(&doc("First")).unwrap();
        storage.save_groups(&doc("Second")).unwrap();
        storage.save_groups(&doc("Third")).unwrap();

        fs::write(storage.path(), "{ not json").unwrap();
        assert_eq!(storage.load_groups(), doc("Second"));
    }

    #[test]
    fn test_corrupt_backups_are_skipped() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        storage.save_groups(&doc("First")).unwrap();
        storage.save_groups(&doc("Second")).unwrap();
        storage.save_groups(&doc("Third")).unwrap();

        let backups = storage.list_backups();
        fs::write(&backups[0], "garbage").unwrap();
        fs::write(storage.path(), "").unwrap();

        assert_eq!(storage.load_groups(), doc("First"));
    }

    #[test]
    fn test_corrupt_file_without_backups_returns_empty() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        fs::write(storage.path(), "[1, 2, 3]").unwrap();
        assert_eq!(storage.load_groups(), empty_schema());
    }

    #[test]
    fn test_recovered_backup_is_migrated() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let legacy = json!({ "Work": { "name": "Work", "calendar_ids": [] } });
        fs::write(
            storage.backup_dir().join("calendar_groups_20260101_000000.json"),
            legacy.to_string(),
        )
        .unwrap();
        fs::write(storage.path(), "nope").unwrap();

        let loaded = storage.load_groups();
        assert_eq!(loaded["version"], "1.0");
        assert_eq!(loaded["groups"], legacy);
    }

    #[test]
    fn test_load_migrates_legacy_file() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        fs::write(storage.path(), r#"{"groups": {}}"#).unwrap();
        assert_eq!(storage.load_groups(), empty_schema());
    }

    #[test]
    fn test_unrelated_files_in_backup_dir_are_ignored() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        fs::write(storage.backup_dir().join("notes.txt"), "hi").unwrap();
        fs::write(storage.backup_dir().join("calendar_groups_x.txt"), "hi").unwrap();
        assert!(storage.list_backups().is_empty());
    }
}
