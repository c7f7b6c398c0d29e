//! Backup file naming and ordering.
//!
//! Backups are named `calendar_groups_<YYYYMMDD_HHMMSS>[_<seq>].json` with a
//! UTC timestamp. The timestamp and sequence in the name decide which backup
//! is newest; file modification time is only used for names that do not parse.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

pub const BACKUP_PREFIX: &str = "calendar_groups_";
pub const BACKUP_SUFFIX: &str = ".json";

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const STAMP_LEN: usize = 15;

/// File name for a backup taken at `at`. `seq` disambiguates backups taken
/// within the same second; 0 means no suffix.
pub fn backup_file_name(at: NaiveDateTime, seq: u32) -> String {
    let stamp = at.format(STAMP_FORMAT);
    if seq == 0 {
        format!("{}{}{}", BACKUP_PREFIX, stamp, BACKUP_SUFFIX)
    } else {
        format!("{}{}_{}{}", BACKUP_PREFIX, stamp, seq, BACKUP_SUFFIX)
    }
}

/// Parse the timestamp and sequence number out of a backup file name.
pub fn parse_backup_name(file_name: &str) -> Option<(NaiveDateTime, u32)> {
    let body = file_name
        .strip_prefix(BACKUP_PREFIX)?
        .strip_suffix(BACKUP_SUFFIX)?;
    let stamp = body.get(..STAMP_LEN)?;
    let at = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
    let seq = match &body[STAMP_LEN..] {
        "" => 0,
        rest => rest.strip_prefix('_')?.parse().ok()?,
    };
    Some((at, seq))
}

/// Backup names have second resolution.
pub fn truncate_to_second(at: NaiveDateTime) -> NaiveDateTime {
    at.with_nanosecond(0).unwrap_or(at)
}

/// Whether a file name looks like a backup (used for globbing the backup dir).
pub fn is_backup_name(file_name: &str) -> bool {
    file_name.starts_with(BACKUP_PREFIX) && file_name.ends_with(BACKUP_SUFFIX)
}

#[derive(Debug, Clone)]
pub struct BackupFile {
    pub path: PathBuf,
    parsed: Option<(NaiveDateTime, u32)>,
    sort_key: (NaiveDateTime, u32),
}

impl BackupFile {
    pub fn new(path: PathBuf, modified: Option<SystemTime>) -> Self {
        let parsed = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_backup_name);
        let sort_key = parsed.unwrap_or_else(|| {
            let at = modified
                .map(|t| DateTime::<Utc>::from(t).naive_utc())
                .unwrap_or(NaiveDateTime::MIN);
            (at, 0)
        });
        Self {
            path,
            parsed,
            sort_key,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        Self::new(path.to_path_buf(), modified)
    }

    /// Timestamp and sequence from the file name, if it parses.
    pub fn parsed(&self) -> Option<(NaiveDateTime, u32)> {
        self.parsed
    }

    /// Newest first.
    pub fn newest_first(a: &BackupFile, b: &BackupFile) -> Ordering {
        b.sort_key.cmp(&a.sort_key)
    }
}
