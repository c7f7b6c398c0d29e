//! Durable JSON persistence for calendar groups.
//!
//! `GroupStorage` keeps the whole schema in one JSON file. Writes go to a
//! temporary file that is synced and then renamed over the existing file, and the
//! previous file is copied into `backups/` first. Reads never fail: a corrupt
//! file is recovered from the newest readable backup, or replaced by an empty
//! schema when no backup can be read.

pub mod backup;
pub mod file;
pub mod migrate;

pub use file::{GroupStorage, DEFAULT_MAX_BACKUPS, GROUPS_FILE};
pub use migrate::migrate_schema;

use std::path::PathBuf;

use serde_json::{json, Value};

use crate::error::GroupResult;
use crate::models::CURRENT_SCHEMA_VERSION;

/// Persistence used by `GroupManager`. Works on raw (already migrated) JSON
/// documents so that schema validation stays in the manager.
pub trait GroupStore {
    /// Load the current document. Never fails; see `GroupStorage::load_groups`.
    fn load(&self) -> Value;

    /// Replace the stored document.
    fn save(&self, data: &Value) -> GroupResult<()>;

    /// Snapshot the current document and return where it was written.
    fn backup(&self) -> GroupResult<PathBuf>;
}

/// `{"version": "1.0", "groups": {}}`
pub fn empty_schema() -> Value {
    json!({ "version": CURRENT_SCHEMA_VERSION, "groups": {} })
}
