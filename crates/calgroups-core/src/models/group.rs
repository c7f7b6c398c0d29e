use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;
use crate::error::{GroupError, GroupResult};

/// Maximum length of a group name, in characters, after trimming.
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum length of a group description, in characters, after trimming.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Characters that may not appear in a group name.
pub const FORBIDDEN_NAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// A named collection of calendar identifiers.
///
/// Fields are private: every constructor and mutator validates, so a
/// `CalendarGroup` value is always well formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGroup")]
pub struct CalendarGroup {
    name: String,
    calendar_ids: Vec<String>,
    description: String,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

/// Unvalidated shape of a group as found in a JSON file.
#[derive(Debug, Deserialize)]
struct RawGroup {
    name: String,
    #[serde(default)]
    calendar_ids: Vec<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    created: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    modified: Option<DateTime<Utc>>,
}

impl TryFrom<RawGroup> for CalendarGroup {
    type Error = GroupError;

    fn try_from(raw: RawGroup) -> GroupResult<Self> {
        let now = Utc::now();
        let created = raw.created.unwrap_or(now);
        Ok(Self {
            name: validate_name(&raw.name)?,
            calendar_ids: normalize_calendar_ids(raw.calendar_ids)?,
            description: validate_description(raw.description.as_deref().unwrap_or(""))?,
            created,
            modified: raw.modified.unwrap_or(now).max(created),
        })
    }
}

/// Trim and check a group name.
pub fn validate_name(name: &str) -> GroupResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GroupError::validation("Group name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(GroupError::validation(format!(
            "Group name cannot be longer than {} characters",
            MAX_NAME_LENGTH
        )));
    }
    if name.contains(&FORBIDDEN_NAME_CHARS[..]) {
        let listed: Vec<String> = FORBIDDEN_NAME_CHARS.iter().map(|c| c.to_string()).collect();
        return Err(GroupError::validation(format!(
            "Group name cannot contain: {}",
            listed.join(", ")
        )));
    }
    Ok(name.to_string())
}

/// Drop duplicate ids (first occurrence wins) and reject blank ones.
pub fn normalize_calendar_ids(ids: Vec<String>) -> GroupResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if id.trim().is_empty() {
            return Err(GroupError::validation(
                "All calendar IDs must be non-empty strings",
            ));
        }
        if seen.insert(id.clone()) {
            unique.push(id);
        }
    }
    Ok(unique)
}

/// Trim and check a description.
pub fn validate_description(description: &str) -> GroupResult<String> {
    let description = description.trim();
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(GroupError::validation(format!(
            "Description cannot be longer than {} characters",
            MAX_DESCRIPTION_LENGTH
        )));
    }
    Ok(description.to_string())
}

impl CalendarGroup {
    pub fn new(name: &str, calendar_ids: Vec<String>, description: &str) -> GroupResult<Self> {
        let now = Utc::now();
        Ok(Self {
            name: validate_name(name)?,
            calendar_ids: normalize_calendar_ids(calendar_ids)?,
            description: validate_description(description)?,
            created: now,
            modified: now,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn calendar_ids(&self) -> &[String] {
        &self.calendar_ids
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    pub fn calendar_count(&self) -> usize {
        self.calendar_ids.len()
    }

    pub fn contains_calendar(&self, calendar_id: &str) -> bool {
        self.calendar_ids.iter().any(|id| id == calendar_id)
    }

    /// Returns false if the calendar was already in the group.
    pub fn add_calendar(&mut self, calendar_id: &str) -> GroupResult<bool> {
        if calendar_id.trim().is_empty() {
            return Err(GroupError::validation(
                "All calendar IDs must be non-empty strings",
            ));
        }
        if self.contains_calendar(calendar_id) {
            return Ok(false);
        }
        self.calendar_ids.push(calendar_id.to_string());
        self.touch();
        Ok(true)
    }

    /// Returns false if the calendar was not in the group.
    pub fn remove_calendar(&mut self, calendar_id: &str) -> bool {
        match self.calendar_ids.iter().position(|id| id == calendar_id) {
            Some(index) => {
                self.calendar_ids.remove(index);
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Replace the calendar list wholesale.
    pub fn set_calendar_ids(&mut self, calendar_ids: Vec<String>) -> GroupResult<()> {
        self.calendar_ids = normalize_calendar_ids(calendar_ids)?;
        self.touch();
        Ok(())
    }

    pub fn update_description(&mut self, description: &str) -> GroupResult<()> {
        self.description = validate_description(description)?;
        self.touch();
        Ok(())
    }

    /// Apply a partial update. Nothing changes unless every present field is valid.
    /// `modified` is bumped even when the update is empty.
    pub fn apply_update(&mut self, update: &GroupUpdate) -> GroupResult<()> {
        let calendar_ids = update
            .calendar_ids
            .clone()
            .map(normalize_calendar_ids)
            .transpose()?;
        let description = update
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?;

        if let Some(ids) = calendar_ids {
            self.calendar_ids = ids;
        }
        if let Some(description) = description {
            self.description = description;
        }
        self.touch();
        Ok(())
    }

    /// Only `GroupsSchema` renames groups, so the map key stays in sync.
    /// `new_name` must already have passed `validate_name`.
    pub(crate) fn rename(&mut self, new_name: String) {
        self.name = new_name;
        self.touch();
    }

    fn touch(&mut self) {
        self.modified = Utc::now().max(self.created);
    }
}

/// Partial update for a group. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupUpdate {
    pub calendar_ids: Option<Vec<String>>,
    pub description: Option<String>,
}

impl GroupUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calendar_ids(mut self, calendar_ids: Vec<String>) -> Self {
        self.calendar_ids = Some(calendar_ids);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.calendar_ids.is_none() && self.description.is_none()
    }
}

// ============================================================================
// Tests
// ============================================================================
