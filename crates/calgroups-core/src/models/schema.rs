use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::group::{validate_name, CalendarGroup};
use crate::error::{GroupError, GroupResult};

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: &str = "1.0";

/// Dotted numeric version, `major.minor[.patch...]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaVersion(String);

impl SchemaVersion {
    pub fn parse(version: &str) -> GroupResult<Self> {
        if version.is_empty() {
            return Err(GroupError::validation("Version must be a non-empty string"));
        }
        let parts: Vec<&str> = version.split('.').collect();
        if parts.len() < 2 {
            return Err(GroupError::validation(
                "Version must be in format 'major.minor' or 'major.minor.patch'",
            ));
        }
        if parts.iter().any(|part| part.parse::<u64>().is_err()) {
            return Err(GroupError::validation("Version parts must be numeric"));
        }
        Ok(Self(version.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric components, e.g. `[1, 0]` for "1.0".
    pub fn components(&self) -> Vec<u64> {
        self.0.split('.').filter_map(|p| p.parse().ok()).collect()
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self(CURRENT_SCHEMA_VERSION.to_string())
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = GroupError;

    fn try_from(value: String) -> GroupResult<Self> {
        Self::parse(&value)
    }
}

impl From<SchemaVersion> for String {
    fn from(version: SchemaVersion) -> Self {
        version.0
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything stored in the groups file: a version tag plus all groups.
///
/// The map is an index keyed by `CalendarGroup::name`. It is only changed
/// through the methods below, which keep every key equal to its group's name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSchema")]
pub struct GroupsSchema {
    version: SchemaVersion,
    groups: BTreeMap<String, CalendarGroup>,
}

#[derive(Debug, Deserialize)]
struct RawSchema {
    #[serde(default)]
    version: SchemaVersion,
    #[serde(default)]
    groups: BTreeMap<String, CalendarGroup>,
}

impl TryFrom<RawSchema> for GroupsSchema {
    type Error = GroupError;

    fn try_from(raw: RawSchema) -> GroupResult<Self> {
        for (key, group) in &raw.groups {
            if key != group.name() {
                return Err(GroupError::validation(format!(
                    "Group key '{}' must match group name '{}'",
                    key,
                    group.name()
                )));
            }
        }
        Ok(Self {
            version: raw.version,
            groups: raw.groups,
        })
    }
}

impl GroupsSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a validated schema from a raw (already migrated) JSON value.
    pub fn from_value(value: Value) -> GroupResult<Self> {
        serde_json::from_value(value).map_err(|e| GroupError::validation(e.to_string()))
    }

    pub fn to_value(&self) -> GroupResult<Value> {
        serde_json::to_value(self).map_err(|e| GroupError::storage(e.to_string()))
    }

    pub fn from_json(json: &str) -> GroupResult<Self> {
        serde_json::from_str(json).map_err(|e| GroupError::validation(e.to_string()))
    }

    pub fn to_json(&self) -> GroupResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| GroupError::storage(e.to_string()))
    }

    pub fn version(&self) -> &SchemaVersion {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn get_group(&self, name: &str) -> Option<&CalendarGroup> {
        self.groups.get(name)
    }

    pub(crate) fn get_group_mut(&mut self, name: &str) -> Option<&mut CalendarGroup> {
        self.groups.get_mut(name)
    }

    /// Groups in key order.
    pub fn groups(&self) -> impl Iterator<Item = &CalendarGroup> {
        self.groups.values()
    }

    /// Returns false (and drops `group`) if the name is taken.
    pub fn add_group(&mut self, group: CalendarGroup) -> bool {
        if self.groups.contains_key(group.name()) {
            return false;
        }
        self.groups.insert(group.name().to_string(), group);
        true
    }

    pub fn remove_group(&mut self, name: &str) -> Option<CalendarGroup> {
        self.groups.remove(name)
    }

    /// Move a group to a new key, updating its name.
    pub fn rename_group(&mut self, old_name: &str, new_name: &str) -> GroupResult<&CalendarGroup> {
        if !self.groups.contains_key(old_name) {
            return Err(GroupError::GroupNotFound(old_name.to_string()));
        }
        let new_name = validate_name(new_name)?;
        if self.groups.contains_key(&new_name) {
            return Err(GroupError::AlreadyExists(new_name));
        }

        let mut group = self
            .groups
            .remove(old_name)
            .ok_or_else(|| GroupError::GroupNotFound(old_name.to_string()))?;
        group.rename(new_name.clone());
        let group = self.groups.entry(new_name).or_insert(group);
        Ok(&*group)
    }
}

/// Name and size of a single group, used in statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSize {
    pub name: String,
    pub calendar_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupStats {
    pub total_groups: usize,
    /// Distinct calendar ids across all groups.
    pub total_calendars: usize,
    pub average_calendars_per_group: f64,
    pub largest_group: Option<GroupSize>,
    pub smallest_group: Option<GroupSize>,
}
