use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::{GroupError, GroupResult};
use crate::models::{CalendarGroup, GroupSize, GroupStats, GroupUpdate, GroupsSchema};
use crate::storage::{GroupStorage, GroupStore};
use crate::utils::cmp_ignore_case;

/// CRUD over calendar groups with a read-through schema cache.
///
/// The schema is loaded from storage on first use and kept until `refresh`.
/// Writes mutate the cached schema, persist it, and keep it as the cache, so
/// reads after a write do not touch storage. A failed write drops the cache.
///
/// Methods take `&mut self`; callers sharing a manager must serialize access.
pub struct GroupManager<S: GroupStore = GroupStorage> {
    storage: S,
    schema_cache: Option<GroupsSchema>,
}

impl<S: GroupStore> GroupManager<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            schema_cache: None,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn is_cached(&self) -> bool {
        self.schema_cache.is_some()
    }

    // ===== Cache =====

    fn schema(&mut self) -> GroupResult<&mut GroupsSchema> {
        let schema = match self.schema_cache.take() {
            Some(schema) => schema,
            None => {
                let schema = GroupsSchema::from_value(self.storage.load())?;
                debug!(groups = schema.len(), version = %schema.version(), "Schema loaded");
                schema
            }
        };
        Ok(self.schema_cache.insert(schema))
    }

    fn persist(&mut self) -> GroupResult<()> {
        let Some(schema) = self.schema_cache.as_ref() else {
            return Ok(());
        };
        let result = schema
            .to_value()
            .and_then(|data| self.storage.save(&data));
        if let Err(e) = &result {
            warn!(error = %e, "Failed to persist groups, dropping cache");
            self.schema_cache = None;
        }
        result
    }

    /// Discard the cached schema so the next call reads from storage.
    /// Use after another process may have changed the groups file.
    pub fn refresh(&mut self) {
        debug!("Schema cache invalidated");
        self.schema_cache = None;
    }

    // ===== Groups =====

    pub fn create_group(
        &mut self,
        name: &str,
        calendar_ids: Vec<String>,
        description: &str,
    ) -> GroupResult<CalendarGroup> {
        let schema = self.schema()?;
        if schema.contains(name.trim()) {
            return Err(GroupError::AlreadyExists(name.trim().to_string()));
        }

        let group = CalendarGroup::new(name, calendar_ids, description)?;
        schema.add_group(group.clone());
        self.persist()?;

        info!(group = %group.name(), calendars = group.calendar_count(), "Group created");
        Ok(group)
    }

    /// Replace calendar ids and/or the description. `modified` is always bumped.
    pub fn update_group(&mut self, name: &str, update: &GroupUpdate) -> GroupResult<CalendarGroup> {
        let group = self
            .schema()?
            .get_group_mut(name)
            .ok_or_else(|| GroupError::GroupNotFound(name.to_string()))?;
        group.apply_update(update)?;
        let updated = group.clone();
        self.persist()?;

        debug!(group = %name, "Group updated");
        Ok(updated)
    }

    /// Returns false if there was no such group.
    pub fn delete_group(&mut self, name: &str) -> GroupResult<bool> {
        if self.schema()?.remove_group(name).is_none() {
            return Ok(false);
        }
        self.persist()?;

        info!(group = %name, "Group deleted");
        Ok(true)
    }

    pub fn get_group(&mut self, name: &str) -> GroupResult<Option<CalendarGroup>> {
        Ok(self.schema()?.get_group(name).cloned())
    }

    /// All groups, sorted case-insensitively by name.
    pub fn list_groups(&mut self) -> GroupResult<Vec<CalendarGroup>> {
        let mut groups: Vec<CalendarGroup> = self.schema()?.groups().cloned().collect();
        groups.sort_by(|a, b| cmp_ignore_case(a.name(), b.name()));
        Ok(groups)
    }

    pub fn rename_group(&mut self, old_name: &str, new_name: &str) -> GroupResult<CalendarGroup> {
        let renamed = self.schema()?.rename_group(old_name, new_name)?.clone();
        self.persist()?;

        info!(from = %old_name, to = %renamed.name(), "Group renamed");
        Ok(renamed)
    }

    // ===== Membership =====

    /// Returns false if the calendar was already in the group; nothing is written then.
    pub fn add_calendar_to_group(
        &mut self,
        group_name: &str,
        calendar_id: &str,
    ) -> GroupResult<bool> {
        let group = self
            .schema()?
            .get_group_mut(group_name)
            .ok_or_else(|| GroupError::GroupNotFound(group_name.to_string()))?;
        let added = group.add_calendar(calendar_id)?;
        if added {
            self.persist()?;
            debug!(group = %group_name, calendar = %calendar_id, "Calendar added");
        }
        Ok(added)
    }

    /// Returns false if the calendar was not in the group; nothing is written then.
    pub fn remove_calendar_from_group(
        &mut self,
        group_name: &str,
        calendar_id: &str,
    ) -> GroupResult<bool> {
        let group = self
            .schema()?
            .get_group_mut(group_name)
            .ok_or_else(|| GroupError::GroupNotFound(group_name.to_string()))?;
        let removed = group.remove_calendar(calendar_id);
        if removed {
            self.persist()?;
            debug!(group = %group_name, calendar = %calendar_id, "Calendar removed");
        }
        Ok(removed)
    }

    pub fn get_calendars_in_group(&mut self, group_name: &str) -> GroupResult<Vec<String>> {
        self.get_group(group_name)?
            .map(|group| group.calendar_ids().to_vec())
            .ok_or_else(|| GroupError::GroupNotFound(group_name.to_string()))
    }

    /// Groups that list `calendar_id`, in `list_groups` order.
    pub fn get_groups_containing_calendar(
        &mut self,
        calendar_id: &str,
    ) -> GroupResult<Vec<CalendarGroup>> {
        Ok(self
            .list_groups()?
            .into_iter()
            .filter(|group| group.contains_calendar(calendar_id))
            .collect())
    }

    // ===== Statistics / Backup =====

    /// Ties for largest/smallest go to the first group in `list_groups` order.
    pub fn group_stats(&mut self) -> GroupResult<GroupStats> {
        let groups = self.list_groups()?;
        let Some(first) = groups.first() else {
            return Ok(GroupStats::default());
        };

        let mut largest = first;
        let mut smallest = first;
        let mut distinct: HashSet<&str> = HashSet::new();
        let mut memberships = 0;
        for group in &groups {
            if group.calendar_count() > largest.calendar_count() {
                largest = group;
            }
            if group.calendar_count() < smallest.calendar_count() {
                smallest = group;
            }
            memberships += group.calendar_count();
            distinct.extend(group.calendar_ids().iter().map(String::as_str));
        }

        Ok(GroupStats {
            total_groups: groups.len(),
            total_calendars: distinct.len(),
            average_calendars_per_group: memberships as f64 / groups.len() as f64,
            largest_group: Some(size_of(largest)),
            smallest_group: Some(size_of(smallest)),
        })
    }

    pub fn backup(&self) -> GroupResult<PathBuf> {
        self.storage.backup()
    }
}

fn size_of(group: &CalendarGroup) -> GroupSize {
    GroupSize {
        name: group.name().to_string(),
        calendar_count: group.calendar_count(),
    }
}

// ============================================================================
// Tests
// ============================================================================
