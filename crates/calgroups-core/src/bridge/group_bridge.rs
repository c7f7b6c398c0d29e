use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::report::{CleanupReport, GroupCalendarInfo, IntegrationStats};
use crate::calendar::CalendarSource;
use crate::error::{GroupError, GroupResult};
use crate::manager::GroupManager;
use crate::models::{CalendarEvent, CalendarGroup, GroupUpdate};
use crate::storage::{GroupStorage, GroupStore};

/// Name-based group operations on top of a `GroupManager`.
pub struct GroupCalendarBridge<C: CalendarSource, S: GroupStore = GroupStorage> {
    calendars: C,
    groups: GroupManager<S>,
}

impl<C: CalendarSource, S: GroupStore> GroupCalendarBridge<C, S> {
    pub fn new(calendars: C, groups: GroupManager<S>) -> Self {
        Self { calendars, groups }
    }

    pub fn calendars(&self) -> &C {
        &self.calendars
    }

    pub fn manager(&mut self) -> &mut GroupManager<S> {
        &mut self.groups
    }

    pub fn into_parts(self) -> (C, GroupManager<S>) {
        (self.calendars, self.groups)
    }

    // ===== Resolution =====

    /// Ids for `names`, in input order. Fails on the first unknown name.
    pub fn resolve_calendar_names_to_ids<N: AsRef<str>>(
        &self,
        names: &[N],
    ) -> GroupResult<Vec<String>> {
        names
            .iter()
            .map(|name| self.calendar_id_by_name(name.as_ref()))
            .collect()
    }

    /// Names for `ids`, in input order. Fails on the first unknown id.
    pub fn resolve_calendar_ids_to_names<N: AsRef<str>>(
        &self,
        ids: &[N],
    ) -> GroupResult<Vec<String>> {
        ids.iter()
            .map(|id| {
                let id = id.as_ref();
                self.calendar_name_by_id(id)?
                    .ok_or_else(|| GroupError::CalendarNotFound(id.to_string()))
            })
            .collect()
    }

    /// Id -> name for every calendar the backend knows.
    pub fn get_available_calendars(&self) -> GroupResult<BTreeMap<String, String>> {
        Ok(self
            .calendars
            .list_calendars()?
            .into_iter()
            .map(|calendar| (calendar.id, calendar.name))
            .collect())
    }

    fn calendar_id_by_name(&self, name: &str) -> GroupResult<String> {
        self.calendars
            .find_calendar_by_name(name)?
            .map(|calendar| calendar.id)
            .ok_or_else(|| GroupError::CalendarNotFound(name.to_string()))
    }

    fn calendar_name_by_id(&self, id: &str) -> GroupResult<Option<String>> {
        Ok(self.calendars.find_calendar_by_id(id)?.map(|calendar| calendar.name))
    }

    fn available_ids(&self) -> GroupResult<HashSet<String>> {
        Ok(self
            .calendars
            .list_calendars()?
            .into_iter()
            .map(|calendar| calendar.id)
            .collect())
    }

    fn require_group(&mut self, group_name: &str) -> GroupResult<CalendarGroup> {
        self.groups
            .get_group(group_name)?
            .ok_or_else(|| GroupError::GroupNotFound(group_name.to_string()))
    }

    // ===== Validation / Cleanup =====

    /// For each calendar id in the group, whether the backend still has it.
    pub fn validate_group_calendars(
        &mut self,
        group_name: &str,
    ) -> GroupResult<BTreeMap<String, bool>> {
        let group = self.require_group(group_name)?;
        let available = self.available_ids()?;
        Ok(group
            .calendar_ids()
            .iter()
            .map(|id| (id.clone(), available.contains(id)))
            .collect())
    }

    /// Remove every calendar id that no longer resolves.
    pub fn cleanup_invalid_calendars(&mut self, group_name: &str) -> GroupResult<CleanupReport> {
        let group = self.require_group(group_name)?;
        let available = self.available_ids()?;
        let invalid: Vec<String> = group
            .calendar_ids()
            .iter()
            .filter(|id| !available.contains(*id))
            .cloned()
            .collect();

        let mut removed_count = 0;
        for id in &invalid {
            if self.groups.remove_calendar_from_group(group_name, id)? {
                removed_count += 1;
            }
        }

        if removed_count > 0 {
            info!(group = %group_name, removed = removed_count, "Removed invalid calendars");
        }
        Ok(CleanupReport {
            group_name: group_name.to_string(),
            removed_count,
            invalid_calendars: invalid,
            remaining_calendars: group.calendar_count() - removed_count,
        })
    }

    pub fn get_calendar_info_for_group(
        &mut self,
        group_name: &str,
    ) -> GroupResult<Vec<GroupCalendarInfo>> {
        let group = self.require_group(group_name)?;
        group
            .calendar_ids()
            .iter()
            .map(|id| {
                let name = self.calendar_name_by_id(id)?;
                Ok(GroupCalendarInfo {
                    id: id.clone(),
                    exists: name.is_some(),
                    name,
                    group: group.name().to_string(),
                })
            })
            .collect()
    }

    // ===== Events =====

    /// Events from every calendar in the group, sorted by start time.
    ///
    /// Calendars that no longer exist are skipped. Ties keep calendar order,
    /// then the backend's order within a calendar.
    pub fn get_events_by_group(
        &mut self,
        group_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> GroupResult<Vec<CalendarEvent>> {
        let group = self.require_group(group_name)?;

        let mut events = Vec::new();
        for id in group.calendar_ids() {
            let Some(name) = self.calendar_name_by_id(id)? else {
                debug!(group = %group_name, calendar = %id, "Skipping unknown calendar id");
                continue;
            };
            match self.calendars.list_events(&name, start, end) {
                Ok(found) => events.extend(found),
                Err(e) if e.is_no_such_calendar() => {
                    debug!(group = %group_name, calendar = %name, "Calendar vanished, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }

        events.sort_by_key(|event| event.start_time);
        Ok(events)
    }

    // ===== Lookups by name =====

    /// Names of the groups that contain `calendar_id`.
    pub fn get_groups_for_calendar(&mut self, calendar_id: &str) -> GroupResult<Vec<String>> {
        Ok(self
            .groups
            .get_groups_containing_calendar(calendar_id)?
            .into_iter()
            .map(|group| group.name().to_string())
            .collect())
    }

    pub fn get_groups_for_calendar_name(
        &mut self,
        calendar_name: &str,
    ) -> GroupResult<Vec<String>> {
        let id = self.calendar_id_by_name(calendar_name)?;
        self.get_groups_for_calendar(&id)
    }

    // ===== Writes by name =====

    pub fn create_group_from_calendar_names<N: AsRef<str>>(
        &mut self,
        group_name: &str,
        calendar_names: &[N],
        description: &str,
    ) -> GroupResult<CalendarGroup> {
        let ids = self.resolve_calendar_names_to_ids(calendar_names)?;
        self.groups.create_group(group_name, ids, description)
    }

    /// `calendar_names`, when given, replaces the group's calendars.
    pub fn update_group_from_calendar_names<N: AsRef<str>>(
        &mut self,
        group_name: &str,
        calendar_names: Option<&[N]>,
        description: Option<&str>,
    ) -> GroupResult<CalendarGroup> {
        let mut update = GroupUpdate::new();
        if let Some(names) = calendar_names {
            update = update.with_calendar_ids(self.resolve_calendar_names_to_ids(names)?);
        }
        if let Some(description) = description {
            update = update.with_description(description);
        }
        self.groups.update_group(group_name, &update)
    }

    pub fn add_calendar_to_group_by_name(
        &mut self,
        group_name: &str,
        calendar_name: &str,
    ) -> GroupResult<bool> {
        let id = self.calendar_id_by_name(calendar_name)?;
        self.groups.add_calendar_to_group(group_name, &id)
    }

    pub fn remove_calendar_from_group_by_name(
        &mut self,
        group_name: &str,
        calendar_name: &str,
    ) -> GroupResult<bool> {
        let id = self.calendar_id_by_name(calendar_name)?;
        self.groups.remove_calendar_from_group(group_name, &id)
    }

    // ===== Statistics =====

    pub fn get_group_statistics(&mut self) -> GroupResult<IntegrationStats> {
        let group_stats = self.groups.group_stats()?;
        let available = self.available_ids()?;
        let groups = self.groups.list_groups()?;

        let referenced: HashSet<&str> = groups
            .iter()
            .flat_map(|group| group.calendar_ids().iter().map(String::as_str))
            .collect();
        let covered = available
            .iter()
            .filter(|id| referenced.contains(id.as_str()))
            .count();
        let invalid_references = groups
            .iter()
            .flat_map(|group| group.calendar_ids())
            .filter(|id| !available.contains(*id))
            .count();

        let coverage = if available.is_empty() {
            0.0
        } else {
            covered as f64 / available.len() as f64 * 100.0
        };

        Ok(IntegrationStats {
            groups: group_stats,
            total_available_calendars: available.len(),
            calendars_in_groups: covered,
            ungrouped_calendars: available.len() - covered,
            invalid_calendar_references: invalid_references,
            group_coverage_percentage: coverage,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
