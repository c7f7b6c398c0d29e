//! Test doubles shared by unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::calendar::{CalendarError, CalendarSource};
use crate::error::{GroupError, GroupResult};
use crate::models::{CalendarEvent, CalendarInfo};
use crate::storage::{empty_schema, GroupStore};

/// In-memory store that counts traffic.
#[derive(Default)]
pub struct MemoryStore {
    pub data: RefCell<Option<Value>>,
    pub loads: Cell<usize>,
    pub saves: Cell<usize>,
    pub fail_saves: Cell<bool>,
}

impl MemoryStore {
    pub fn with(data: Value) -> Self {
        let store = Self::default();
        *store.data.borrow_mut() = Some(data);
        store
    }
}

impl GroupStore for MemoryStore {
    fn load(&self) -> Value {
        self.loads.set(self.loads.get() + 1);
        self.data.borrow().clone().unwrap_or_else(empty_schema)
    }

    fn save(&self, data: &Value) -> GroupResult<()> {
        if self.fail_saves.get() {
            return Err(GroupError::storage("disk full"));
        }
        self.saves.set(self.saves.get() + 1);
        *self.data.borrow_mut() = Some(data.clone());
        Ok(())
    }

    fn backup(&self) -> GroupResult<PathBuf> {
        match *self.data.borrow() {
            Some(_) => Ok(PathBuf::from("memory-backup.json")),
            None => Err(GroupError::NoBackupSource(PathBuf::from("memory"))),
        }
    }
}

/// Calendar backend with a fixed set of calendars and events.
#[derive(Default)]
pub struct FakeCalendars {
    pub calendars: Vec<CalendarInfo>,
    pub events: HashMap<String, Vec<CalendarEvent>>,
    /// Listed, but event queries report `NoSuchCalendar` (deleted mid-flight).
    pub vanished: HashSet<String>,
    /// Event queries fail with a backend error.
    pub broken: HashSet<String>,
}

impl FakeCalendars {
    pub fn with_calendars(calendars: &[(&str, &str)]) -> Self {
        Self {
            calendars: calendars
                .iter()
                .map(|(id, name)| CalendarInfo::new(*id, *name))
                .collect(),
            ..Self::default()
        }
    }

    pub fn add_event(&mut self, calendar_name: &str, title: &str, start: DateTime<Utc>) {
        self.events
            .entry(calendar_name.to_string())
            .or_default()
            .push(CalendarEvent {
                identifier: None,
                title: title.to_string(),
                start_time: start,
                end_time: start + chrono::Duration::hours(1),
                location: None,
                notes: None,
                all_day: false,
                calendar_name: calendar_name.to_string(),
            });
    }
}

impl CalendarSource for FakeCalendars {
    fn list_calendars(&self) -> Result<Vec<CalendarInfo>, CalendarError> {
        Ok(self.calendars.clone())
    }

    fn list_events(
        &self,
        calendar_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        if self.broken.contains(calendar_name) {
            return Err(CalendarError::Backend("backend unavailable".to_string()));
        }
        if self.vanished.contains(calendar_name)
            || !self.calendars.iter().any(|c| c.name == calendar_name)
        {
            return Err(CalendarError::NoSuchCalendar(calendar_name.to_string()));
        }
        Ok(self
            .events
            .get(calendar_name)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.start_time >= start && e.start_time <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
