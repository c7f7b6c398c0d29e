//! Interface to the host calendar backend.
//!
//! Groups only store opaque calendar identifiers. Everything that needs to
//! know which calendars actually exist (name lookup, event queries) goes
//! through a `CalendarSource` supplied by the embedding application.

mod error;

pub use error::CalendarError;

use chrono::{DateTime, Utc};

use crate::models::{CalendarEvent, CalendarInfo};

pub trait CalendarSource {
    /// All calendars currently known to the backend.
    fn list_calendars(&self) -> Result<Vec<CalendarInfo>, CalendarError>;

    /// Events of the named calendar within `[start, end]`.
    ///
    /// Must return `CalendarError::NoSuchCalendar` when the calendar is gone,
    /// so callers can tell it apart from other backend failures.
    fn list_events(
        &self,
        calendar_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;

    fn find_calendar_by_name(&self, name: &str) -> Result<Option<CalendarInfo>, CalendarError> {
        Ok(self
            .list_calendars()?
            .into_iter()
            .find(|calendar| calendar.name == name))
    }

    fn find_calendar_by_id(&self, id: &str) -> Result<Option<CalendarInfo>, CalendarError> {
        Ok(self
            .list_calendars()?
            .into_iter()
            .find(|calendar| calendar.id == id))
    }
}

impl<T: CalendarSource + ?Sized> CalendarSource for &T {
    fn list_calendars(&self) -> Result<Vec<CalendarInfo>, CalendarError> {
        (**self).list_calendars()
    }

    fn list_events(
        &self,
        calendar_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        (**self).list_events(calendar_name, start, end)
    }

    fn find_calendar_by_name(&self, name: &str) -> Result<Option<CalendarInfo>, CalendarError> {
        (**self).find_calendar_by_name(name)
    }

    fn find_calendar_by_id(&self, id: &str) -> Result<Option<CalendarInfo>, CalendarError> {
        (**self).find_calendar_by_id(id)
    }
}
