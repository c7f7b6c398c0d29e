use thiserror::Error;

/// Failures reported by the external calendar backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// The named calendar does not exist (deleted, renamed, or never existed).
    #[error("No such calendar: {0}")]
    NoSuchCalendar(String),

    #[error("Backend failure: {0}")]
    Backend(String),
}

impl CalendarError {
    pub fn is_no_such_calendar(&self) -> bool {
        matches!(self, Self::NoSuchCalendar(_))
    }
}
