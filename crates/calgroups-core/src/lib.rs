//! Calendar Groups - named collections of calendars, persisted as JSON.
//!
//! A group is a validated name, an ordered list of opaque calendar ids and a
//! description. `GroupManager` performs CRUD and derived queries over a
//! `GroupStore` (normally the file-backed `GroupStorage`), and
//! `GroupCalendarBridge` connects groups to a host calendar backend through
//! the `CalendarSource` trait.

pub mod bridge;
pub mod calendar;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;

pub use bridge::{CleanupReport, GroupCalendarBridge, GroupCalendarInfo, IntegrationStats};
pub use calendar::{CalendarError, CalendarSource};
pub use config::Config;
pub use error::{GroupError, GroupResult};
pub use manager::GroupManager;
pub use models::{
    CalendarEvent, CalendarGroup, CalendarInfo, GroupSize, GroupStats, GroupUpdate, GroupsSchema,
    SchemaVersion,
};
pub use storage::{GroupStorage, GroupStore};
