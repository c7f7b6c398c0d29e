//! Data models for calendar groups.
//!
//! - `CalendarGroup`, `GroupUpdate`: a single validated group and partial updates to it
//! - `GroupsSchema`, `SchemaVersion`: the whole persisted store
//! - `GroupStats`, `GroupSize`: derived statistics
//! - `CalendarInfo`, `CalendarEvent`: values exchanged with the calendar backend

pub mod calendar;
pub mod group;
pub mod schema;
mod timestamp;

pub use calendar::{CalendarEvent, CalendarInfo};
pub use group::{CalendarGroup, GroupUpdate, MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH};
pub use schema::{GroupSize, GroupStats, GroupsSchema, SchemaVersion, CURRENT_SCHEMA_VERSION};
