//! Bridge between calendar groups and the host calendar backend.
//!
//! Groups store opaque calendar ids; people use calendar names. The bridge
//! translates between the two through a `CalendarSource`, and defines what
//! happens when a group points at a calendar that no longer exists: queries
//! skip it, validation reports it, cleanup removes it.

pub mod group_bridge;
pub mod report;

pub use group_bridge::GroupCalendarBridge;
pub use report::{CleanupReport, GroupCalendarInfo, IntegrationStats};
