use serde::Serialize;

use crate::models::GroupStats;

/// Result of `cleanup_invalid_calendars`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub group_name: String,
    pub removed_count: usize,
    /// Ids that no longer resolve, in group order.
    pub invalid_calendars: Vec<String>,
    pub remaining_calendars: usize,
}

/// One calendar reference of a group, resolved against the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCalendarInfo {
    pub id: String,
    pub name: Option<String>,
    pub exists: bool,
    pub group: String,
}

/// Group statistics combined with backend coverage figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntegrationStats {
    #[serde(flatten)]
    pub groups: GroupStats,
    pub total_available_calendars: usize,
    /// Available calendars referenced by at least one group.
    pub calendars_in_groups: usize,
    pub ungrouped_calendars: usize,
    /// Group references (counted per group) to calendars that do not exist.
    pub invalid_calendar_references: usize,
    /// `calendars_in_groups / total_available_calendars * 100`, or 0 with no calendars.
    pub group_coverage_percentage: f64,
}
