//! Timeline view: incidents placed on a 24-hour axis with type-based colors.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use super::incident::{sort_oldest_first, types, Incident};

/// Color class used for incident types without a dedicated color.
pub const DEFAULT_EVENT_COLOR: &str = "bg-gray-500";

/// Maps an incident type label to its timeline color class.
pub fn event_color(incident_type: &str) -> &'static str {
    match incident_type {
        types::UNAUTHORISED_ACCESS | types::GUN_THREAT => "bg-global-7",
        types::FACE_RECOGNISED => "bg-global-4",
        types::MULTIPLE_EVENTS => "bg-button-2",
        _ => DEFAULT_EVENT_COLOR,
    }
}

/// One incident rendered on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: i64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub time: String,
    pub color: String,
}

impl TimelineEvent {
    pub fn from_incident(incident: &Incident, offset: FixedOffset) -> Self {
        Self {
            id: incident.id,
            event_type: incident.incident_type.clone(),
            time: shared::time::format_time_of_day(incident.t_start, offset),
            color: event_color(&incident.incident_type).to_string(),
        }
    }
}

/// Response payload for `GET /timeline`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub markers: Vec<String>,
    pub events: Vec<TimelineEvent>,
}

impl Timeline {
    /// Builds the timeline from incidents, ordered by start time ascending.
    pub fn build(mut incidents: Vec<Incident>, offset: FixedOffset) -> Self {
        sort_oldest_first(&mut incidents);
        Self {
            markers: shared::time::hourly_markers(),
            events: incidents
                .iter()
                .map(|i| TimelineEvent::from_incident(i, offset))
                .collect(),
        }
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self {
            markers: shared::time::hourly_markers(),
            events: Vec::new(),
        }
    }
}
