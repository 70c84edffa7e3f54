//! View reducer over the status engine
//!
//! Folds the latest event snapshot and viewer knowledge into the value pushed
//! to clients. A missing event is an ordinary outcome, reported as `NotFound`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::models::{Event, EventId};
use super::engine::{action_status, overall_status, ActionStatus, OverallStatus, Viewer};

/// Statuses shown for one event to one viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStatusView {
    pub event_id: EventId,
    pub overall: OverallStatus,
    pub label: &'static str,
    pub action: ActionStatus,
    pub can_register: bool,
    pub registered: i32,
    pub capacity: i32,
    pub spots_left: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EventView {
    /// Nothing observed yet
    Loading,
    NotFound,
    Ready(EventStatusView),
}

impl EventView {
    pub fn reduce(event: Option<&Event>, now: DateTime<Utc>, viewer: &Viewer) -> Self {
        let Some(event) = event else {
            return EventView::NotFound;
        };

        let overall = overall_status(event, now);
        let action = action_status(event, now, viewer);

        EventView::Ready(EventStatusView {
            event_id: event.id,
            overall,
            label: overall.label(),
            action,
            can_register: action.allows_registration(),
            registered: event.registered,
            capacity: event.capacity,
            spots_left: event.spots_left(),
        })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, EventView::Ready(_))
    }
}
