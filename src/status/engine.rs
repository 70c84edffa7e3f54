//! Event status derivation
//!
//! Pure functions from an event snapshot, the current instant and the viewer's
//! registration to the two statuses shown for an event. Nothing in here
//! performs I/O; callers re-run the derivation on every observed change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::models::{CompletionStatus, Event, EventStatus, Registration, RegistrationStatus};

/// Lifecycle status of an event as seen by any viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    AwaitingApproval,
    Rejected,
    AwaitingProof,
    ProofUnderReview,
    Completed,
    RegistrationFull,
    RegistrationOpen,
}

impl OverallStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OverallStatus::AwaitingApproval => "Awaiting admin approval",
            OverallStatus::Rejected => "Event rejected",
            OverallStatus::AwaitingProof => "Awaiting organizer proof",
            OverallStatus::ProofUnderReview => "Proof under review",
            OverallStatus::Completed => "Event completed",
            OverallStatus::RegistrationFull => "Registration full",
            OverallStatus::RegistrationOpen => "Registration open",
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The action available to one particular viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Viewer identity or registration lookup not resolved yet
    Loading,
    EventPassed,
    IsCreator,
    Pending,
    Approved,
    Rejected,
    Cancelled,
    CanRegister,
    RegistrationFull,
}

impl ActionStatus {
    /// Only `CanRegister` enables the register action; `Loading` never does
    pub fn allows_registration(&self) -> bool {
        matches!(self, ActionStatus::CanRegister)
    }
}

impl From<RegistrationStatus> for ActionStatus {
    fn from(status: RegistrationStatus) -> Self {
        match status {
            RegistrationStatus::Pending => ActionStatus::Pending,
            RegistrationStatus::Approved => ActionStatus::Approved,
            RegistrationStatus::Rejected => ActionStatus::Rejected,
            RegistrationStatus::Cancelled => ActionStatus::Cancelled,
        }
    }
}

/// What is known about the viewer at derivation time
#[derive(Debug, Clone, PartialEq)]
pub enum Viewer {
    /// Identity or registration lookup still in flight
    Resolving,
    Anonymous,
    Known {
        user_id: String,
        registration: Option<Registration>,
    },
}

impl Viewer {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Viewer::Known { user_id, .. } => Some(user_id),
            _ => None,
        }
    }
}

/// Derive the overall status in precedence order
pub fn overall_status(event: &Event, now: DateTime<Utc>) -> OverallStatus {
    match event.status {
        EventStatus::Pending => OverallStatus::AwaitingApproval,
        EventStatus::Rejected => OverallStatus::Rejected,
        EventStatus::Approved if event.has_passed(now) => match event.completion_status {
            CompletionStatus::AwaitingProof => OverallStatus::AwaitingProof,
            CompletionStatus::ProofSubmitted => OverallStatus::ProofUnderReview,
            CompletionStatus::Completed => OverallStatus::Completed,
        },
        EventStatus::Approved if event.is_full() => OverallStatus::RegistrationFull,
        EventStatus::Approved => OverallStatus::RegistrationOpen,
    }
}

/// Derive the viewer's action status
pub fn action_status(event: &Event, now: DateTime<Utc>, viewer: &Viewer) -> ActionStatus {
    if event.has_passed(now) {
        return ActionStatus::EventPassed;
    }

    match viewer {
        Viewer::Resolving => ActionStatus::Loading,
        Viewer::Known { user_id, .. } if event.is_creator(user_id) => ActionStatus::IsCreator,
        Viewer::Known { registration: Some(registration), .. } => registration.status.into(),
        Viewer::Known { registration: None, .. } | Viewer::Anonymous => {
            if event.is_full() {
                ActionStatus::RegistrationFull
            } else {
                ActionStatus::CanRegister
            }
        }
    }
}
