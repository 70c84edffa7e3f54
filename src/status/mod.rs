//! Event Status Engine
//!
//! Pure derivation of the overall event status and the viewer's action status.

pub mod engine;
pub mod view;

pub use engine::{action_status, overall_status, ActionStatus, OverallStatus, Viewer};
pub use view::{EventStatusView, EventView};
