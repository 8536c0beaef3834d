//! Error definitions for the intersection module

use crate::intersection::lane::{LaneId, LightColor};
use thiserror::Error;

/// Expected, non-fatal reasons a click does not change state.
///
/// None of these terminate anything; the click is discarded and the
/// reason logged. Each rejection is named so tests can assert on it
/// instead of a silent swallow.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClickRejected {
    /// A timed transition is in flight; all input is gated.
    #[error("transition in flight, click dropped")]
    TransitionInFlight,

    /// Green was clicked on the lane that already holds right-of-way.
    #[error("{0} is already green")]
    AlreadyGreen(LaneId),

    /// The click names a lane the intersection does not have.
    #[error("unknown {0}")]
    UnknownLane(LaneId),

    /// Red and yellow lights are indicators, not controls.
    #[error("{0} light is not clickable")]
    NotATrigger(LightColor),
}

/// Failures of the async driver and its handle.
#[derive(Debug, Error)]
pub enum IntersectionError {
    /// Click or snapshot channel closed while the driver was running.
    #[error("channel closed: {0}")]
    ChannelClosed(String),

    /// A phase carried no plan data; statum invariant breach.
    #[error("phase data missing in {0} phase")]
    PhaseDataMissing(&'static str),

    /// The driver task panicked or was aborted.
    #[error("driver task failed: {0}")]
    TaskFailed(String),
}
