//! Intersection subsystem: lane state, click handling and timed
//! transitions.
//!
//! Split the same way as the rest of the application: a pure core, an
//! async driver and a spawn handle.
//!
//! 1. [`controller`] - synchronous state-transition rules
//! 2. [`machine`] - statum phase machine and tokio driver loop
//! 3. [`handle`] - spawn API and lifecycle management
//!
//! # Architecture
//!
//! ```text
//! LightClick ──► SignalMachine ──► IntersectionSnapshot
//!    (mpsc)      (Intersection       (watch)
//!                 + HoldTimer)
//! ```

pub mod controller;
pub mod error;
pub mod handle;
pub mod lane;
pub mod machine;
pub mod timer;

pub use controller::{Intersection, SwitchPlan};
pub use error::{ClickRejected, IntersectionError};
pub use handle::IntersectionHandle;
pub use lane::{IntersectionSnapshot, LaneId, LaneState, LightClick, LightColor, SignalColor};
pub use machine::SignalTiming;
