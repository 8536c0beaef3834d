use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Identifies one approach to the intersection. Lane numbering is
/// 1-based in display output, 0-based internally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneId(pub usize);

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "lane {}", self.0 + 1)
    }
}

/// The mutually exclusive signal head state of a lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalColor {
    Red,
    Yellow,
    Green,
}

/// The color of the light element the user clicked. Blue is the
/// override light; it coexists with the signal head colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightColor {
    Red,
    Yellow,
    Green,
    Blue,
}

impl fmt::Display for LightColor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            LightColor::Red => "red",
            LightColor::Yellow => "yellow",
            LightColor::Green => "green",
            LightColor::Blue => "blue",
        };
        write!(f, "{}", name)
    }
}

/// Per-lane light state: exactly one signal color plus the independent
/// override flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneState {
    pub signal: SignalColor,
    pub override_active: bool,
}

impl LaneState {
    pub fn red() -> Self {
        Self {
            signal: SignalColor::Red,
            override_active: false,
        }
    }

    pub fn green() -> Self {
        Self {
            signal: SignalColor::Green,
            override_active: false,
        }
    }
}

/// Raw click event from the UI layer.
#[derive(Clone, Copy, Debug)]
pub struct LightClick {
    pub lane: LaneId,
    pub color: LightColor,
    pub timestamp: DateTime<Local>,
}

impl LightClick {
    pub fn now(lane: LaneId, color: LightColor) -> Self {
        Self {
            lane,
            color,
            timestamp: Local::now(),
        }
    }
}

/// Observable intersection state, published through the watch channel
/// after every mutation.
#[derive(Clone, Debug)]
pub struct IntersectionSnapshot {
    pub lanes: Vec<LaneState>,
    pub transitioning: bool,
    pub timestamp: SystemTime,
}
