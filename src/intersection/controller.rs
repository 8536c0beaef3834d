//! Pure intersection state core.
//!
//! Holds the lane set and the transitioning guard, validates clicks
//! and plans timed transitions. No timers live here: a valid click
//! mutates the immediate phase and returns a [`SwitchPlan`] describing
//! the deferred resolution, which the caller applies via [`Intersection::resolve`]
//! once the hold window has elapsed. This keeps every rule testable
//! without waiting on a clock.

use std::time::SystemTime;
use tracing::{debug, info};

use crate::intersection::error::ClickRejected;
use crate::intersection::lane::{
    IntersectionSnapshot, LaneId, LaneState, LightClick, LightColor, SignalColor,
};

/// Deferred resolution of a click, applied after the hold window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SwitchPlan {
    /// Both lanes are yellow; after the hold the outgoing lane turns
    /// red and the incoming lane turns green.
    SwapRightOfWay { outgoing: LaneId, incoming: LaneId },

    /// No lane was green; the incoming lane is yellow and turns green
    /// after the hold.
    FirstGreen { incoming: LaneId },

    /// The override already forced its final colors; the hold only
    /// keeps the controls locked briefly before releasing the guard.
    OverrideRelease,
}

/// The lane set plus the single guard flag gating all input.
///
/// Exactly one instance exists per simulation; all mutation goes
/// through [`Intersection::handle_click`] and [`Intersection::resolve`].
#[derive(Clone, Debug)]
pub struct Intersection {
    lanes: Vec<LaneState>,
    transitioning: bool,
}

impl Intersection {
    /// Initial state: lane 1 green, all others red, overrides off.
    pub fn new(lane_count: usize) -> Self {
        let mut lanes = vec![LaneState::red(); lane_count];
        if let Some(first) = lanes.first_mut() {
            *first = LaneState::green();
        }
        Self {
            lanes,
            transitioning: false,
        }
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn lane(&self, lane: LaneId) -> Option<&LaneState> {
        self.lanes.get(lane.0)
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    pub fn snapshot(&self) -> IntersectionSnapshot {
        IntersectionSnapshot {
            lanes: self.lanes.clone(),
            transitioning: self.transitioning,
            timestamp: SystemTime::now(),
        }
    }

    /// The lane currently holding right-of-way, if any. At most one
    /// exists outside a transition window.
    pub fn active_green(&self) -> Option<LaneId> {
        self.lanes
            .iter()
            .position(|lane| lane.signal == SignalColor::Green)
            .map(LaneId)
    }

    /// Validates a click and, if accepted, applies the immediate phase
    /// and returns the plan for the deferred one.
    ///
    /// The guard is checked before anything else, so an override click
    /// can never interleave with a running transition.
    pub fn handle_click(&mut self, click: &LightClick) -> Result<SwitchPlan, ClickRejected> {
        if self.transitioning {
            return Err(ClickRejected::TransitionInFlight);
        }

        if click.lane.0 >= self.lanes.len() {
            return Err(ClickRejected::UnknownLane(click.lane));
        }

        match click.color {
            LightColor::Blue => Ok(self.apply_override(click.lane)),
            LightColor::Green => self.begin_switch(click.lane),
            color => Err(ClickRejected::NotATrigger(color)),
        }
    }

    /// Hard override: clicked lane green, every other lane red, blue
    /// lit everywhere. Prior green/yellow state is not respected.
    fn apply_override(&mut self, requested: LaneId) -> SwitchPlan {
        info!("override on {}: forcing all other lanes red", requested);
        self.transitioning = true;

        for (idx, lane) in self.lanes.iter_mut().enumerate() {
            *lane = if idx == requested.0 {
                LaneState {
                    signal: SignalColor::Green,
                    override_active: true,
                }
            } else {
                LaneState {
                    signal: SignalColor::Red,
                    override_active: true,
                }
            };
        }

        SwitchPlan::OverrideRelease
    }

    /// Starts the yellow phase for a green click.
    fn begin_switch(&mut self, requested: LaneId) -> Result<SwitchPlan, ClickRejected> {
        if self.lanes[requested.0].signal == SignalColor::Green {
            return Err(ClickRejected::AlreadyGreen(requested));
        }

        let outgoing = self.active_green();
        self.transitioning = true;

        // The requested lane drops everything it showed, blue included.
        self.lanes[requested.0] = LaneState {
            signal: SignalColor::Yellow,
            override_active: false,
        };

        match outgoing {
            Some(outgoing) => {
                // Both-yellow phase: the outgoing lane keeps its
                // override flag, only the signal head changes.
                self.lanes[outgoing.0].signal = SignalColor::Yellow;
                info!("switching right-of-way: {} -> {}", outgoing, requested);
                Ok(SwitchPlan::SwapRightOfWay {
                    outgoing,
                    incoming: requested,
                })
            }
            None => {
                info!("no lane green, sequencing {} to green", requested);
                Ok(SwitchPlan::FirstGreen {
                    incoming: requested,
                })
            }
        }
    }

    /// Applies the deferred phase of a plan and releases the guard.
    pub fn resolve(&mut self, plan: &SwitchPlan) {
        match plan {
            SwitchPlan::SwapRightOfWay { outgoing, incoming } => {
                self.lanes[outgoing.0].signal = SignalColor::Red;
                self.lanes[incoming.0].signal = SignalColor::Green;
                debug!("resolved swap: {} red, {} green", outgoing, incoming);
            }
            SwitchPlan::FirstGreen { incoming } => {
                self.lanes[incoming.0].signal = SignalColor::Green;
                debug!("resolved first green on {}", incoming);
            }
            SwitchPlan::OverrideRelease => {
                debug!("override hold released");
            }
        }
        self.transitioning = false;
    }
}
