//! Signal phase machine driving timed transitions.
//!
//! Wraps the pure [`Intersection`] core in a statum state machine and
//! runs it in a tokio task. Clicks arrive over an mpsc channel, every
//! state change is published over a watch channel, and hold windows
//! are slept out through [`HoldTimer`].
//!
//! # State Machine
//!
//! ```text
//! Waiting ──► Holding(window) ──► Resolving(plan) ──► Waiting
//!   (click      (2000ms yellow      (deferred phase
//!    accepted)   overlap / 200ms     applied, stale
//!                override release)   clicks drained)
//! ```
//!
//! While the machine is out of Waiting no click is consumed; whatever
//! piled up in the channel is drained and dropped on re-entry. Clicks
//! during a transition are discarded, never queued.

use statum::{machine, state};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::intersection::controller::{Intersection, SwitchPlan};
use crate::intersection::error::IntersectionError;
use crate::intersection::lane::{IntersectionSnapshot, LightClick};
use crate::intersection::timer::{HoldOutcome, HoldTimer};

/// The two fixed hold durations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalTiming {
    pub yellow_overlap: Duration,
    pub override_release: Duration,
}

impl Default for SignalTiming {
    fn default() -> Self {
        Self {
            yellow_overlap: Duration::from_millis(2000),
            override_release: Duration::from_millis(200),
        }
    }
}

impl From<&SimulationConfig> for SignalTiming {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            yellow_overlap: Duration::from_millis(config.yellow_overlap_ms),
            override_release: Duration::from_millis(config.override_release_ms),
        }
    }
}

impl SignalTiming {
    /// Hold duration for a planned transition.
    pub fn hold_for(&self, plan: &SwitchPlan) -> Duration {
        match plan {
            SwitchPlan::SwapRightOfWay { .. } | SwitchPlan::FirstGreen { .. } => {
                self.yellow_overlap
            }
            SwitchPlan::OverrideRelease => self.override_release,
        }
    }
}

/// An accepted transition waiting out its hold.
#[derive(Clone, Debug)]
pub struct HoldWindow {
    pub plan: SwitchPlan,
    pub hold: Duration,
}

/// Driver phases using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum SignalPhase {
    Waiting,
    Holding(HoldWindow),
    Resolving(SwitchPlan),
}

/// Async driver owning the intersection core and its channels.
#[machine]
#[derive(Debug)]
pub struct SignalMachine<S: SignalPhase> {
    core: Intersection,
    timing: SignalTiming,
    click_receiver: mpsc::Receiver<LightClick>,
    snapshot_sender: watch::Sender<IntersectionSnapshot>,
}

impl<S: SignalPhase> SignalMachine<S> {
    pub fn subscribe(&self) -> watch::Receiver<IntersectionSnapshot> {
        self.snapshot_sender.subscribe()
    }

    /// Broadcasts the current lane state to all observers.
    fn publish(&self) -> Result<(), IntersectionError> {
        self.snapshot_sender
            .send(self.core.snapshot())
            .map_err(|_| IntersectionError::ChannelClosed("snapshot watch".to_string()))
    }
}

impl SignalMachine<Waiting> {
    pub fn create(
        lane_count: usize,
        timing: SignalTiming,
        click_receiver: mpsc::Receiver<LightClick>,
    ) -> Self {
        info!(
            "creating signal machine: {} lanes, yellow overlap {:?}, override release {:?}",
            lane_count, timing.yellow_overlap, timing.override_release
        );

        let core = Intersection::new(lane_count);
        let (snapshot_sender, _) = watch::channel(core.snapshot());

        Self::new(core, timing, click_receiver, snapshot_sender)
    }

    /// Blocks until a click passes validation, applies its immediate
    /// phase and enters the hold window. Rejected clicks are logged
    /// and consumed without a state change.
    pub async fn await_click(mut self) -> Result<SignalMachine<Holding>, IntersectionError> {
        loop {
            let click = self
                .click_receiver
                .recv()
                .await
                .ok_or_else(|| IntersectionError::ChannelClosed("click channel".to_string()))?;

            debug!("click received: {} {} at {}", click.lane, click.color, click.timestamp);

            match self.core.handle_click(&click) {
                Ok(plan) => {
                    let hold = self.timing.hold_for(&plan);
                    self.publish()?;
                    info!("transition started, holding for {:?}", hold);
                    return Ok(self.transition_with(HoldWindow { plan, hold }));
                }
                Err(rejection) => {
                    debug!("click on {} rejected: {}", click.lane, rejection);
                }
            }
        }
    }
}

impl SignalMachine<Holding> {
    /// Sleeps out the hold window, then moves on to resolution.
    pub async fn hold(self) -> Result<SignalMachine<Resolving>, IntersectionError> {
        let window = self
            .get_state_data()
            .cloned()
            .ok_or(IntersectionError::PhaseDataMissing("holding"))?;

        let timer = HoldTimer::new(window.hold);
        match timer.wait().await {
            HoldOutcome::Fired => Ok(self.transition_with(window.plan)),
            HoldOutcome::Cancelled => Err(IntersectionError::TaskFailed(
                "hold timer cancelled outside shutdown".to_string(),
            )),
        }
    }
}

impl SignalMachine<Resolving> {
    /// Applies the deferred phase, releases the guard and drops any
    /// clicks that arrived while the window was open.
    pub fn resolve(mut self) -> Result<SignalMachine<Waiting>, IntersectionError> {
        let plan = self
            .get_state_data()
            .cloned()
            .ok_or(IntersectionError::PhaseDataMissing("resolving"))?;

        self.core.resolve(&plan);
        self.publish()?;
        info!("transition resolved, controls unlocked");

        self.drain_stale_clicks();
        Ok(self.transition())
    }

    fn drain_stale_clicks(&mut self) {
        loop {
            match self.click_receiver.try_recv() {
                Ok(click) => {
                    debug!(
                        "dropping click on {} ({}) that arrived mid-transition",
                        click.lane, click.color
                    );
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    // Next await_click reports the closed channel.
                    warn!("click channel disconnected during drain");
                    break;
                }
            }
        }
    }
}

/// Runs the phase cycle until shutdown is requested or a channel dies.
pub async fn run_signal_loop(
    mut machine: SignalMachine<Waiting>,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> Result<(), IntersectionError> {
    info!("entering signal loop");

    loop {
        let holding = tokio::select! {
            _ = &mut shutdown_rx => {
                info!("shutdown while waiting for clicks");
                return Ok(());
            }
            result = machine.await_click() => result?,
        };

        let resolving = tokio::select! {
            _ = &mut shutdown_rx => {
                info!("shutdown during hold window, transition abandoned");
                return Ok(());
            }
            result = holding.hold() => result?,
        };

        machine = resolving.resolve()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersection::lane::{LaneId, LightColor, SignalColor};
    use tokio::time::{advance, timeout};

    fn spawn_machine(
        lane_count: usize,
    ) -> (
        mpsc::Sender<LightClick>,
        watch::Receiver<IntersectionSnapshot>,
        tokio::sync::oneshot::Sender<()>,
    ) {
        let (click_tx, click_rx) = mpsc::channel(16);
        let machine = SignalMachine::create(lane_count, SignalTiming::default(), click_rx);
        let snapshots = machine.subscribe();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(run_signal_loop(machine, shutdown_rx));
        (click_tx, snapshots, shutdown_tx)
    }

    async fn changed(snapshots: &mut watch::Receiver<IntersectionSnapshot>) -> IntersectionSnapshot {
        timeout(Duration::from_secs(10), snapshots.changed())
            .await
            .expect("no snapshot published")
            .expect("snapshot channel closed");
        snapshots.borrow_and_update().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn yellow_overlap_then_swap() {
        let (clicks, mut snapshots, _shutdown) = spawn_machine(2);

        clicks
            .send(LightClick::now(LaneId(1), LightColor::Green))
            .await
            .unwrap();

        let yellow_phase = changed(&mut snapshots).await;
        assert!(yellow_phase.transitioning);
        assert_eq!(yellow_phase.lanes[0].signal, SignalColor::Yellow);
        assert_eq!(yellow_phase.lanes[1].signal, SignalColor::Yellow);

        let resolved = changed(&mut snapshots).await;
        assert!(!resolved.transitioning);
        assert_eq!(resolved.lanes[0].signal, SignalColor::Red);
        assert_eq!(resolved.lanes[1].signal, SignalColor::Green);
    }

    #[tokio::test(start_paused = true)]
    async fn clicks_during_hold_are_dropped() {
        let (clicks, mut snapshots, _shutdown) = spawn_machine(3);

        clicks
            .send(LightClick::now(LaneId(1), LightColor::Green))
            .await
            .unwrap();
        let yellow_phase = changed(&mut snapshots).await;
        assert!(yellow_phase.transitioning);

        // Lands mid-window; must not start another transition.
        clicks
            .send(LightClick::now(LaneId(2), LightColor::Green))
            .await
            .unwrap();

        let resolved = changed(&mut snapshots).await;
        assert!(!resolved.transitioning);
        assert_eq!(resolved.lanes[1].signal, SignalColor::Green);
        assert_eq!(resolved.lanes[2].signal, SignalColor::Red);

        // Give the loop room; no further snapshot may appear.
        advance(Duration::from_secs(5)).await;
        assert!(!snapshots.has_changed().unwrap());
        assert_eq!(snapshots.borrow().lanes[2].signal, SignalColor::Red);
    }

    #[tokio::test(start_paused = true)]
    async fn override_releases_after_short_hold() {
        let (clicks, mut snapshots, _shutdown) = spawn_machine(2);

        clicks
            .send(LightClick::now(LaneId(1), LightColor::Blue))
            .await
            .unwrap();

        let locked = changed(&mut snapshots).await;
        assert!(locked.transitioning);
        assert_eq!(locked.lanes[1].signal, SignalColor::Green);
        assert!(locked.lanes[1].override_active);
        assert_eq!(locked.lanes[0].signal, SignalColor::Red);
        assert!(locked.lanes[0].override_active);

        let released = changed(&mut snapshots).await;
        assert!(!released.transitioning);
        // Colors stay forced after the release.
        assert_eq!(released.lanes[1].signal, SignalColor::Green);
        assert_eq!(released.lanes[0].signal, SignalColor::Red);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_clicks_publish_nothing() {
        let (clicks, mut snapshots, _shutdown) = spawn_machine(2);

        // Redundant green and a non-trigger color.
        clicks
            .send(LightClick::now(LaneId(0), LightColor::Green))
            .await
            .unwrap();
        clicks
            .send(LightClick::now(LaneId(0), LightColor::Red))
            .await
            .unwrap();

        advance(Duration::from_secs(5)).await;
        assert!(!snapshots.has_changed().unwrap());

        // A valid click afterwards still goes through.
        clicks
            .send(LightClick::now(LaneId(1), LightColor::Green))
            .await
            .unwrap();
        let yellow_phase = changed(&mut snapshots).await;
        assert!(yellow_phase.transitioning);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_ends_loop_mid_hold() {
        let (clicks, mut snapshots, shutdown) = spawn_machine(2);

        clicks
            .send(LightClick::now(LaneId(1), LightColor::Green))
            .await
            .unwrap();
        let yellow_phase = changed(&mut snapshots).await;
        assert!(yellow_phase.transitioning);

        shutdown.send(()).unwrap();
        advance(Duration::from_secs(5)).await;

        // The abandoned transition never resolves: the last published
        // snapshot is still the yellow phase.
        let last = snapshots.borrow().clone();
        assert!(last.transitioning);
        assert_eq!(last.lanes[0].signal, SignalColor::Yellow);
    }
}
