//! Intersection handle - spawn API and lifecycle management
//!
//! Owns the driver task running the signal loop and hands out watch
//! receivers for the published snapshots. The handle is the only thing
//! the rest of the application touches; the machine itself never
//! leaves its task.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SimulationConfig;
use crate::intersection::error::IntersectionError;
use crate::intersection::lane::{IntersectionSnapshot, LightClick};
use crate::intersection::machine::{run_signal_loop, SignalMachine, SignalTiming};

/// Handle for the intersection driver task.
///
/// Spawns the signal machine, keeps a snapshot receiver for
/// subscription and supports graceful shutdown through a oneshot
/// signal. Dropping the handle without calling [`IntersectionHandle::shutdown`]
/// leaves the task running until the runtime goes down, which is fine
/// for the normal application exit path.
pub struct IntersectionHandle {
    snapshot_receiver: watch::Receiver<IntersectionSnapshot>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task_handle: Option<JoinHandle<Result<(), IntersectionError>>>,
}

impl IntersectionHandle {
    /// Spawns the signal machine as a tokio task.
    ///
    /// The click sender side of `click_receiver` belongs to the UI;
    /// snapshots flow back through [`IntersectionHandle::subscribe`].
    pub fn spawn(config: &SimulationConfig, click_receiver: mpsc::Receiver<LightClick>) -> Self {
        info!(
            "spawning intersection driver: {} lanes",
            config.lane_count
        );

        let machine = SignalMachine::create(
            config.lane_count,
            SignalTiming::from(config),
            click_receiver,
        );
        let snapshot_receiver = machine.subscribe();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task_handle = tokio::spawn(async move {
            let result = run_signal_loop(machine, shutdown_rx).await;
            if let Err(ref e) = result {
                error!("signal loop terminated with error: {}", e);
            } else {
                info!("signal loop finished");
            }
            result
        });

        debug!("intersection driver task spawned");
        Self {
            snapshot_receiver,
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
        }
    }

    /// New receiver for the published intersection state.
    pub fn subscribe(&self) -> watch::Receiver<IntersectionSnapshot> {
        self.snapshot_receiver.clone()
    }

    /// Signals the driver to stop and waits for the task to finish.
    pub async fn shutdown(&mut self) -> Result<(), IntersectionError> {
        debug!("sending shutdown signal to intersection driver");

        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                warn!("intersection driver already terminated");
            }
        }

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => {
                    debug!("intersection driver task completed");
                    result
                }
                Err(e) => {
                    error!("intersection driver task panicked: {}", e);
                    Err(IntersectionError::TaskFailed(e.to_string()))
                }
            }
        } else {
            debug!("intersection driver already shut down");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersection::lane::{LaneId, LightColor, SignalColor};
    use std::time::Duration;
    use tokio::time::timeout;

    fn test_config() -> SimulationConfig {
        SimulationConfig {
            lane_count: 2,
            yellow_overlap_ms: 2000,
            override_release_ms: 200,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_publishes_initial_state() {
        let (_click_tx, click_rx) = mpsc::channel(16);
        let handle = IntersectionHandle::spawn(&test_config(), click_rx);

        let snapshot = handle.subscribe().borrow().clone();
        assert!(!snapshot.transitioning);
        assert_eq!(snapshot.lanes[0].signal, SignalColor::Green);
        assert_eq!(snapshot.lanes[1].signal, SignalColor::Red);
    }

    #[tokio::test(start_paused = true)]
    async fn full_swap_through_handle() {
        let (click_tx, click_rx) = mpsc::channel(16);
        let mut handle = IntersectionHandle::spawn(&test_config(), click_rx);
        let mut snapshots = handle.subscribe();

        click_tx
            .send(LightClick::now(LaneId(1), LightColor::Green))
            .await
            .unwrap();

        timeout(Duration::from_secs(10), snapshots.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(snapshots.borrow_and_update().transitioning);

        timeout(Duration::from_secs(10), snapshots.changed())
            .await
            .unwrap()
            .unwrap();
        let resolved = snapshots.borrow_and_update().clone();
        assert_eq!(resolved.lanes[1].signal, SignalColor::Green);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_is_idempotent() {
        let (_click_tx, click_rx) = mpsc::channel(16);
        let mut handle = IntersectionHandle::spawn(&test_config(), click_rx);

        handle.shutdown().await.unwrap();
        handle.shutdown().await.unwrap();
    }
}
