/*!
 * Clock Task
 * Background tokio task that drives ticks on a fixed interval
 *
 * The task is the only periodic caller of `tick()`. Control goes through a
 * command channel; observers receive a snapshot after every tick through a
 * watch channel.
 */

use super::shared::SharedScheduler;
use super::snapshot::SchedulerSnapshot;
use crate::core::limits::{MAX_TICK_INTERVAL_MS, MIN_TICK_INTERVAL_MS};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{info, trace, warn};

/// Control messages for the clock task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockCommand {
    /// Resume periodic ticking
    Start,
    /// Stop periodic ticking; manual steps still work
    Pause,
    /// Run exactly one tick now
    Step,
    /// Change the tick interval (milliseconds, clamped)
    SetInterval(u64),
    Shutdown,
}

/// Handle to the clock background task
pub struct ClockTask {
    command_tx: mpsc::UnboundedSender<ClockCommand>,
    snapshot_rx: watch::Receiver<SchedulerSnapshot>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl ClockTask {
    /// Spawn the clock; `running` selects whether periodic ticks start at once
    pub fn spawn(scheduler: SharedScheduler, interval_ms: u64, running: bool) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(scheduler.snapshot());

        let handle = tokio::spawn(async move {
            run_clock_loop(scheduler, interval_ms, running, command_rx, snapshot_tx).await;
        });

        info!(interval_ms = clamp_interval(interval_ms), running, "Clock task spawned");

        Self {
            command_tx,
            snapshot_rx,
            handle: Some(handle),
        }
    }

    pub fn start(&self) {
        self.send(ClockCommand::Start);
    }

    pub fn pause(&self) {
        self.send(ClockCommand::Pause);
    }

    /// Run one tick regardless of the paused state
    pub fn step(&self) {
        self.send(ClockCommand::Step);
    }

    pub fn set_interval(&self, interval_ms: u64) {
        self.send(ClockCommand::SetInterval(interval_ms));
    }

    /// Receiver of post-tick snapshots
    pub fn subscribe(&self) -> watch::Receiver<SchedulerSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Stop the task and wait for it to exit
    pub async fn shutdown(mut self) {
        self.send(ClockCommand::Shutdown);

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Clock task shutdown error");
            } else {
                info!("Clock task shutdown complete");
            }
        }
    }

    fn send(&self, command: ClockCommand) {
        if self.command_tx.send(command).is_err() {
            warn!(?command, "Clock task is no longer running");
        }
    }
}

impl Drop for ClockTask {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.command_tx.send(ClockCommand::Shutdown);
        }
    }
}

fn clamp_interval(interval_ms: u64) -> u64 {
    interval_ms.clamp(MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS)
}

fn new_interval(interval_ms: u64) -> Interval {
    let mut interval = tokio::time::interval(Duration::from_millis(clamp_interval(interval_ms)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

fn tick_and_publish(scheduler: &SharedScheduler, snapshot_tx: &watch::Sender<SchedulerSnapshot>) {
    let (report, snapshot) = scheduler.with(|s| {
        let report = s.tick();
        (report, s.snapshot())
    });
    trace!(
        tick = report.time,
        executed = ?report.executed,
        completed = ?report.completed,
        "Clock tick"
    );
    let _ = snapshot_tx.send(snapshot);
}

async fn run_clock_loop(
    scheduler: SharedScheduler,
    interval_ms: u64,
    mut active: bool,
    mut command_rx: mpsc::UnboundedReceiver<ClockCommand>,
    snapshot_tx: watch::Sender<SchedulerSnapshot>,
) {
    let mut interval = new_interval(interval_ms);

    loop {
        tokio::select! {
            _ = interval.tick(), if active => {
                tick_and_publish(&scheduler, &snapshot_tx);
            }

            command = command_rx.recv() => {
                match command {
                    Some(ClockCommand::Start) => {
                        info!("Clock started");
                        active = true;
                        interval.reset();
                    }
                    Some(ClockCommand::Pause) => {
                        info!("Clock paused");
                        active = false;
                    }
                    Some(ClockCommand::Step) => {
                        tick_and_publish(&scheduler, &snapshot_tx);
                    }
                    Some(ClockCommand::SetInterval(ms)) => {
                        info!(interval_ms = clamp_interval(ms), "Clock interval updated");
                        interval = new_interval(ms);
                    }
                    Some(ClockCommand::Shutdown) | None => {
                        info!("Clock task shutting down");
                        break;
                    }
                }
            }
        }
    }
}
