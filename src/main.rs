/*!
 * Scheduler Simulator - Main Entry Point
 *
 * Headless driver for the scheduler engine:
 * - Loads configuration from SIM_* environment variables
 * - Seeds a small demo population
 * - Drives ticks on the clock task until SIM_TICKS or Ctrl+C
 * - Prints the final snapshot as JSON
 */

use anyhow::{Context, Result};
use sched_sim::{init_tracing, ClockTask, Scheduler, SharedScheduler, SimConfig};
use tracing::info;

const DEFAULT_TICKS: u64 = 50;
const DEMO_POPULATION: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = SimConfig::from_env().context("invalid simulator configuration")?;
    let ticks = match std::env::var("SIM_TICKS") {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("SIM_TICKS must be a number, got '{}'", raw))?,
        Err(_) => DEFAULT_TICKS,
    };
    let interval_ms = config.tick_interval_ms;

    info!(ticks, interval_ms, seed = ?config.seed, "Simulator starting");

    let mut scheduler = Scheduler::new(config)?;
    for _ in 0..DEMO_POPULATION {
        let burst = 3 + (scheduler.next_pid() % 8);
        scheduler.create_process(burst, None)?;
    }
    scheduler.admit_all_new();
    scheduler.dispatch();

    let shared = SharedScheduler::new(scheduler);
    let clock = ClockTask::spawn(shared.clone(), interval_ms, true);
    let mut snapshots = clock.subscribe();

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                info!(
                    tick = snapshot.time,
                    running = ?snapshot.running.as_ref().map(|p| p.pid),
                    ready = snapshot.ready.len(),
                    blocked = snapshot.blocked.len(),
                    finished = snapshot.finished.len(),
                    zombies = snapshot.zombies.len(),
                    "Snapshot"
                );
                if snapshot.time >= ticks {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    clock.shutdown().await;

    let snapshot = shared.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    info!(stats = ?snapshot.stats, "Simulator stopped");
    Ok(())
}
