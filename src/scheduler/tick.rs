/*!
 * Tick Orchestration
 * One discrete time step of the simulation
 *
 * Phase order within a tick:
 * 1. advance the clock
 * 2. arrivals
 * 3. admission (plus optional dependency injection)
 * 4. I/O countdown
 * 5. reply-based dependency release
 * 6. repeat-mode revival
 * 7. dispatch
 * 8. execution of the running process
 * 9. TTL expiry and cosmetic usage refresh
 */

use super::blocking::BlockKind;
use super::Scheduler;
use crate::core::types::{Pid, Tick};
use crate::process::ProcessState;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TickReport {
    pub time: Tick,
    pub arrivals: Vec<Pid>,
    pub admitted: Vec<Pid>,
    /// (caller, callee) waits created at admission
    pub injected_dependencies: Vec<(Pid, Pid)>,
    /// Processes moved from BLOCKED to READY
    pub unblocked: Vec<Pid>,
    pub revived: Vec<Pid>,
    pub dispatched: Option<Pid>,
    /// Process that consumed a CPU tick
    pub executed: Option<Pid>,
    /// Running process that blocked on I/O instead of executing
    pub blocked: Option<Pid>,
    pub completed: Option<Pid>,
    pub preempted: Option<Pid>,
    pub orphaned: Vec<Pid>,
    pub expired: Vec<Pid>,
}

impl Scheduler {
    /// Advance the simulation by one tick
    #[tracing::instrument(level = "debug", skip(self), fields(tick = tracing::field::Empty))]
    pub fn tick(&mut self) -> TickReport {
        self.time += 1;
        tracing::Span::current().record("tick", self.time);

        let mut report = TickReport {
            time: self.time,
            ..TickReport::default()
        };

        report.arrivals = self.arrivals();
        report.admitted = self.admit_all_new();
        report.injected_dependencies = self.inject_dependencies(&report.admitted);
        report.unblocked = self.countdown_io();
        report.unblocked.extend(self.release_by_replies());
        report.revived = self.revive_if_idle();
        report.dispatched = self.dispatch();
        self.execute_running(&mut report);
        report.expired = self.expire_finished();
        self.refresh_usage();

        debug!(
            running = ?self.running_pid(),
            ready = self.ready.len(),
            blocked = self.blocked.len(),
            "Tick complete"
        );
        report
    }

    /// Set the arrival and random-block flags, then tick
    pub fn tick_with(&mut self, auto_arrivals: bool, auto_blocks: bool) -> TickReport {
        self.config.auto_arrivals = auto_arrivals;
        self.config.auto_blocks = auto_blocks;
        self.tick()
    }

    /// Random arrivals; an idle system gets exactly one process per idle period
    fn arrivals(&mut self) -> Vec<Pid> {
        if !self.config.auto_arrivals {
            return Vec::new();
        }

        let spawn = if self.system_empty() {
            !std::mem::replace(&mut self.spawned_when_empty, true)
        } else {
            self.spawned_when_empty = false;
            self.rng.gen_bool(self.config.arrival_chance)
        };
        if !spawn {
            return Vec::new();
        }

        let burst = self.rng.gen_range(self.config.arrival_burst.clone());
        match self.create_process(burst, None) {
            Ok(pid) => vec![pid],
            Err(e) => {
                warn!(error = %e, "Automatic arrival failed");
                Vec::new()
            }
        }
    }

    /// Block freshly admitted processes on a random live process
    fn inject_dependencies(&mut self, admitted: &[Pid]) -> Vec<(Pid, Pid)> {
        let chance = self.config.dependency_injection_chance;
        if chance <= 0.0 {
            return Vec::new();
        }

        let mut injected = Vec::new();
        for &caller in admitted {
            if !self.rng.gen_bool(chance) {
                continue;
            }

            let candidates: Vec<Pid> = self
                .table
                .values()
                .filter(|p| p.pid != caller && p.state.is_live())
                .map(|p| p.pid)
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let callee = candidates[self.rng.gen_range(0..candidates.len())];
            if self.depend_on(caller, callee).is_ok() {
                injected.push((caller, callee));
            }
        }
        injected
    }

    /// Repeat mode keeps the demo going once the CPU runs dry
    fn revive_if_idle(&mut self) -> Vec<Pid> {
        let idle = self.ready.is_empty() && self.running.is_none();
        let has_terminated = !self.finished.is_empty() || !self.zombies.is_empty();
        if self.config.repeat_mode && idle && has_terminated {
            self.revive_for_cycle(self.config.revive_zombies)
        } else {
            Vec::new()
        }
    }

    fn execute_running(&mut self, report: &mut TickReport) {
        let Some(pid) = self.running_pid() else {
            return;
        };

        // The callee is making progress this tick
        report.unblocked.extend(self.release_dependents_of(pid));

        if self.config.auto_blocks && self.rng.gen_bool(self.config.block_chance) {
            if self.block_running(BlockKind::Io).is_ok() {
                report.blocked = Some(pid);
            }
            return;
        }

        let (remaining, priority) = match self.table.get_mut(&pid) {
            Some(process) => {
                process.remaining_time = process.remaining_time.saturating_sub(1);
                process.cpu_ticks += 1;
                (process.remaining_time, process.priority)
            }
            None => return,
        };
        let used = match self.running.as_mut() {
            Some(slot) => {
                slot.quantum_used += 1;
                slot.quantum_used
            }
            None => return,
        };
        report.executed = Some(pid);

        if remaining == 0 {
            self.running = None;
            report.completed = Some(pid);
            if self.config.repeat_mode {
                if let Some(process) = self.table.get_mut(&pid) {
                    process.restore_burst();
                }
                self.enqueue_ready(pid);
                self.stats.completions += 1;
                // Completion ends every wait on the callee, recycled or not
                report.orphaned = self.orphan_dependents(pid);
            } else {
                let (_, orphaned) = self.terminate(pid);
                report.orphaned = orphaned;
            }
            return;
        }

        if used >= self.config.policy.quantum(priority) && !self.ready.is_empty() {
            self.running = None;
            self.enqueue_ready(pid);
            self.stats.preemptions += 1;
            report.preempted = Some(pid);
        }
    }

    /// Drop FINISHED records older than the configured TTL
    fn expire_finished(&mut self) -> Vec<Pid> {
        let Some(ttl) = self.config.finished_ttl else {
            return Vec::new();
        };

        let now = self.time;
        let stale: Vec<Pid> = self
            .finished
            .iter()
            .copied()
            .filter(|pid| {
                self.table
                    .get(pid)
                    .and_then(|p| p.finished_at)
                    .map_or(false, |at| at.saturating_add(ttl) <= now)
            })
            .collect();

        for pid in &stale {
            self.remove_finished(*pid);
        }
        self.stats.expired += stale.len() as u64;
        stale
    }

    fn refresh_usage(&mut self) {
        for process in self.table.values_mut() {
            let state: ProcessState = process.state;
            process.usage.refresh(&state, &mut self.usage_rng);
        }
    }
}
