/*!
 * Scheduler Operations
 * Create, admit, dispatch, finalize, reap, reset, and policy toggles
 */

use super::config::{DependencyRelease, SimConfig};
use super::{remove_pid, RunSlot, Scheduler};
use crate::core::errors::{SchedulerError, SchedulerResult};
use crate::core::types::{Burst, Pid, Priority};
use crate::process::naming::{random_app_name, unique_name};
use crate::process::{Process, ProcessSpec, ProcessState, ResourceUsage};
use std::collections::HashSet;
use tracing::{info, trace, warn};

impl Scheduler {
    /// Create a MEDIUM process in NEW
    ///
    /// A missing or blank name is replaced by a random application name.
    pub fn create_process(&mut self, burst: Burst, name: Option<&str>) -> SchedulerResult<Pid> {
        let mut spec = ProcessSpec::new(burst);
        spec.name = name.map(str::to_string);
        self.spawn(spec)
    }

    /// Create a process from a full spec
    pub fn spawn(&mut self, spec: ProcessSpec) -> SchedulerResult<Pid> {
        if spec.burst == 0 {
            warn!(burst = spec.burst, "Process creation rejected");
            return Err(SchedulerError::InvalidBurst(spec.burst));
        }
        if let Some(parent) = spec.parent {
            if !self.table.contains_key(&parent) {
                warn!(parent, "Process creation rejected: unknown parent");
                return Err(SchedulerError::ProcessNotFound(parent));
            }
        }

        let base = match spec.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => random_app_name(&mut self.usage_rng).to_string(),
        };
        let name = {
            let taken: HashSet<&str> = self.table.values().map(|p| p.name.as_str()).collect();
            unique_name(&base, &taken)
        };

        let pid = self.next_pid;
        self.next_pid += 1;

        let usage = ResourceUsage::initial(&mut self.usage_rng);
        let mut process = Process::new(pid, name, self.time, spec.burst, spec.priority, usage);
        process.parent_pid = spec.parent;

        info!(
            pid,
            name = %process.name,
            burst = spec.burst,
            priority = %spec.priority,
            parent = ?spec.parent,
            "Process created"
        );

        self.table.insert(pid, process);
        self.new.push(pid);
        self.stats.created += 1;
        Ok(pid)
    }

    /// Move every NEW process to READY in creation order
    pub fn admit_all_new(&mut self) -> Vec<Pid> {
        let admitted = std::mem::take(&mut self.new);
        for pid in &admitted {
            self.enqueue_ready(*pid);
        }
        if !admitted.is_empty() {
            trace!(count = admitted.len(), "Admitted new processes");
        }
        admitted
    }

    /// Fill an idle CPU from the ready queue
    ///
    /// Returns the dispatched PID, or `None` if something is already running
    /// or nothing is ready.
    pub fn dispatch(&mut self) -> Option<Pid> {
        if self.running.is_some() {
            return None;
        }

        let pid = self.ready.pop_next(&self.config.policy)?;
        self.set_state(pid, ProcessState::Running);
        self.running = Some(RunSlot {
            pid,
            quantum_used: 0,
        });

        self.stats.dispatches += 1;
        if self.last_dispatched != Some(pid) {
            self.stats.context_switches += 1;
        }
        self.last_dispatched = Some(pid);

        let cursor = self.ready.cursor();
        trace!(pid, class = %cursor.class, budget = cursor.budget, "Dispatched");
        Some(pid)
    }

    /// Change a process's priority class
    ///
    /// A queued process keeps its place in the global order; a running
    /// process starts a fresh quantum.
    pub fn set_priority(&mut self, pid: Pid, priority: Priority) -> SchedulerResult<()> {
        let Some(process) = self.table.get_mut(&pid) else {
            let err = SchedulerError::ProcessNotFound(pid);
            warn!(pid, error = %err, "Priority change rejected");
            return Err(err);
        };
        let previous = std::mem::replace(&mut process.priority, priority);
        let state = process.state;

        match state {
            ProcessState::Ready => {
                self.ready.set_priority(pid, priority);
            }
            ProcessState::Running => {
                if let Some(slot) = self.running.as_mut() {
                    slot.quantum_used = 0;
                }
            }
            _ => {}
        }

        info!(pid, from = %previous, to = %priority, "Priority changed");
        Ok(())
    }

    /// Force-complete a process from any state
    ///
    /// Applies the same zombie, finished, and orphaning rules as a natural
    /// completion. A zombie is reaped to FINISHED; an already FINISHED
    /// process is left alone.
    pub fn finalize_pid(&mut self, pid: Pid) -> SchedulerResult<ProcessState> {
        let Some(state) = self.table.get(&pid).map(|p| p.state) else {
            let err = SchedulerError::ProcessNotFound(pid);
            warn!(pid, error = %err, "Finalize rejected");
            return Err(err);
        };

        let outcome = match state {
            ProcessState::Finished => ProcessState::Finished,
            ProcessState::Zombie => {
                self.detach(pid);
                self.place_terminated(pid, ProcessState::Finished);
                self.stats.reaped += 1;
                ProcessState::Finished
            }
            _ => {
                self.detach(pid);
                if let Some(process) = self.table.get_mut(&pid) {
                    process.remaining_time = 0;
                }
                let (outcome, orphaned) = self.terminate(pid);
                if !orphaned.is_empty() {
                    info!(pid, orphaned = ?orphaned, "Dependents orphaned");
                }
                outcome
            }
        };

        info!(pid, from = %state, to = %outcome, "Process finalized");
        Ok(outcome)
    }

    /// Move every ZOMBIE to FINISHED
    pub fn reap_zombies(&mut self) -> Vec<Pid> {
        let reaped = std::mem::take(&mut self.zombies);
        for pid in &reaped {
            self.place_terminated(*pid, ProcessState::Finished);
        }

        self.stats.reaped += reaped.len() as u64;
        if !reaped.is_empty() {
            info!(count = reaped.len(), "Zombies reaped");
        }
        reaped
    }

    /// Bring terminated processes back to READY with a full burst
    pub fn revive_for_cycle(&mut self, include_zombies: bool) -> Vec<Pid> {
        let mut revived = std::mem::take(&mut self.finished);
        if include_zombies {
            revived.append(&mut self.zombies);
        }

        for pid in &revived {
            if let Some(process) = self.table.get_mut(pid) {
                process.restore_burst();
                process.finished_at = None;
            }
            self.enqueue_ready(*pid);
        }

        self.stats.revived += revived.len() as u64;
        if !revived.is_empty() {
            info!(count = revived.len(), "Processes revived");
        }
        revived
    }

    /// Start over with an empty table, time 0, and PID 1
    ///
    /// With `keep_options` false the behaviour flags go back to their
    /// defaults; tunables such as the seed and policy table are always kept.
    pub fn reset(&mut self, keep_options: bool) {
        let mut config = self.config.clone();
        if !keep_options {
            let defaults = SimConfig::default();
            config.auto_arrivals = defaults.auto_arrivals;
            config.auto_blocks = defaults.auto_blocks;
            config.simulate_zombie = defaults.simulate_zombie;
            config.repeat_mode = defaults.repeat_mode;
        }

        info!(keep_options, "Scheduler reset");
        *self = Self::from_valid(config);
    }

    /// Toggle repeat mode; turning it on revives terminated processes at once
    pub fn set_repeat_mode(&mut self, enabled: bool) -> Vec<Pid> {
        self.config.repeat_mode = enabled;
        info!(enabled, "Repeat mode toggled");
        if enabled {
            self.revive_for_cycle(self.config.revive_zombies)
        } else {
            Vec::new()
        }
    }

    pub fn set_simulate_zombie(&mut self, enabled: bool) {
        self.config.simulate_zombie = enabled;
        info!(enabled, "Zombie simulation toggled");
    }

    pub fn set_auto_arrivals(&mut self, enabled: bool) {
        self.config.auto_arrivals = enabled;
        info!(enabled, "Automatic arrivals toggled");
    }

    pub fn set_auto_blocks(&mut self, enabled: bool) {
        self.config.auto_blocks = enabled;
        info!(enabled, "Random blocking toggled");
    }

    /// Switch the dependency release policy
    ///
    /// Existing waits stay in place and resolve under the new policy.
    /// Pending replies are dropped unless the new policy reads them.
    pub fn set_dependency_release(&mut self, release: DependencyRelease) {
        self.config.dependency_release = release;
        if release != DependencyRelease::OnReply {
            self.mailboxes.clear();
        }
        info!(release = ?release, "Dependency release policy changed");
    }

    /// No NEW, READY, or RUNNING process exists
    pub fn system_empty(&self) -> bool {
        self.new.is_empty() && self.ready.is_empty() && self.running.is_none()
    }

    pub fn get_process(&self, pid: Pid) -> Option<&Process> {
        self.table.get(&pid)
    }

    pub fn running_pid(&self) -> Option<Pid> {
        self.running.map(|slot| slot.pid)
    }

    /// Ticks the running process has used of its current quantum
    pub fn quantum_used(&self) -> Option<u32> {
        self.running.map(|slot| slot.quantum_used)
    }

    pub fn new_pids(&self) -> &[Pid] {
        &self.new
    }

    /// READY PIDs in global queue order
    pub fn ready_pids(&self) -> Vec<Pid> {
        self.ready.pids().collect()
    }

    pub fn blocked_pids(&self) -> &[Pid] {
        &self.blocked
    }

    pub fn finished_pids(&self) -> &[Pid] {
        &self.finished
    }

    pub fn zombie_pids(&self) -> &[Pid] {
        &self.zombies
    }

    /// All process records in PID order
    pub fn processes(&self) -> impl Iterator<Item = &Process> + '_ {
        self.table.values()
    }

    /// Drop a FINISHED record entirely
    pub(crate) fn remove_finished(&mut self, pid: Pid) -> bool {
        if !remove_pid(&mut self.finished, pid) {
            return false;
        }
        self.table.remove(&pid);
        self.mailboxes.remove(pid);
        true
    }
}
