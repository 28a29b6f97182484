/*!
 * Scheduler Snapshot
 * Immutable post-tick copy of every collection for observers
 */

use super::ready::WrrCursor;
use super::stats::SchedulerStats;
use super::Scheduler;
use crate::core::types::{Pid, Tick};
use crate::process::Process;
use serde::Serialize;

/// Point-in-time copy of the scheduler state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerSnapshot {
    pub time: Tick,
    pub running: Option<Process>,
    pub quantum_used: Option<u32>,
    pub new: Vec<Process>,
    /// Global queue order
    pub ready: Vec<Process>,
    pub blocked: Vec<Process>,
    pub finished: Vec<Process>,
    pub zombies: Vec<Process>,
    pub cursor: WrrCursor,
    pub stats: SchedulerStats,
}

impl SchedulerSnapshot {
    /// Total number of process records captured
    pub fn total(&self) -> usize {
        usize::from(self.running.is_some())
            + self.new.len()
            + self.ready.len()
            + self.blocked.len()
            + self.finished.len()
            + self.zombies.len()
    }

    /// Look up a captured record by PID
    pub fn find(&self, pid: Pid) -> Option<&Process> {
        self.running
            .iter()
            .chain(&self.new)
            .chain(&self.ready)
            .chain(&self.blocked)
            .chain(&self.finished)
            .chain(&self.zombies)
            .find(|p| p.pid == pid)
    }
}

impl Scheduler {
    /// Copy every collection for rendering
    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            time: self.time,
            running: self.running_pid().and_then(|pid| self.table.get(&pid).cloned()),
            quantum_used: self.quantum_used(),
            new: self.records(self.new.iter().copied()),
            ready: self.records(self.ready.pids()),
            blocked: self.records(self.blocked.iter().copied()),
            finished: self.records(self.finished.iter().copied()),
            zombies: self.records(self.zombies.iter().copied()),
            cursor: self.ready.cursor(),
            stats: self.stats(),
        }
    }

    fn records<I>(&self, pids: I) -> Vec<Process>
    where
        I: Iterator<Item = Pid>,
    {
        pids.filter_map(|pid| self.table.get(&pid).cloned()).collect()
    }
}
