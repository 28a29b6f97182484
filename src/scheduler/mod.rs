/*!
 * Process Scheduler
 * Discrete-time process table and dispatcher advanced one tick at a time
 *
 * The scheduler owns every process record plus the six state collections
 * (NEW, READY, BLOCKED, RUNNING slot, FINISHED, ZOMBIE). Membership in the
 * collections always mirrors `Process::state`. All mutation goes through the
 * operations in this module; observers get immutable views or snapshots.
 */

use crate::core::limits::USAGE_SEED_SALT;
use crate::core::types::{Pid, Tick};
use crate::process::{Process, ProcessState};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub mod blocking;
pub mod clock;
pub mod config;
pub mod operations;
pub mod policy;
pub mod ready;
pub mod shared;
pub mod snapshot;
pub mod stats;
pub mod tick;

pub use blocking::{BlockKind, Mailboxes, Message};
pub use clock::{ClockCommand, ClockTask};
pub use config::{DependencyRelease, SimConfig};
pub use policy::{ClassPolicy, PriorityPolicy};
pub use ready::{ReadyQueue, WrrCursor};
pub use shared::SharedScheduler;
pub use snapshot::SchedulerSnapshot;
pub use stats::SchedulerStats;
pub use tick::TickReport;

/// Occupant of the CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RunSlot {
    pid: Pid,
    /// Ticks executed since the last dispatch
    quantum_used: u32,
}

/// Process scheduler
pub struct Scheduler {
    config: SimConfig,
    time: Tick,
    next_pid: Pid,

    // Process records by PID
    table: BTreeMap<Pid, Process>,

    // State collections, holding PIDs in display order
    new: Vec<Pid>,
    ready: ReadyQueue,
    blocked: Vec<Pid>,
    running: Option<RunSlot>,
    finished: Vec<Pid>,
    zombies: Vec<Pid>,

    mailboxes: Mailboxes,

    // Scheduling decisions and cosmetic usage draw from separate generators
    rng: StdRng,
    usage_rng: StdRng,

    spawned_when_empty: bool,
    last_dispatched: Option<Pid>,
    stats: SchedulerStats,
}

impl Scheduler {
    /// Create a scheduler after validating the configuration
    pub fn new(config: SimConfig) -> crate::core::errors::SchedulerResult<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    /// Default configuration with a fixed seed
    pub fn with_seed(seed: u64) -> Self {
        Self::from_valid(SimConfig::default().with_seed(seed))
    }

    fn from_valid(config: SimConfig) -> Self {
        info!(
            seed = ?config.seed,
            repeat_mode = config.repeat_mode,
            simulate_zombie = config.simulate_zombie,
            dependency_release = ?config.dependency_release,
            "Scheduler initialized"
        );

        Self {
            rng: seeded(config.seed, 0),
            usage_rng: seeded(config.seed, USAGE_SEED_SALT),
            ready: ReadyQueue::new(&config.policy),
            config,
            time: 0,
            next_pid: 1,
            table: BTreeMap::new(),
            new: Vec::new(),
            blocked: Vec::new(),
            running: None,
            finished: Vec::new(),
            zombies: Vec::new(),
            mailboxes: Mailboxes::default(),
            spawned_when_empty: false,
            last_dispatched: None,
            stats: SchedulerStats::default(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current logical time
    pub fn time(&self) -> Tick {
        self.time
    }

    /// PID that the next created process will get
    pub fn next_pid(&self) -> Pid {
        self.next_pid
    }

    /// Number of process records currently held
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Verify that collection membership mirrors every process state
    ///
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen: BTreeMap<Pid, &'static str> = BTreeMap::new();
        let running = self.running.map(|slot| slot.pid);
        let collections: [(&'static str, Vec<Pid>); 6] = [
            ("new", self.new.clone()),
            ("ready", self.ready.pids().collect()),
            ("blocked", self.blocked.clone()),
            ("running", running.into_iter().collect()),
            ("finished", self.finished.clone()),
            ("zombie", self.zombies.clone()),
        ];

        for (name, pids) in collections.iter() {
            let name = *name;
            for pid in pids {
                if let Some(other) = seen.insert(*pid, name) {
                    return Err(format!("pid {} is in both {} and {}", pid, other, name));
                }
                let process = self
                    .table
                    .get(pid)
                    .ok_or_else(|| format!("pid {} in {} has no record", pid, name))?;
                if collection_of(&process.state) != name {
                    return Err(format!(
                        "pid {} is in {} but its state is {}",
                        pid, name, process.state
                    ));
                }
                if process.remaining_time > process.burst_time {
                    return Err(format!("pid {} has more time left than its burst", pid));
                }
            }
        }

        if seen.len() != self.table.len() {
            return Err(format!(
                "{} records but {} collection entries",
                self.table.len(),
                seen.len()
            ));
        }

        let runners = self
            .table
            .values()
            .filter(|p| p.state == ProcessState::Running)
            .count();
        if runners > 1 {
            return Err(format!("{} processes are running", runners));
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Transition helpers shared by the operation modules
    // -------------------------------------------------------------------------

    fn set_state(&mut self, pid: Pid, state: ProcessState) {
        if let Some(process) = self.table.get_mut(&pid) {
            debug!(pid, tick = self.time, from = %process.state, to = %state, "state change");
            process.state = state;
        }
    }

    /// Mark READY and append at the tail of its class
    fn enqueue_ready(&mut self, pid: Pid) {
        self.set_state(pid, ProcessState::Ready);
        if let Some(process) = self.table.get(&pid) {
            self.ready.push_back(pid, process.priority);
        }
    }

    /// Remove `pid` from whichever collection its state says it is in
    fn detach(&mut self, pid: Pid) -> bool {
        let Some(state) = self.table.get(&pid).map(|p| p.state) else {
            return false;
        };

        match state {
            ProcessState::New => remove_pid(&mut self.new, pid),
            ProcessState::Ready => self.ready.remove(pid),
            ProcessState::Running => match self.running {
                Some(slot) if slot.pid == pid => {
                    self.running = None;
                    true
                }
                _ => false,
            },
            ProcessState::Blocked(_) => remove_pid(&mut self.blocked, pid),
            ProcessState::Finished => remove_pid(&mut self.finished, pid),
            ProcessState::Zombie => remove_pid(&mut self.zombies, pid),
        }
    }

    /// Whether `pid` has a parent that has not terminated yet
    fn parent_alive(&self, pid: Pid) -> bool {
        self.table
            .get(&pid)
            .and_then(|p| p.parent_pid)
            .and_then(|parent| self.table.get(&parent))
            .map_or(false, |parent| parent.state.is_live())
    }

    /// Terminal state for a process that just completed
    fn completion_state(&self, pid: Pid) -> ProcessState {
        if self.config.simulate_zombie || self.parent_alive(pid) {
            ProcessState::Zombie
        } else {
            ProcessState::Finished
        }
    }

    /// Place a detached process into FINISHED or ZOMBIE
    fn place_terminated(&mut self, pid: Pid, state: ProcessState) {
        self.set_state(pid, state);
        let now = self.time;
        if let Some(process) = self.table.get_mut(&pid) {
            process.finished_at = (state == ProcessState::Finished).then_some(now);
        }
        match state {
            ProcessState::Zombie => self.zombies.push(pid),
            _ => self.finished.push(pid),
        }
    }

    /// Complete a detached process and orphan anything waiting on it
    ///
    /// Returns the terminal state and the orphaned PIDs.
    fn terminate(&mut self, pid: Pid) -> (ProcessState, Vec<Pid>) {
        let state = self.completion_state(pid);
        self.place_terminated(pid, state);
        self.stats.completions += 1;
        let orphaned = self.orphan_dependents(pid);
        (state, orphaned)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::from_valid(SimConfig::default())
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("time", &self.time)
            .field("next_pid", &self.next_pid)
            .field("running", &self.running.map(|slot| slot.pid))
            .field("new", &self.new)
            .field("ready", &self.ready.pids().collect::<Vec<_>>())
            .field("blocked", &self.blocked)
            .field("finished", &self.finished)
            .field("zombies", &self.zombies)
            .finish()
    }
}

fn seeded(seed: Option<u64>, salt: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ salt),
        None => StdRng::from_entropy(),
    }
}

/// Order-preserving removal
fn remove_pid(list: &mut Vec<Pid>, pid: Pid) -> bool {
    match list.iter().position(|p| *p == pid) {
        Some(pos) => {
            list.remove(pos);
            true
        }
        None => false,
    }
}

fn collection_of(state: &ProcessState) -> &'static str {
    match state {
        ProcessState::New => "new",
        ProcessState::Ready => "ready",
        ProcessState::Running => "running",
        ProcessState::Blocked(_) => "blocked",
        ProcessState::Finished => "finished",
        ProcessState::Zombie => "zombie",
    }
}
