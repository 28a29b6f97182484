/*!
 * Process Types
 * Process record and lifecycle state for the simulated process table
 */

use super::usage::ResourceUsage;
use crate::core::serde::{is_none, is_zero_u64};
use crate::core::types::{Burst, Pid, Priority, Tick};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a process left the CPU without finishing
///
/// The payload only exists while the process is blocked, so leaving the
/// blocked state drops it automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockReason {
    /// Waiting on a simulated device; unblocks when `remaining` reaches zero
    Io { remaining: u32 },
    /// Waiting on another process
    Dependency { waiting_for: Pid },
    /// Manually paused; only an explicit unblock resumes it
    Paused,
}

impl BlockReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Dependency { .. } => "dependency",
            Self::Paused => "paused",
        }
    }
}

/// Process state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ProcessState {
    /// Created, waiting for admission
    New,
    /// Queued for the CPU
    Ready,
    /// Holding the CPU
    Running,
    /// Off the CPU until its reason resolves
    Blocked(BlockReason),
    /// Done and acknowledged
    Finished,
    /// Done but not yet reaped
    Zombie,
}

impl ProcessState {
    /// Display label; a paused process reads as "paused" rather than "blocked"
    pub const fn label(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Blocked(BlockReason::Paused) => "paused",
            Self::Blocked(_) => "blocked",
            Self::Finished => "finished",
            Self::Zombie => "zombie",
        }
    }

    #[inline]
    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }

    #[inline]
    pub const fn is_paused(&self) -> bool {
        matches!(self, Self::Blocked(BlockReason::Paused))
    }

    /// Finished or zombie
    #[inline]
    pub const fn is_terminated(&self) -> bool {
        matches!(self, Self::Finished | Self::Zombie)
    }

    /// Still has work to do (not terminated)
    #[inline]
    pub const fn is_live(&self) -> bool {
        !self.is_terminated()
    }

    pub const fn block_reason(&self) -> Option<BlockReason> {
        match self {
            Self::Blocked(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One simulated task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Process {
    pub pid: Pid,
    pub name: String,
    pub arrival_time: Tick,
    pub burst_time: Burst,
    pub remaining_time: Burst,
    pub state: ProcessState,
    pub priority: Priority,
    #[serde(skip_serializing_if = "is_none", default)]
    pub parent_pid: Option<Pid>,
    #[serde(skip_serializing_if = "is_none", default)]
    pub finished_at: Option<Tick>,
    /// Ticks actually spent on the CPU across all runs
    #[serde(skip_serializing_if = "is_zero_u64", default)]
    pub cpu_ticks: u64,
    pub usage: ResourceUsage,
}

impl Process {
    pub(crate) fn new(
        pid: Pid,
        name: String,
        arrival_time: Tick,
        burst_time: Burst,
        priority: Priority,
        usage: ResourceUsage,
    ) -> Self {
        Self {
            pid,
            name,
            arrival_time,
            burst_time,
            remaining_time: burst_time,
            state: ProcessState::New,
            priority,
            parent_pid: None,
            finished_at: None,
            cpu_ticks: 0,
            usage,
        }
    }

    pub fn block_reason(&self) -> Option<BlockReason> {
        self.state.block_reason()
    }

    /// Target of a dependency wait, if any
    pub fn waiting_for_pid(&self) -> Option<Pid> {
        match self.state {
            ProcessState::Blocked(BlockReason::Dependency { waiting_for }) => Some(waiting_for),
            _ => None,
        }
    }

    /// Ticks left in an I/O wait (0 when not waiting on I/O)
    pub fn io_remaining(&self) -> u32 {
        match self.state {
            ProcessState::Blocked(BlockReason::Io { remaining }) => remaining,
            _ => 0,
        }
    }

    /// Put back the full burst for another run
    pub(crate) fn restore_burst(&mut self) {
        self.remaining_time = self.burst_time;
    }
}

/// Parameters for creating a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessSpec {
    pub burst: Burst,
    #[serde(skip_serializing_if = "is_none", default)]
    pub name: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(skip_serializing_if = "is_none", default)]
    pub parent: Option<Pid>,
}

impl ProcessSpec {
    pub fn new(burst: Burst) -> Self {
        Self {
            burst,
            name: None,
            priority: Priority::default(),
            parent: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_parent(mut self, parent: Pid) -> Self {
        self.parent = Some(parent);
        self
    }
}
