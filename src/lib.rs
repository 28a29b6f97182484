/*!
 * Process Scheduling Simulator Library
 * Discrete-time scheduler engine exposed as a library
 */

pub mod core;
pub mod monitoring;
pub mod process;
pub mod scheduler;

// Re-exports
pub use crate::core::errors::{SchedulerError, SchedulerResult};
pub use crate::core::types::{Burst, Pid, Priority, Tick};
pub use monitoring::init_tracing;
pub use process::{BlockReason, Process, ProcessSpec, ProcessState, ResourceUsage};
pub use scheduler::{
    BlockKind, ClassPolicy, ClockCommand, ClockTask, DependencyRelease, Message, PriorityPolicy,
    Scheduler, SchedulerSnapshot, SchedulerStats, SharedScheduler, SimConfig, TickReport,
};
