/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::types::{Burst, Pid};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scheduler operation result
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-related errors with serialization support
///
/// None of these are fatal: a rejected command leaves the scheduler untouched.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SchedulerError {
    #[error("Process {0} not found")]
    #[diagnostic(
        code(scheduler::process_not_found),
        help("The process may have expired or never existed. Check PID validity.")
    )]
    ProcessNotFound(Pid),

    #[error("Process {0} is not blocked or paused")]
    #[diagnostic(
        code(scheduler::not_blocked),
        help("Only BLOCKED or PAUSED processes can be unblocked.")
    )]
    NotBlocked(Pid),

    #[error("No process is running")]
    #[diagnostic(
        code(scheduler::no_running_process),
        help("Step the clock until a process is dispatched.")
    )]
    NoRunningProcess,

    #[error("Invalid burst time: {0}")]
    #[diagnostic(
        code(scheduler::invalid_burst),
        help("Burst time must be at least one tick.")
    )]
    InvalidBurst(Burst),

    #[error("Process {0} cannot depend on itself")]
    #[diagnostic(
        code(scheduler::self_dependency),
        help("Pick a different target PID for the dependency.")
    )]
    SelfDependency(Pid),

    #[error("Deadlock detected: process {callee} already waits on process {caller}")]
    #[diagnostic(
        code(scheduler::deadlock_detected),
        help("Circular dependency detected between processes. Review process dependencies.")
    )]
    DeadlockDetected { caller: Pid, callee: Pid },

    #[error("Process {pid} is {state}")]
    #[diagnostic(
        code(scheduler::invalid_state),
        help("Operation cannot be performed in current process state.")
    )]
    InvalidState { pid: Pid, state: String },

    #[error("Invalid argument: {0}")]
    #[diagnostic(code(scheduler::invalid_argument))]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(scheduler::configuration_error),
        help("Invalid configuration. Review configuration parameters.")
    )]
    InvalidConfig(String),
}

impl SchedulerError {
    /// Whether the error refers to a PID that could not be located
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ProcessNotFound(_) | Self::NotBlocked(_))
    }
}
