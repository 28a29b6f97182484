/*!
 * Process Module
 * Process records, lifecycle state, and display decorations
 */

pub mod naming;
pub mod types;
pub mod usage;

// Re-export for convenience
pub use types::{BlockReason, Process, ProcessSpec, ProcessState};
pub use usage::ResourceUsage;
