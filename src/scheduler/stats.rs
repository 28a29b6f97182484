/*!
 * Scheduler Statistics
 * Track and report scheduler counters
 */

use super::Scheduler;
use crate::core::serde::is_zero_u64;
use serde::{Deserialize, Serialize};

/// Scheduler statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct SchedulerStats {
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub created: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub dispatches: u64,
    /// Dispatches that switched to a different process than the last one
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub context_switches: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub preemptions: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub completions: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub io_blocks: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub dependency_waits: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub orphaned: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub reaped: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub revived: u64,
    /// FINISHED records dropped by TTL expiry
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub expired: u64,
}

impl Scheduler {
    /// Get scheduler statistics
    pub fn stats(&self) -> SchedulerStats {
        self.stats.clone()
    }
}
