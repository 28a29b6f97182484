/*!
 * Priority Policy
 * Static quantum and weighted round-robin weight per priority class
 */

use crate::core::errors::{SchedulerError, SchedulerResult};
use crate::core::limits::*;
use crate::core::types::Priority;
use serde::{Deserialize, Serialize};

/// Policy of one priority class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClassPolicy {
    /// Consecutive ticks a process may run before forced preemption
    pub quantum: u32,
    /// Consecutive dispatches the class gets per round-robin turn
    pub weight: u32,
}

impl ClassPolicy {
    pub const fn new(quantum: u32, weight: u32) -> Self {
        Self { quantum, weight }
    }
}

/// Lookup table from priority class to [`ClassPolicy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct PriorityPolicy {
    pub high: ClassPolicy,
    pub medium: ClassPolicy,
    pub low: ClassPolicy,
}

impl Default for PriorityPolicy {
    fn default() -> Self {
        Self {
            high: ClassPolicy::new(HIGH_QUANTUM, HIGH_WEIGHT),
            medium: ClassPolicy::new(MEDIUM_QUANTUM, MEDIUM_WEIGHT),
            low: ClassPolicy::new(LOW_QUANTUM, LOW_WEIGHT),
        }
    }
}

impl PriorityPolicy {
    /// Same quantum and weight for every class
    pub const fn uniform(quantum: u32, weight: u32) -> Self {
        let class = ClassPolicy::new(quantum, weight);
        Self {
            high: class,
            medium: class,
            low: class,
        }
    }

    #[must_use]
    pub fn with_class(mut self, priority: Priority, class: ClassPolicy) -> Self {
        match priority {
            Priority::High => self.high = class,
            Priority::Medium => self.medium = class,
            Priority::Low => self.low = class,
        }
        self
    }

    #[inline]
    pub const fn class(&self, priority: Priority) -> ClassPolicy {
        match priority {
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }

    #[inline]
    pub const fn quantum(&self, priority: Priority) -> u32 {
        self.class(priority).quantum
    }

    #[inline]
    pub const fn weight(&self, priority: Priority) -> u32 {
        self.class(priority).weight
    }

    pub fn max_weight(&self) -> u32 {
        Priority::CYCLE
            .iter()
            .map(|p| self.weight(*p))
            .max()
            .unwrap_or(0)
    }

    /// Length of one full weighted round-robin pass
    pub fn total_weight(&self) -> u32 {
        Priority::CYCLE.iter().map(|p| self.weight(*p)).sum()
    }

    pub fn validate(&self) -> SchedulerResult<()> {
        for priority in Priority::CYCLE {
            let class = self.class(priority);
            if class.quantum == 0 {
                return Err(SchedulerError::InvalidConfig(format!(
                    "quantum for {} priority must be at least 1 tick",
                    priority
                )));
            }
            if class.weight == 0 {
                return Err(SchedulerError::InvalidConfig(format!(
                    "weight for {} priority must be at least 1",
                    priority
                )));
            }
        }
        Ok(())
    }
}
