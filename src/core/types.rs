/*!
 * Core Types
 * Common types used across the simulator
 */

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Process ID type
pub type Pid = u32;

/// Logical clock value (one tick per simulation step)
pub type Tick = u64;

/// CPU ticks a process needs
pub type Burst = u32;

/// Priority class of a simulated process
///
/// The dispatcher cycles over classes in [`Priority::CYCLE`] order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Weighted round-robin visiting order
    pub const CYCLE: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Position in [`Priority::CYCLE`]
    #[inline(always)]
    pub const fn index(&self) -> usize {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    /// Parse from string representation
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "high" | "h" => Ok(Self::High),
            "medium" | "m" | "normal" => Ok(Self::Medium),
            "low" | "l" => Ok(Self::Low),
            _ => Err(format!(
                "Invalid priority '{}'. Valid: high, medium, low",
                s
            )),
        }
    }

    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Priority {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
