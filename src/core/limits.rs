/*!
 * Simulation Limits and Constants
 *
 * Centralized location for tunable defaults and magic numbers.
 * Organized by domain for maintainability and discoverability.
 */

use std::ops::RangeInclusive;

// =============================================================================
// PRIORITY POLICY
// =============================================================================

/// Ticks a HIGH process may hold the CPU before forced preemption
pub const HIGH_QUANTUM: u32 = 4;
/// Consecutive dispatches granted to the HIGH class per WRR turn
pub const HIGH_WEIGHT: u32 = 2;

pub const MEDIUM_QUANTUM: u32 = 3;
pub const MEDIUM_WEIGHT: u32 = 2;

pub const LOW_QUANTUM: u32 = 2;
pub const LOW_WEIGHT: u32 = 1;

// =============================================================================
// RANDOMIZED POLICY BRANCHES
// =============================================================================

/// Chance per tick of a spontaneous arrival while the system is busy
pub const DEFAULT_ARRIVAL_CHANCE: f64 = 0.05;

/// Chance per executed tick that the running process blocks on I/O
pub const DEFAULT_BLOCK_CHANCE: f64 = 0.04;

/// Chance that a freshly admitted process waits on another active process
pub const DEFAULT_DEPENDENCY_INJECTION_CHANCE: f64 = 0.0;

/// Duration of a random I/O wait
pub const IO_TICKS: RangeInclusive<u32> = 3..=10;

/// Burst time of auto-generated processes
pub const ARRIVAL_BURST: RangeInclusive<u32> = 3..=10;

// =============================================================================
// PRESENTATION
// =============================================================================

/// Wall-clock interval between automatic ticks (milliseconds)
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Tick interval bounds accepted by the clock task
pub const MIN_TICK_INTERVAL_MS: u64 = 10;
pub const MAX_TICK_INTERVAL_MS: u64 = 60_000;

/// Salt mixed into the scheduling seed for the cosmetic usage generator
pub const USAGE_SEED_SALT: u64 = 0x5EED_C0FF_EE00_0001;

/// Name pool for processes created without a name
pub const APP_NAMES: [&str; 50] = [
    "Word", "Excel", "PowerPoint", "Outlook", "OneNote",
    "Teams", "Zoom", "Slack", "Discord", "Skype",
    "Chrome", "Edge", "Firefox", "Opera", "Brave",
    "Notepad", "Notepad++", "Paint", "Calculator", "VLC",
    "Spotify", "Steam", "Epic Games", "Adobe Acrobat", "Photoshop",
    "Illustrator", "Lightroom", "WhatsApp Desktop", "Telegram", "Dropbox",
    "OneDrive", "7-Zip", "WinRAR", "OBS Studio", "Visual Studio",
    "VS Code", "Git", "Python", "Node.js", "Java",
    "MySQL", "PostgreSQL", "SQL Server", "Docker", "nginx",
    "Apache", "VirtualBox", "VMware Workstation", "Windows Update", "Defender",
];
