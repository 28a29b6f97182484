/*!
 * Simulated Resource Usage
 * Cosmetic CPU/memory/disk figures for display only
 *
 * Values are recomputed every tick from the process state with a random
 * jitter. Nothing in the scheduler reads them back.
 */

use super::types::{BlockReason, ProcessState};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Displayed resource figures of one process
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResourceUsage {
    pub cpu_percent: f32,
    pub memory_mb: u32,
    pub disk_mbps: f32,
    #[serde(skip)]
    base: Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Baseline {
    cpu: f32,
    memory: u32,
    disk: f32,
}

impl ResourceUsage {
    /// Draw the per-process baseline at creation time
    pub fn initial<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let cpu = rng.gen_range(5.0..30.0);
        let memory = rng.gen_range(100..=800);
        let disk = rng.gen_range(0.5..8.0);
        Self {
            cpu_percent: cpu,
            memory_mb: memory,
            disk_mbps: disk,
            base: Baseline { cpu, memory, disk },
        }
    }

    /// Recompute displayed figures for the given state
    pub fn refresh<R: Rng + ?Sized>(&mut self, state: &ProcessState, rng: &mut R) {
        let base = self.base;
        match state {
            ProcessState::Running => {
                self.cpu_percent = jitter(rng, self.cpu_percent.max(base.cpu + 10.0), 1.0, 100.0, 0.15);
                self.disk_mbps = jitter(rng, self.disk_mbps.max(base.disk + 1.0), 0.0, 60.0, 0.20);
                self.memory_mb = jitter(rng, self.memory_mb.max(base.memory) as f32, 50.0, 4096.0, 0.03) as u32;
            }
            ProcessState::New | ProcessState::Ready => {
                self.cpu_percent = jitter(rng, (base.cpu * 0.8).max(1.0), 1.0, 50.0, 0.10);
                self.disk_mbps = jitter(rng, base.disk * 0.7, 0.0, 20.0, 0.15);
                self.memory_mb = jitter(rng, base.memory as f32, 50.0, 4096.0, 0.02) as u32;
            }
            ProcessState::Blocked(reason) => {
                let disk_factor = if matches!(reason, BlockReason::Io { .. }) { 1.5 } else { 0.5 };
                self.cpu_percent = jitter(rng, 2.0, 1.0, 20.0, 0.10);
                self.disk_mbps = jitter(rng, base.disk * disk_factor, 0.0, 30.0, 0.12);
                self.memory_mb = jitter(rng, base.memory as f32, 50.0, 4096.0, 0.01) as u32;
            }
            ProcessState::Finished => {
                self.cpu_percent = 0.0;
                self.disk_mbps = 0.0;
                self.memory_mb = 0;
            }
            ProcessState::Zombie => {
                let residue = (base.memory as f32 * 0.1).clamp(10.0, 128.0);
                self.cpu_percent = jitter(rng, 1.0, 0.0, 5.0, 0.10);
                self.disk_mbps = jitter(rng, 0.2, 0.0, 2.0, 0.10);
                self.memory_mb = jitter(rng, residue, 5.0, 256.0, 0.10) as u32;
            }
        }
    }
}

/// Random walk of `value` by at most `scale * max(1, value)`, clamped to `[lo, hi]`
pub fn jitter<R: Rng + ?Sized>(rng: &mut R, value: f32, lo: f32, hi: f32, scale: f32) -> f32 {
    let delta = (rng.gen::<f32>() * 2.0 - 1.0) * scale * value.max(1.0);
    (value + delta).clamp(lo, hi)
}
