/*!
 * Shared Scheduler Handle
 * Single mutex boundary so ticks never interleave with other mutation
 */

use super::snapshot::SchedulerSnapshot;
use super::tick::TickReport;
use super::Scheduler;
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable handle to one scheduler instance
#[derive(Clone, Debug)]
pub struct SharedScheduler {
    inner: Arc<Mutex<Scheduler>>,
}

impl SharedScheduler {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            inner: Arc::new(Mutex::new(scheduler)),
        }
    }

    /// Run one tick under the lock
    pub fn tick(&self) -> TickReport {
        self.inner.lock().tick()
    }

    /// Post-tick copy of every collection
    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.inner.lock().snapshot()
    }

    /// Run an operation with exclusive access
    pub fn with<R>(&self, f: impl FnOnce(&mut Scheduler) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut *guard)
    }

    /// Read-only access under the lock
    pub fn read<R>(&self, f: impl FnOnce(&Scheduler) -> R) -> R {
        let guard = self.inner.lock();
        f(&*guard)
    }
}

impl From<Scheduler> for SharedScheduler {
    fn from(scheduler: Scheduler) -> Self {
        Self::new(scheduler)
    }
}
