/*!
 * Blocking Subsystem
 * I/O timers, dependency waits, reply mailboxes, and orphaning
 */

use super::config::DependencyRelease;
use super::{remove_pid, Scheduler};
use crate::core::errors::{SchedulerError, SchedulerResult};
use crate::core::types::{Pid, Tick};
use crate::process::{BlockReason, ProcessState};
use ahash::RandomState;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// How to block the running process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// I/O wait of a random length drawn from the configured range
    Io,
    /// I/O wait of an explicit length
    IoFor(u32),
    /// Manual pause, lifted only by [`Scheduler::unblock_pid`]
    Paused,
}

/// Reply sent from one process to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Message {
    pub from: Pid,
    pub body: String,
    pub sent_at: Tick,
}

/// Per-process inboxes
#[derive(Debug, Clone, Default)]
pub struct Mailboxes {
    boxes: HashMap<Pid, Vec<Message>, RandomState>,
}

impl Mailboxes {
    pub fn deliver(&mut self, to: Pid, message: Message) {
        self.boxes.entry(to).or_default().push(message);
    }

    /// Consume the oldest message in `to`'s inbox sent by `from`
    pub fn take_from(&mut self, to: Pid, from: Pid) -> Option<Message> {
        let inbox = self.boxes.get_mut(&to)?;
        let pos = inbox.iter().position(|m| m.from == from)?;
        let message = inbox.remove(pos);
        if inbox.is_empty() {
            self.boxes.remove(&to);
        }
        Some(message)
    }

    pub fn get(&self, pid: Pid) -> &[Message] {
        self.boxes.get(&pid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn remove(&mut self, pid: Pid) {
        self.boxes.remove(&pid);
    }

    pub fn clear(&mut self) {
        self.boxes.clear();
    }

    /// Total undelivered messages
    pub fn pending(&self) -> usize {
        self.boxes.values().map(Vec::len).sum()
    }
}

impl Scheduler {
    /// Move the running process to BLOCKED (or PAUSED)
    ///
    /// Fails with [`SchedulerError::NoRunningProcess`] when the CPU is idle.
    pub fn block_running(&mut self, kind: BlockKind) -> SchedulerResult<Pid> {
        let slot = self.running.ok_or(SchedulerError::NoRunningProcess).map_err(|err| {
            warn!(kind = ?kind, error = %err, "Block rejected");
            err
        })?;

        let reason = match kind {
            BlockKind::Io => BlockReason::Io {
                remaining: self.rng.gen_range(self.config.io_ticks.clone()),
            },
            BlockKind::IoFor(0) => {
                let err =
                    SchedulerError::InvalidArgument("I/O wait must last at least one tick".into());
                warn!(pid = slot.pid, error = %err, "Block rejected");
                return Err(err);
            }
            BlockKind::IoFor(ticks) => BlockReason::Io { remaining: ticks },
            BlockKind::Paused => BlockReason::Paused,
        };

        self.park_running(slot.pid, reason);
        if matches!(reason, BlockReason::Io { .. }) {
            self.stats.io_blocks += 1;
        }
        Ok(slot.pid)
    }

    /// Manually pause the running process
    pub fn pause_running(&mut self) -> SchedulerResult<Pid> {
        self.block_running(BlockKind::Paused)
    }

    /// Move a BLOCKED or PAUSED process back to READY
    pub fn unblock_pid(&mut self, pid: Pid) -> SchedulerResult<()> {
        if self.release(pid) {
            info!(pid, "Process unblocked");
            return Ok(());
        }

        let err = if self.table.contains_key(&pid) {
            SchedulerError::NotBlocked(pid)
        } else {
            SchedulerError::ProcessNotFound(pid)
        };
        warn!(pid, error = %err, "Unblock rejected");
        Err(err)
    }

    /// Make `caller` wait on `callee`
    ///
    /// A running caller leaves the CPU; a ready or new caller leaves its
    /// queue; an already blocked caller switches its wait to `callee`.
    pub fn depend_on(&mut self, caller: Pid, callee: Pid) -> SchedulerResult<()> {
        let caller_state = self
            .check_dependency(caller, callee)
            .map_err(|err| {
                warn!(caller, callee, error = %err, "Dependency rejected");
                err
            })?;

        let reason = BlockReason::Dependency {
            waiting_for: callee,
        };
        match caller_state {
            ProcessState::Running => self.park_running(caller, reason),
            ProcessState::Blocked(_) => self.set_state(caller, ProcessState::Blocked(reason)),
            _ => {
                self.detach(caller);
                self.set_state(caller, ProcessState::Blocked(reason));
                self.blocked.push(caller);
            }
        }

        self.stats.dependency_waits += 1;
        info!(caller, callee, "Dependency wait registered");
        Ok(())
    }

    /// Validate a new wait; returns the caller's current state
    fn check_dependency(&self, caller: Pid, callee: Pid) -> SchedulerResult<ProcessState> {
        if caller == callee {
            return Err(SchedulerError::SelfDependency(caller));
        }

        let caller_state = self
            .table
            .get(&caller)
            .map(|p| p.state)
            .ok_or(SchedulerError::ProcessNotFound(caller))?;
        let callee_state = self
            .table
            .get(&callee)
            .map(|p| p.state)
            .ok_or(SchedulerError::ProcessNotFound(callee))?;

        if caller_state.is_terminated() {
            return Err(SchedulerError::InvalidState {
                pid: caller,
                state: caller_state.to_string(),
            });
        }
        if callee_state.is_terminated() {
            return Err(SchedulerError::InvalidState {
                pid: callee,
                state: callee_state.to_string(),
            });
        }
        if self.waits_on(callee, caller) {
            return Err(SchedulerError::DeadlockDetected { caller, callee });
        }
        Ok(caller_state)
    }

    /// Queue a reply from `from` in `to`'s mailbox
    ///
    /// Only accepted under [`DependencyRelease::OnReply`]; no other policy
    /// ever reads a mailbox.
    pub fn reply(&mut self, from: Pid, to: Pid, body: impl Into<String>) -> SchedulerResult<()> {
        let unknown = [from, to].into_iter().find(|pid| !self.table.contains_key(pid));
        let rejected = match unknown {
            Some(pid) => Some(SchedulerError::ProcessNotFound(pid)),
            None if self.config.dependency_release != DependencyRelease::OnReply => {
                Some(SchedulerError::InvalidArgument(format!(
                    "replies are not read under the {:?} release policy",
                    self.config.dependency_release
                )))
            }
            None => None,
        };
        if let Some(err) = rejected {
            warn!(from, to, error = %err, "Reply rejected");
            return Err(err);
        }

        let message = Message {
            from,
            body: body.into(),
            sent_at: self.time,
        };
        debug!(from, to, body = %message.body, "Reply delivered");
        self.mailboxes.deliver(to, message);
        Ok(())
    }

    /// Undelivered replies addressed to `pid`
    pub fn mailbox(&self, pid: Pid) -> &[Message] {
        self.mailboxes.get(pid)
    }

    /// Whether `from` transitively waits on `target`
    fn waits_on(&self, from: Pid, target: Pid) -> bool {
        let mut current = from;
        for _ in 0..self.table.len() {
            match self.table.get(&current).and_then(|p| p.waiting_for_pid()) {
                Some(next) if next == target => return true,
                Some(next) => current = next,
                None => return false,
            }
        }
        false
    }

    fn park_running(&mut self, pid: Pid, reason: BlockReason) {
        self.running = None;
        self.set_state(pid, ProcessState::Blocked(reason));
        self.blocked.push(pid);
    }

    /// BLOCKED -> READY; false if `pid` is not in the blocked set
    fn release(&mut self, pid: Pid) -> bool {
        if remove_pid(&mut self.blocked, pid) {
            self.enqueue_ready(pid);
            true
        } else {
            false
        }
    }

    /// Blocked PIDs waiting on a dependency that matches `filter`
    fn dependency_waiters<F>(&self, filter: F) -> Vec<(Pid, Pid)>
    where
        F: Fn(Pid) -> bool,
    {
        self.blocked
            .iter()
            .filter_map(|pid| {
                let waiting_for = self.table.get(pid)?.waiting_for_pid()?;
                filter(waiting_for).then_some((*pid, waiting_for))
            })
            .collect()
    }

    /// Count down every I/O wait; release the ones that reach zero
    pub(crate) fn countdown_io(&mut self) -> Vec<Pid> {
        let mut done = Vec::new();
        for pid in &self.blocked {
            if let Some(process) = self.table.get_mut(pid) {
                if let ProcessState::Blocked(BlockReason::Io { remaining }) = &mut process.state {
                    *remaining = remaining.saturating_sub(1);
                    if *remaining == 0 {
                        done.push(*pid);
                    }
                }
            }
        }

        for pid in &done {
            self.release(*pid);
        }
        done
    }

    /// Release dependency waiters holding a matching reply
    pub(crate) fn release_by_replies(&mut self) -> Vec<Pid> {
        if self.config.dependency_release != DependencyRelease::OnReply {
            return Vec::new();
        }

        let mut released = Vec::new();
        for (pid, waiting_for) in self.dependency_waiters(|_| true) {
            if self.mailboxes.take_from(pid, waiting_for).is_some() {
                self.release(pid);
                released.push(pid);
            }
        }
        released
    }

    /// Release everything waiting on `callee` because it made progress
    pub(crate) fn release_dependents_of(&mut self, callee: Pid) -> Vec<Pid> {
        if self.config.dependency_release != DependencyRelease::OnProgress {
            return Vec::new();
        }

        let released: Vec<Pid> = self
            .dependency_waiters(|target| target == callee)
            .into_iter()
            .map(|(pid, _)| pid)
            .collect();
        for pid in &released {
            self.release(*pid);
        }
        released
    }

    /// Turn everything waiting on `callee` into zombies, transitively
    pub(crate) fn orphan_dependents(&mut self, callee: Pid) -> Vec<Pid> {
        let mut orphaned = Vec::new();
        let mut pending = vec![callee];

        while let Some(target) = pending.pop() {
            for (pid, _) in self.dependency_waiters(|waiting_for| waiting_for == target) {
                remove_pid(&mut self.blocked, pid);
                self.place_terminated(pid, ProcessState::Zombie);
                debug!(pid, callee = target, "Dependent orphaned");
                orphaned.push(pid);
                pending.push(pid);
            }
        }

        self.stats.orphaned += orphaned.len() as u64;
        orphaned
    }
}
