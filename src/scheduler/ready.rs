/*!
 * Ready Queue Dispatcher
 * Weighted round-robin across priority classes, FIFO within a class
 */

use super::policy::PriorityPolicy;
use crate::core::types::{Pid, Priority};
use serde::Serialize;
use std::collections::VecDeque;

/// Queued process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    pid: Pid,
    priority: Priority,
}

/// Position of the weighted round-robin over [`Priority::CYCLE`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct WrrCursor {
    pub class: Priority,
    /// Dispatches left for `class` before the cursor moves on
    pub budget: u32,
}

impl WrrCursor {
    pub fn new(policy: &PriorityPolicy) -> Self {
        let class = Priority::CYCLE[0];
        Self {
            class,
            budget: policy.weight(class),
        }
    }

    /// Move to the next class and reload its budget
    fn advance(&mut self, policy: &PriorityPolicy) {
        let next = (self.class.index() + 1) % Priority::CYCLE.len();
        self.class = Priority::CYCLE[next];
        self.budget = policy.weight(self.class);
    }
}

/// READY processes in global arrival order
///
/// Class FIFO order is the global order filtered by class, so removing an
/// entry never reorders the rest.
#[derive(Debug, Clone)]
pub struct ReadyQueue {
    entries: VecDeque<Entry>,
    cursor: WrrCursor,
}

impl ReadyQueue {
    pub fn new(policy: &PriorityPolicy) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: WrrCursor::new(policy),
        }
    }

    /// Append at the tail of the process's class
    pub fn push_back(&mut self, pid: Pid, priority: Priority) {
        self.entries.push_back(Entry { pid, priority });
    }

    pub fn remove(&mut self, pid: Pid) -> bool {
        match self.entries.iter().position(|e| e.pid == pid) {
            Some(pos) => self.entries.remove(pos).is_some(),
            None => false,
        }
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.entries.iter().any(|e| e.pid == pid)
    }

    /// Re-class a queued process without moving it in the global order
    pub fn set_priority(&mut self, pid: Pid, priority: Priority) -> bool {
        match self.entries.iter_mut().find(|e| e.pid == pid) {
            Some(entry) => {
                entry.priority = priority;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queued PIDs in global order
    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.entries.iter().map(|e| e.pid)
    }

    pub fn has_class(&self, priority: Priority) -> bool {
        self.entries.iter().any(|e| e.priority == priority)
    }

    pub fn cursor(&self) -> WrrCursor {
        self.cursor
    }

    /// Drop all entries and rewind the cursor
    pub fn clear(&mut self, policy: &PriorityPolicy) {
        self.entries.clear();
        self.cursor = WrrCursor::new(policy);
    }

    /// Pick and remove the next process to run
    ///
    /// Skips classes with no candidate or no budget left. The search is
    /// bounded by `classes * (max weight + 1)` cursor moves; if it ever runs
    /// out, the global head is taken regardless of class.
    pub fn pop_next(&mut self, policy: &PriorityPolicy) -> Option<Pid> {
        if self.entries.is_empty() {
            return None;
        }

        let max_attempts = Priority::CYCLE.len() * (policy.max_weight() as usize + 1);
        for _ in 0..max_attempts {
            let class = self.cursor.class;
            if self.cursor.budget == 0 || !self.has_class(class) {
                self.cursor.advance(policy);
                continue;
            }

            if let Some(pid) = self.pop_class_head(class) {
                self.cursor.budget -= 1;
                return Some(pid);
            }
            self.cursor.advance(policy);
        }

        self.entries.pop_front().map(|e| e.pid)
    }

    fn pop_class_head(&mut self, class: Priority) -> Option<Pid> {
        let pos = self.entries.iter().position(|e| e.priority == class)?;
        self.entries.remove(pos).map(|e| e.pid)
    }
}
