// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Priority queue of ready tasks for the work-queue executor.
//!
//! Tasks are ordered by:
//! 1. **Height** (length of the longest chain of dependents, higher first),
//!    so work on the critical path starts as early as possible
//! 2. **Task id** (lower first), which follows registration and corpus order
//!    and keeps scheduling deterministic
//!
//! ```rust
//! use annograph::engine::priority_work_queue::{PrioritizedTask, PriorityWorkQueue};
//!
//! let mut queue = PriorityWorkQueue::new();
//! queue.push(PrioritizedTask::new(0, 0));
//! queue.push(PrioritizedTask::new(1, 2));
//! queue.push(PrioritizedTask::new(2, 2));
//!
//! assert_eq!(queue.pop(), Some(1));
//! assert_eq!(queue.pop(), Some(2));
//! assert_eq!(queue.pop(), Some(0));
//! assert_eq!(queue.pop(), None);
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::graph::TaskId;

/// A task whose dependencies have all completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrioritizedTask {
    pub task_id: TaskId,
    pub height: usize,
}

impl PrioritizedTask {
    pub fn new(task_id: TaskId, height: usize) -> Self {
        Self { task_id, height }
    }
}

impl Ord for PrioritizedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.height
            .cmp(&other.height)
            // BinaryHeap is a max-heap; reverse so the lower id wins
            .then_with(|| other.task_id.cmp(&self.task_id))
    }
}

impl PartialOrd for PrioritizedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
pub struct PriorityWorkQueue {
    heap: BinaryHeap<PrioritizedTask>,
}

impl PriorityWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: PrioritizedTask) {
        self.heap.push(task);
    }

    pub fn pop(&mut self) -> Option<TaskId> {
        self.heap.pop().map(|task| task.task_id)
    }

    pub fn peek(&self) -> Option<TaskId> {
        self.heap.peek().map(|task| task.task_id)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Extend<PrioritizedTask> for PriorityWorkQueue {
    fn extend<I: IntoIterator<Item = PrioritizedTask>>(&mut self, iter: I) {
        self.heap.extend(iter);
    }
}
