// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The run-wide deferred task queue.
//!
//! Work that needs the whole graph to have been walked once, such as binding
//! a child to a parent that is created later, is queued here and drained in
//! waves after the primary walk. Each wave runs a snapshot of the queue; tasks
//! may enqueue further tasks for the next wave.

use std::fmt;
use stf_core::{Severity, StfReport};

/// Upper bound on the number of waves drained in one run.
pub const MAX_TASK_WAVES: usize = 1000;

/// A FIFO of pending tasks, drained one wave at a time.
pub struct TaskQueue<T> {
    pending: Vec<T>,
}

impl<T> TaskQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Appends a task to be run in the next wave.
    pub fn push(&mut self, task: T) {
        self.pending.push(task);
    }

    /// Returns the number of pending tasks.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if no task is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Takes a snapshot of every pending task, leaving the queue empty.
    pub fn take_wave(&mut self) -> Vec<T> {
        std::mem::take(&mut self.pending)
    }

    /// Drops every pending task, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TaskQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// The report raised when tasks are still pending after [`MAX_TASK_WAVES`].
pub(crate) fn wave_limit_report(pending: usize) -> StfReport {
    StfReport::new(
        Severity::Error,
        format!(
            "unresolvable dependency cycle or excessive chain length: \
             {pending} tasks still pending after {MAX_TASK_WAVES} waves"
        ),
    )
}
