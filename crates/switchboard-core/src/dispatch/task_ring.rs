use std::collections::VecDeque;
use tokio::task::JoinHandle;

/// Default number of handler tasks a client keeps track of.
pub const DEFAULT_TASK_CAPACITY: usize = 100;

/// Handle of a spawned handler task.
///
/// Dropping it detaches the task; the task keeps running to completion.
#[derive(Debug)]
pub struct TrackedTask {
    pub sequence: u64,
    pub channel: String,
    handle: JoinHandle<()>,
}

impl TrackedTask {
    pub fn new(sequence: u64, channel: impl Into<String>, handle: JoinHandle<()>) -> Self {
        Self {
            sequence,
            channel: channel.into(),
            handle,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Bounded FIFO of recently spawned handler tasks.
///
/// Only retains handles; results are never awaited. When the ring is full the
/// oldest handle is evicted before the newest one is inserted.
#[derive(Debug)]
pub struct TaskRing {
    capacity: usize,
    tasks: VecDeque<TrackedTask>,
}

impl TaskRing {
    /// Capacity is clamped to at least one slot.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            tasks: VecDeque::with_capacity(capacity),
        }
    }

    /// Track a task, returning the evicted oldest task if the ring was full.
    pub fn push(&mut self, task: TrackedTask) -> Option<TrackedTask> {
        let evicted = if self.tasks.len() >= self.capacity {
            self.tasks.pop_front()
        } else {
            None
        };
        self.tasks.push_back(task);
        evicted
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Dispatch sequence numbers of the tracked tasks, oldest first.
    pub fn sequences(&self) -> Vec<u64> {
        self.tasks.iter().map(|task| task.sequence).collect()
    }

    /// Number of tracked tasks that are still running.
    pub fn running(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_finished()).count()
    }
}

impl Default for TaskRing {
    fn default() -> Self {
        Self::new(DEFAULT_TASK_CAPACITY)
    }
}
