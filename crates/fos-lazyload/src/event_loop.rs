//! Event Loop
//!
//! Single-threaded macrotask queue with timers on a virtual clock. The loop
//! hands out one runnable task at a time; the caller runs it with no borrow
//! of the loop held, so tasks may freely schedule or clear other tasks.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use crate::host::{Task, TimerId};

struct Timer {
    id: TimerId,
    due: Duration,
    task: Task,
}

/// Event loop with a virtual clock
#[derive(Default)]
pub struct EventLoop {
    /// Ready tasks, FIFO
    macrotasks: VecDeque<Task>,
    /// Armed timers
    timers: Vec<Timer>,
    next_timer_id: u64,
    /// Virtual time since creation
    current_time: Duration,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task for the next turn
    pub fn queue_task(&mut self, task: Task) {
        self.macrotasks.push_back(task);
    }

    /// Arm a one-shot timer
    pub fn set_timeout(&mut self, delay: Duration, task: Task) -> TimerId {
        self.next_timer_id += 1;
        let id = TimerId(self.next_timer_id);
        self.timers.push(Timer {
            id,
            due: self.current_time + delay,
            task,
        });
        id
    }

    /// Disarm a timer. Returns false if it already fired or never existed.
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    /// Next runnable task no later than `until`.
    ///
    /// Queued tasks come first; otherwise the earliest due timer fires, ties
    /// broken by arming order, and the clock moves to its deadline.
    pub fn pop_ready(&mut self, until: Duration) -> Option<Task> {
        if let Some(task) = self.macrotasks.pop_front() {
            return Some(task);
        }

        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= until)
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(i, _)| i)?;

        let timer = self.timers.swap_remove(index);
        self.current_time = self.current_time.max(timer.due);
        Some(timer.task)
    }

    /// Move the clock forward (never backwards)
    pub fn advance_to(&mut self, time: Duration) {
        self.current_time = self.current_time.max(time);
    }

    pub fn current_time(&self) -> Duration {
        self.current_time
    }

    /// Number of armed timers
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Deadline of the earliest armed timer
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.iter().map(|t| t.due).min()
    }

    /// Check if there's pending work
    pub fn has_pending_work(&self) -> bool {
        !self.macrotasks.is_empty() || !self.timers.is_empty()
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("macrotasks", &self.macrotasks.len())
            .field("timers", &self.timers.len())
            .field("current_time", &self.current_time)
            .finish()
    }
}
