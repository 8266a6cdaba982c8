//! Virtual-time scheduler
//!
//! Tasks run only when the test says so: `run_pending` runs everything due
//! at the current virtual instant, `advance` moves the clock first. Tasks
//! are taken out before running, so they may register further tasks.

use murmur_core::effects::{Scheduler, Task};
use parking_lot::Mutex;
use std::time::Duration;

struct Entry {
    due: Duration,
    sequence: u64,
    task: Task,
}

#[derive(Default)]
struct State {
    now: Duration,
    next_sequence: u64,
    queue: Vec<Entry>,
}

/// Deterministic [`Scheduler`] driven by the test.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<State>,
}

impl ManualScheduler {
    /// Scheduler at virtual time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Tasks not yet run, due or not.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Move the clock forward by `by` and run everything that became due.
    pub fn advance(&self, by: Duration) -> usize {
        self.state.lock().now += by;
        self.run_pending()
    }

    /// Run due tasks in (due time, registration) order until none is left.
    /// Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.pop_due() {
            task();
            ran += 1;
        }
        ran
    }

    fn pop_due(&self) -> Option<Task> {
        let mut state = self.state.lock();
        let now = state.now;
        let index = state
            .queue
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due <= now)
            .min_by_key(|(_, entry)| (entry.due, entry.sequence))
            .map(|(index, _)| index)?;
        Some(state.queue.swap_remove(index).task)
    }

    fn push(&self, task: Task, delay: Duration) {
        let mut state = self.state.lock();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let due = state.now + delay;
        state.queue.push(Entry { due, sequence, task });
    }
}

impl Scheduler for ManualScheduler {
    fn register(&self, task: Task) {
        self.push(task, Duration::ZERO);
    }

    fn register_delayed(&self, task: Task, delay: Duration) {
        self.push(task, delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_runs_in_due_order() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for (label, delay) in [("late", 20), ("now", 0), ("soon", 10)] {
            let log = log.clone();
            scheduler.register_delayed(
                Box::new(move || log.lock().push(label)),
                Duration::from_millis(delay),
            );
        }

        assert_eq!(scheduler.run_pending(), 1);
        assert_eq!(scheduler.advance(Duration::from_millis(20)), 2);
        assert_eq!(*log.lock(), vec!["now", "soon", "late"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_task_may_register_tasks() {
        let scheduler = Arc::new(ManualScheduler::new());
        let hits = Arc::new(Mutex::new(0));

        let inner_scheduler = scheduler.clone();
        let inner_hits = hits.clone();
        scheduler.register(Box::new(move || {
            let hits = inner_hits.clone();
            inner_scheduler.register(Box::new(move || *hits.lock() += 1));
        }));

        assert_eq!(scheduler.run_pending(), 2);
        assert_eq!(*hits.lock(), 1);
    }
}
