//! Cooperative scheduler interface
//!
//! All protocol-state mutation runs on one logical single-threaded scheduler.
//! Other threads only ever hand work to it through `register`.

use std::sync::Arc;
use std::time::Duration;

/// A unit of work run once on the scheduler.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Deferred execution on the cooperative scheduler.
pub trait Scheduler: Send + Sync {
    /// Run `task` once, asynchronously, on the scheduler.
    ///
    /// Never blocks the caller and never runs `task` inline.
    fn register(&self, task: Task);

    /// Run `task` once on the scheduler after `delay` has elapsed.
    fn register_delayed(&self, task: Task, delay: Duration);
}

impl<T: Scheduler + ?Sized> Scheduler for Arc<T> {
    fn register(&self, task: Task) {
        (**self).register(task);
    }

    fn register_delayed(&self, task: Task, delay: Duration) {
        (**self).register_delayed(task, delay);
    }
}
