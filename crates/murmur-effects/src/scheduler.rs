//! Cooperative task loop
//!
//! One tokio task drains a channel of boxed closures and runs them one at a
//! time, so protocol state only ever has one writer. Any thread may
//! `register` work; only the loop ever runs it.
//!
//! A panicking task is logged and the loop carries on. This only holds when
//! panics unwind: the workspace release profile sets `panic = "abort"`, so
//! there a panicking task takes the process down.

use murmur_core::effects::{Scheduler, Task};
use murmur_core::SchedulerConfig;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

enum Command {
    Run(Task),
    Stop,
}

/// Tokio-backed implementation of [`Scheduler`].
#[derive(Clone)]
pub struct TaskLoop {
    inner: Arc<TaskLoopInner>,
}

struct TaskLoopInner {
    sender: mpsc::UnboundedSender<Command>,
    runtime: Handle,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TaskLoop {
    /// Spawn the loop on the current tokio runtime.
    ///
    /// Must be called from within a runtime context; the handle is captured so
    /// that later registrations can come from plain OS threads.
    pub fn spawn(config: SchedulerConfig) -> Self {
        let runtime = Handle::current();
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = runtime.spawn(run(receiver, config));
        Self {
            inner: Arc::new(TaskLoopInner {
                sender,
                runtime,
                worker: Mutex::new(Some(worker)),
            }),
        }
    }

    /// Ask the loop to stop once every task registered so far has run, and
    /// wait for it.
    pub async fn shutdown(&self) {
        if self.inner.sender.send(Command::Stop).is_err() {
            tracing::debug!("Task loop already stopped");
        }
        let worker = self.inner.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Task loop terminated abnormally");
            }
        }
    }
}

impl Scheduler for TaskLoop {
    fn register(&self, task: Task) {
        if self.inner.sender.send(Command::Run(task)).is_err() {
            tracing::warn!("Task registered after the task loop stopped; dropping it");
        }
    }

    fn register_delayed(&self, task: Task, delay: Duration) {
        let sender = self.inner.sender.clone();
        self.inner.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if sender.send(Command::Run(task)).is_err() {
                tracing::debug!("Delayed task fired after the task loop stopped");
            }
        });
    }
}

async fn run(mut receiver: mpsc::UnboundedReceiver<Command>, config: SchedulerConfig) {
    let mut ran_this_tick = 0usize;

    while let Some(command) = receiver.recv().await {
        let task = match command {
            Command::Run(task) => task,
            Command::Stop => break,
        };

        let started = Instant::now();
        if catch_unwind(AssertUnwindSafe(task)).is_err() {
            tracing::error!("Scheduled task panicked");
        }
        let elapsed = started.elapsed();
        if elapsed > config.slow_task_warning {
            tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, "Slow scheduled task");
        }

        ran_this_tick += 1;
        if ran_this_tick >= config.max_tasks_per_tick {
            ran_this_tick = 0;
            tokio::task::yield_now().await;
        }
    }

    tracing::debug!("Task loop stopped");
}
