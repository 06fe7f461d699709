use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle, ThreadId};

use log::{debug, error, trace, warn};
use parking_lot::Mutex;

use crate::error::RuntimeError;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ExecutionContext {
    Platform,
    Ui,
    Gpu,
    Io,
}

impl ExecutionContext {
    pub const ALL: [ExecutionContext; 4] = [
        ExecutionContext::Platform,
        ExecutionContext::Ui,
        ExecutionContext::Gpu,
        ExecutionContext::Io,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ExecutionContext::Platform => "platform",
            ExecutionContext::Ui => "ui",
            ExecutionContext::Gpu => "gpu",
            ExecutionContext::Io => "io",
        }
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single-threaded, strictly FIFO task queue backed by a dedicated thread.
///
/// Posting never runs the task inline, not even when the caller is already on
/// this runner's thread; the task is queued behind everything posted before
/// it.
pub struct TaskRunner {
    context: ExecutionContext,
    name: String,
    thread_id: ThreadId,
    sender: Mutex<Option<Sender<Task>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TaskRunner {
    pub fn spawn(
        context: ExecutionContext,
        name: impl Into<String>,
    ) -> Result<Arc<Self>, RuntimeError> {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<Task>();

        let thread_name = name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                trace!("{} started", thread_name);
                // Ends once the sender is dropped and the backlog is drained.
                for task in receiver {
                    task();
                }
                trace!("{} drained", thread_name);
            })
            .map_err(|source| RuntimeError::ThreadSpawn {
                name: name.clone(),
                source,
            })?;

        Ok(Arc::new(Self {
            context,
            thread_id: handle.thread().id(),
            name,
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        }))
    }

    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn runs_tasks_on_current_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    pub fn is_shut_down(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Queues `task` and returns immediately.
    ///
    /// Posting after shutdown is a programming error: it panics in debug
    /// builds and drops the task with a warning in release builds.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.try_post(task).is_err() {
            if cfg!(debug_assertions) {
                panic!("task posted to '{}' after shutdown", self.name);
            }
            warn!("dropping task posted to '{}' after shutdown", self.name);
        }
    }

    /// Like [`TaskRunner::post`] but reports a shut-down runner to the caller
    /// instead. Meant for collaborators whose callbacks can legitimately race
    /// engine shutdown.
    pub fn try_post<F>(&self, task: F) -> Result<(), RuntimeError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Err(RuntimeError::AlreadyShutDown);
        };

        sender
            .send(Box::new(task))
            .map_err(|_| RuntimeError::AlreadyShutDown)
    }

    /// Blocks until every task posted before this call has run. Returns
    /// `false` without waiting when called from the runner's own thread or
    /// after shutdown.
    pub fn flush(&self) -> bool {
        if self.runs_tasks_on_current_thread() {
            warn!("refusing to flush '{}' from its own thread", self.name);
            return false;
        }

        let (done_tx, done_rx) = mpsc::channel();
        if self
            .try_post(move || {
                let _ = done_tx.send(());
            })
            .is_err()
        {
            return false;
        }

        done_rx.recv().is_ok()
    }

    /// Stops accepting tasks, lets the backlog drain and joins the thread.
    /// Calling this from the runner's own thread only closes the queue.
    pub fn shutdown(&self) {
        let Some(sender) = self.sender.lock().take() else {
            return;
        };
        drop(sender);

        if self.runs_tasks_on_current_thread() {
            return;
        }

        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                error!("'{}' terminated with a panicking task", self.name);
            } else {
                debug!("'{}' shut down", self.name);
            }
        }
    }
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("context", &self.context)
            .field("name", &self.name)
            .finish()
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;

    fn runner() -> Arc<TaskRunner> {
        TaskRunner::spawn(ExecutionContext::Ui, "test.ui")
            .expect("spawn test runner")
    }

    #[test]
    fn runs_tasks_in_submission_order() {
        let runner = runner();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..100 {
            let seen = seen.clone();
            runner.post(move || seen.lock().push(i));
        }

        assert!(runner.flush());
        assert_eq!(*seen.lock(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn self_post_is_queued_not_inlined() {
        let runner = runner();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = mpsc::channel();

        let inner_runner = runner.clone();
        let inner_seen = seen.clone();
        runner.post(move || {
            let nested_seen = inner_seen.clone();
            inner_runner.post(move || {
                nested_seen.lock().push("nested");
                let _ = done_tx.send(());
            });
            inner_seen.lock().push("outer");
        });

        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("nested task ran");
        assert_eq!(*seen.lock(), vec!["outer", "nested"]);
    }

    #[test]
    fn reports_current_thread() {
        let runner = runner();
        assert!(!runner.runs_tasks_on_current_thread());

        let (tx, rx) = mpsc::channel();
        let inner = runner.clone();
        runner.post(move || {
            let _ = tx.send(inner.runs_tasks_on_current_thread());
        });

        assert!(rx.recv_timeout(Duration::from_secs(5)).expect("recv"));
    }

    #[test]
    fn flush_from_own_thread_is_refused() {
        let runner = runner();
        let (tx, rx) = mpsc::channel();
        let inner = runner.clone();
        runner.post(move || {
            let _ = tx.send(inner.flush());
        });

        assert!(!rx.recv_timeout(Duration::from_secs(5)).expect("recv"));
    }

    #[test]
    fn shutdown_drains_backlog() {
        let runner = runner();
        let seen = Arc::new(Mutex::new(0));

        for _ in 0..10 {
            let seen = seen.clone();
            runner.post(move || *seen.lock() += 1);
        }

        runner.shutdown();
        assert!(runner.is_shut_down());
        assert_eq!(*seen.lock(), 10);
        assert!(runner.try_post(|| {}).is_err());
        assert!(!runner.flush());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "after shutdown")]
    fn post_after_shutdown_panics_in_debug() {
        let runner = runner();
        runner.shutdown();
        runner.post(|| {});
    }
}
