use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

use super::settings::EngineSettings;
use super::task_runner::{ExecutionContext, TaskRunner};
use crate::error::RuntimeError;

/// Cloneable handle to the four execution contexts. Every engine component
/// receives one of these instead of reaching for process-wide globals.
#[derive(Clone, Debug)]
pub struct TaskRunners {
    platform: Arc<TaskRunner>,
    ui: Arc<TaskRunner>,
    gpu: Arc<TaskRunner>,
    io: Arc<TaskRunner>,
}

impl TaskRunners {
    pub fn get(&self, context: ExecutionContext) -> &Arc<TaskRunner> {
        match context {
            ExecutionContext::Platform => &self.platform,
            ExecutionContext::Ui => &self.ui,
            ExecutionContext::Gpu => &self.gpu,
            ExecutionContext::Io => &self.io,
        }
    }

    pub fn platform(&self) -> &Arc<TaskRunner> {
        &self.platform
    }

    pub fn ui(&self) -> &Arc<TaskRunner> {
        &self.ui
    }

    pub fn gpu(&self) -> &Arc<TaskRunner> {
        &self.gpu
    }

    pub fn io(&self) -> &Arc<TaskRunner> {
        &self.io
    }

    pub fn post<F>(&self, context: ExecutionContext, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.get(context).post(task);
    }

    pub fn flush(&self, context: ExecutionContext) -> bool {
        self.get(context).flush()
    }

    /// Which context the calling thread belongs to, if any.
    pub fn current(&self) -> Option<ExecutionContext> {
        ExecutionContext::ALL
            .into_iter()
            .find(|context| self.get(*context).runs_tasks_on_current_thread())
    }
}

/// Owns the fixed four-context topology for the lifetime of an engine.
pub struct EngineRuntime {
    runners: TaskRunners,
    shut_down: AtomicBool,
}

impl EngineRuntime {
    pub fn new(settings: &EngineSettings) -> Result<Self, RuntimeError> {
        let prefix = settings.thread_prefix.as_str();
        let spawn = |context: ExecutionContext| {
            TaskRunner::spawn(context, format!("{}.{}", prefix, context))
        };

        let runners = TaskRunners {
            platform: spawn(ExecutionContext::Platform)?,
            ui: spawn(ExecutionContext::Ui)?,
            gpu: spawn(ExecutionContext::Gpu)?,
            io: spawn(ExecutionContext::Io)?,
        };

        info!("engine runtime started with prefix '{}'", prefix);

        Ok(Self {
            runners,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn runners(&self) -> &TaskRunners {
        &self.runners
    }

    pub fn post<F>(&self, context: ExecutionContext, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.runners.post(context, task);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Drains and joins every context. Background contexts close first so
    /// their completions can still land on UI; GPU closes last because UI is
    /// the only context that feeds it.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        for context in [
            ExecutionContext::Io,
            ExecutionContext::Platform,
            ExecutionContext::Ui,
            ExecutionContext::Gpu,
        ] {
            self.runners.get(context).shutdown();
        }

        info!("engine runtime shut down");
    }
}

impl Drop for EngineRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
