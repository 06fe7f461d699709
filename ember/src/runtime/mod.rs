pub mod events;
pub mod settings;
pub mod task_runner;
pub mod task_runners;
pub mod vsync_waiter;

pub use task_runner::{ExecutionContext, Task, TaskRunner};
pub use task_runners::{EngineRuntime, TaskRunners};
