pub mod error;
pub mod framework;
pub mod isolate;
pub mod painting;
pub mod pipeline;
pub mod prelude;
pub mod runtime;
pub mod shell;
pub mod window;

pub use crate::framework::logging::init_logger;
pub use crate::shell::{Shell, ShellParts};
