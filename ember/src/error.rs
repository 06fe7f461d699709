use std::io;

use thiserror::Error;

use crate::window::ResponseHandle;

/// Raised when a platform reply cannot be matched to a pending request.
///
/// The reply path can legitimately race with window teardown, so callers log
/// this and move on.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum CorrelationError {
    #[error("no pending platform message response for handle {0}")]
    UnknownHandle(ResponseHandle),
}

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum NativeError {
    #[error("unknown native function '{0}'")]
    UnknownFunction(String),

    #[error("native function '{name}' expects {expected} arguments, got {got}")]
    Arity {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{0}")]
    ArgumentType(String),

    #[error("no isolate is running")]
    NoIsolate,

    #[error(transparent)]
    Correlation(#[from] CorrelationError),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse YAML settings: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("unsupported settings format '{0}'")]
    UnsupportedFormat(String),
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to spawn '{name}' thread: {source}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("engine runtime has already shut down")]
    AlreadyShutDown,
}
