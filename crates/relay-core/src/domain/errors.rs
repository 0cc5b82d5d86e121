//! Errors - エラー型と分類
//!
//! - `RegistrationError`: register 時（同期）
//! - `DispatchError`: enqueue 時（同期、publish 前に止まる）
//! - `ExecutionError`: run 時（backend 経由なら error channel に非同期で届く）
//! - business error: タスク関数自身が返したエラー。エンジンは中身を解釈しない

use thiserror::Error;

use super::name::TaskName;

/// Error returned by a task body.
pub type TaskError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The single, error-shaped return value of every task function.
pub type TaskResult = Result<(), TaskError>;

/// What one consumed envelope produced; written to the backend's error channel.
pub type RunResult = Result<(), ExecutionError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("expected a func as input but was {found}")]
    NotAFunction { found: String },

    #[error("expected func to have at least one argument of type TaskContext")]
    MissingContextArg,

    #[error("expected func to have first argument to be TaskContext but found {found}")]
    FirstArgNotContext { found: String },

    #[error("expected func to return only error but found {found} return value(s)")]
    MultipleReturnValues { found: usize },

    #[error("expected func to return error but found {found}")]
    ReturnNotError { found: String },
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("argument: {position} of type {type_name} is not declared to the codec")]
    Undeclared {
        position: usize,
        type_name: &'static str,
    },

    #[error("argument: {position} of type {type_name} cannot be serialized: {source}")]
    Unencodable {
        position: usize,
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("envelope cannot be serialized: {0}")]
    Envelope(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DecodingError {
    #[error("malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("expected {expected} function arg(s) but found {found}")]
    ArgumentCount { expected: usize, found: usize },

    #[error("argument: {position} cannot be decoded into type: {type_name}: {source}")]
    Argument {
        position: usize,
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("backend is closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend consumer is already started")]
    AlreadyStarted,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("function \"{name}\" not found")]
    NotRegistered { name: TaskName },

    #[error("expected {expected} function arg(s) but found {found}")]
    ArgumentCountMismatch { expected: usize, found: usize },

    #[error("unable to assign argument: {position} from type: {from} to type: {to}")]
    ArgumentTypeMismatch {
        position: usize,
        from: &'static str,
        to: &'static str,
    },

    #[error("unable to encode the function: {0}")]
    Encoding(#[from] EncodingError),

    #[error("unable to publish the function: {0}")]
    Publish(#[from] PublishError),
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("unable to decode the message: {0}")]
    Decoding(#[from] DecodingError),

    #[error("function \"{name}\" not found")]
    NotRegistered { name: TaskName },

    #[error("expected the return value to be error but found {found}")]
    InvalidReturnValue { found: &'static str },

    #[error("function \"{name}\" panicked: {message}")]
    Panicked { name: TaskName, message: String },

    /// The task's own error, displayed unchanged.
    #[error("{0}")]
    Failed(TaskError),
}

impl ExecutionError {
    /// The task's own error, if this is one.
    pub fn business(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            ExecutionError::Failed(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    pub fn is_business(&self) -> bool {
        matches!(self, ExecutionError::Failed(_))
    }
}
