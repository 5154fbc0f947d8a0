//! Errors - エラー型と分類
//!
//! `AppError` is what every public App operation returns. `ErrorKind` is the
//! operational classification of an error, independent of its message.

use thiserror::Error;

use crate::config::Diagnostics;
use crate::domain::record::BuildRecord;
use crate::ports::{HookError, StoreError};

/// Errors produced by plugin code (constructors, converters, stage functions).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// ErrorKind は実行エラーの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    TypeMismatch,
    ResolutionFailure,
    ConfigurationInvalid,
    ActionFailure,
    PersistenceFailure,
    HookFailure,
    Cancelled,
    Internal,
}

/// An error returned by a plugin-provided function, kept as-is.
#[derive(Debug, Error)]
#[error("{inner}")]
pub struct ActionError {
    inner: BoxError,
}

impl ActionError {
    pub fn new(inner: impl Into<BoxError>) -> Self {
        Self {
            inner: inner.into(),
        }
    }

    pub fn into_inner(self) -> BoxError {
        self.inner
    }

    pub fn get_ref(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.inner.as_ref()
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("operation expected result type {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("cannot call {function}: no value or converter chain produces an argument of type {parameter}")]
    Resolution { function: String, parameter: String },

    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(Diagnostics),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error("persisting operation record: {0}")]
    Persistence(#[from] StoreError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("constructor for type {0:?} is already registered")]
    DuplicateConstructor(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The build was persisted but pushing it failed.
    #[error("build succeeded but push failed: {source}")]
    PushFailed {
        build: Box<BuildRecord>,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            AppError::Resolution { .. } => ErrorKind::ResolutionFailure,
            AppError::ConfigurationInvalid(_) => ErrorKind::ConfigurationInvalid,
            AppError::Action(_) => ErrorKind::ActionFailure,
            AppError::Persistence(_) => ErrorKind::PersistenceFailure,
            AppError::Hook(_) => ErrorKind::HookFailure,
            AppError::Cancelled => ErrorKind::Cancelled,
            AppError::DuplicateConstructor(_) | AppError::Io(_) => ErrorKind::Internal,
            AppError::PushFailed { source, .. } => source.kind(),
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }
}
