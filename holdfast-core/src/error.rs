//! The error taxonomy shared by every component in this crate.
//!
//! Every fallible operation in the core returns a [`CoreError`] (or a
//! narrower enum that implements [`ErrorClass`]), never a bare `String` or
//! `anyhow::Error` — the Reconciler's catch/continue/terminate/unwind policy
//! (see module docs on `reconciler`) dispatches on [`ErrorClass::class`]
//! alone, so every error produced anywhere in the core must be classifiable.

use std::fmt;

/// The six error classes a reconciler handler may produce, matching the
/// taxonomy every caught error is bucketed into before the scheduler
/// decides whether to continue, skip, or unwind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network timeouts, rate-limited responses, stalled downloads below
    /// grace period. Recovered by the next tick.
    Transient,
    /// Optimistic concurrency failure on a state transition.
    Conflict,
    /// Entity, metadata, or download missing.
    NotFound,
    /// Malformed input, unsupported enum value, rejected release.
    Invalid,
    /// A provider returned a non-success status after retries were
    /// exhausted.
    External,
    /// Filesystem corruption, database unavailable, schema incompatibility.
    /// Propagates to process exit.
    Fatal,
}

impl ErrorKind {
    /// Whether the reconciler should continue evaluating the next entity
    /// after catching an error of this kind, as opposed to unwinding the
    /// whole loop.
    pub fn is_recoverable(self) -> bool {
        !matches!(self, ErrorKind::Fatal)
    }
}

/// Implemented by every error enum in this crate so the reconciler can
/// dispatch on a single method instead of re-deriving the taxonomy per
/// error type.
pub trait ErrorClass {
    fn class(&self) -> ErrorKind;
}

/// The umbrella error type returned at component boundaries (the Entity
/// Store, the Indexer Gateway, the Download Tracker, the Library Importer,
/// the Reconciler itself). Component-local enums convert into this via
/// `From` so call sites threading errors upward don't need per-component
/// match arms.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("conflict: expected state did not match current state")]
    Conflict,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("external provider error: {0}")]
    External(String),

    #[error("fatal: {0}")]
    Fatal(String),
}

impl ErrorClass for CoreError {
    fn class(&self) -> ErrorKind {
        match self {
            CoreError::Transient(_) => ErrorKind::Transient,
            CoreError::Conflict => ErrorKind::Conflict,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Invalid(_) => ErrorKind::Invalid,
            CoreError::External(_) => ErrorKind::External,
            CoreError::Fatal(_) => ErrorKind::Fatal,
        }
    }
}

impl CoreError {
    pub fn transient(msg: impl fmt::Display) -> Self {
        CoreError::Transient(msg.to_string())
    }

    pub fn not_found(msg: impl fmt::Display) -> Self {
        CoreError::NotFound(msg.to_string())
    }

    pub fn invalid(msg: impl fmt::Display) -> Self {
        CoreError::Invalid(msg.to_string())
    }

    pub fn external(msg: impl fmt::Display) -> Self {
        CoreError::External(msg.to_string())
    }

    pub fn fatal(msg: impl fmt::Display) -> Self {
        CoreError::Fatal(msg.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => CoreError::NotFound(err.to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                CoreError::Transient(err.to_string())
            }
            _ => CoreError::Fatal(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            CoreError::Transient(err.to_string())
        } else {
            CoreError::External(err.to_string())
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_is_the_only_unrecoverable_kind() {
        assert!(!ErrorKind::Fatal.is_recoverable());
        assert!(ErrorKind::Transient.is_recoverable());
        assert!(ErrorKind::Conflict.is_recoverable());
        assert!(ErrorKind::NotFound.is_recoverable());
        assert!(ErrorKind::Invalid.is_recoverable());
        assert!(ErrorKind::External.is_recoverable());
    }

    #[test]
    fn core_error_classifies_itself() {
        assert_eq!(CoreError::Conflict.class(), ErrorKind::Conflict);
        assert_eq!(
            CoreError::invalid("bad enum value").class(),
            ErrorKind::Invalid
        );
    }
}
