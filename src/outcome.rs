//! Value-or-error container for stdlib-style operations.
//!
//! Native functions report failure through [`Outcome`] instead of failing
//! fast. The owning [`LastError`] slot remembers the most recent failure so
//! call paths that can only hand back a plain value (or none) still leave
//! the failure detail behind for `last_error()`.

use std::cell::RefCell;

use thiserror::Error;

use crate::{diagnostics::Diagnostic, error_code::ErrorCode};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Err(Diagnostic),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OutcomeError {
    #[error("an outcome cannot hold both a value and an error")]
    Both,
    #[error("an outcome must hold either a value or an error")]
    Neither,
}

impl<T> Outcome<T> {
    /// Build an outcome from optional parts; exactly one must be present.
    pub fn from_parts(
        value: Option<T>,
        error: Option<Diagnostic>,
    ) -> Result<Outcome<T>, OutcomeError> {
        match (value, error) {
            (Some(value), None) => Ok(Outcome::Ok(value)),
            (None, Some(error)) => Ok(Outcome::Err(error)),
            (Some(_), Some(_)) => Err(OutcomeError::Both),
            (None, None) => Err(OutcomeError::Neither),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    pub fn is_err(&self) -> bool {
        matches!(self, Outcome::Err(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Ok(value) => Some(value),
            Outcome::Err(_) => None,
        }
    }

    pub fn error(&self) -> Option<&Diagnostic> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Err(error) => Some(error),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ok(value) => Outcome::Ok(f(value)),
            Outcome::Err(error) => Outcome::Err(error),
        }
    }

    pub fn into_result(self) -> Result<T, Diagnostic> {
        match self {
            Outcome::Ok(value) => Ok(value),
            Outcome::Err(error) => Err(error),
        }
    }
}

/// Per-execution "last error" slot.
#[derive(Debug, Default)]
pub struct LastError {
    slot: RefCell<Option<Diagnostic>>,
}

impl LastError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful outcome; clears the slot.
    pub fn ok<T>(&self, value: T) -> Outcome<T> {
        self.slot.borrow_mut().take();
        Outcome::Ok(value)
    }

    /// Failed outcome; the diagnostic is remembered in the slot.
    pub fn err<T>(&self, code: ErrorCode, message: impl Into<String>) -> Outcome<T> {
        self.fail(Diagnostic::new(code, message))
    }

    pub fn fail<T>(&self, diagnostic: Diagnostic) -> Outcome<T> {
        self.record(diagnostic.clone());
        Outcome::Err(diagnostic)
    }

    /// Remember a failure without producing an outcome.
    pub fn record(&self, diagnostic: Diagnostic) {
        *self.slot.borrow_mut() = Some(diagnostic);
    }

    pub fn get(&self) -> Option<Diagnostic> {
        self.slot.borrow().clone()
    }

    pub fn clear(&self) {
        self.slot.borrow_mut().take();
    }
}
