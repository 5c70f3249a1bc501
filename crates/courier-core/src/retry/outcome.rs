//! Result contract of one retry execution.

use std::fmt;

use super::error::RetryError;

/// What happened when an operation ran under a retry policy.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// The operation eventually returned a value.
    Succeeded { value: T, attempts: u32 },
    /// Every attempt failed transiently and the budget is spent.
    Exhausted { last_error: E, attempts: u32 },
    /// A permanent failure stopped the run before the budget was spent.
    Aborted { last_error: E, attempts: u32 },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. })
    }

    /// Number of times the operation was actually invoked.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. }
            | RetryOutcome::Exhausted { attempts, .. }
            | RetryOutcome::Aborted { attempts, .. } => *attempts,
        }
    }

    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryOutcome::Succeeded { .. } => None,
            RetryOutcome::Exhausted { last_error, .. } | RetryOutcome::Aborted { last_error, .. } => {
                Some(last_error)
            }
        }
    }

    /// Success value, discarding the failure detail.
    pub fn ok(self) -> Option<T> {
        match self {
            RetryOutcome::Succeeded { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl<T, E: fmt::Display + fmt::Debug> RetryOutcome<T, E> {
    /// Throwing view: raise the final failure for `Exhausted` and `Aborted`.
    pub fn into_result(self) -> Result<T, RetryError<E>> {
        match self {
            RetryOutcome::Succeeded { value, .. } => Ok(value),
            RetryOutcome::Exhausted { last_error, attempts } => {
                Err(RetryError::Exhausted { last_error, attempts })
            }
            RetryOutcome::Aborted { last_error, attempts } => {
                Err(RetryError::Aborted { last_error, attempts })
            }
        }
    }
}
