//! Failure types for collaborator calls and for the throwing retry form.

use std::fmt;

/// Error returned by a single collaborator call (acquisition, inference, delivery).
///
/// Classification is message-based, so every variant renders enough detail in
/// `Display` for the classifier to see the HTTP status or transport phrasing.
#[derive(Debug)]
pub enum OpError {
    /// Remote endpoint answered with a non-2xx status.
    Http { status: u32, body: String },
    /// libcurl reported a transport failure (timeout, connect, DNS, ...).
    Curl(curl::Error),
    /// Local I/O failed while preparing or reading data.
    Io(std::io::Error),
    /// Anything else, carried as plain text.
    Other(String),
}

impl OpError {
    pub fn other(msg: impl Into<String>) -> Self {
        OpError::Other(msg.into())
    }

    /// HTTP status code, if the failure came from a response.
    pub fn status(&self) -> Option<u32> {
        match self {
            OpError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpError::Http { status, body } if body.is_empty() => write!(f, "HTTP {}", status),
            OpError::Http { status, body } => write!(f, "HTTP {}: {}", status, body),
            OpError::Curl(e) => write!(f, "network error: {}", e),
            OpError::Io(e) => write!(f, "io: {}", e),
            OpError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for OpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OpError::Curl(e) => Some(e),
            OpError::Io(e) => Some(e),
            OpError::Http { .. } | OpError::Other(_) => None,
        }
    }
}

impl From<curl::Error> for OpError {
    fn from(e: curl::Error) -> Self {
        OpError::Curl(e)
    }
}

impl From<std::io::Error> for OpError {
    fn from(e: std::io::Error) -> Self {
        OpError::Io(e)
    }
}

/// Terminal failure of the throwing retry form.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: fmt::Display + fmt::Debug> {
    /// Every transient failure was retried and the budget ran out.
    #[error("gave up after {attempts} attempt(s): {last_error}")]
    Exhausted { last_error: E, attempts: u32 },
    /// A permanent failure stopped the retries early.
    #[error("aborted on permanent failure after {attempts} attempt(s): {last_error}")]
    Aborted { last_error: E, attempts: u32 },
}

impl<E: fmt::Display + fmt::Debug> RetryError<E> {
    pub fn last_error(&self) -> &E {
        match self {
            RetryError::Exhausted { last_error, .. } | RetryError::Aborted { last_error, .. } => {
                last_error
            }
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Aborted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn into_last_error(self) -> E {
        match self {
            RetryError::Exhausted { last_error, .. } | RetryError::Aborted { last_error, .. } => {
                last_error
            }
        }
    }
}
