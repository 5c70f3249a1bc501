//! Retry and backoff policy.
//!
//! This module encapsulates failure classification (network, timeout and
//! throttling versus auth and validation errors) and exponential backoff so
//! that every call site in the pipeline shares one consistent engine.

mod classify;
mod error;
mod outcome;
mod policy;
mod run;

pub use classify::{classify, classify_message, Disposition};
pub use error::{OpError, RetryError};
pub use outcome::RetryOutcome;
pub use policy::{RetryDecision, RetryPolicy};
pub use run::{execute, run_with_retry, LogObserver, ObserverChain, RetryEvent, RetryObserver};
