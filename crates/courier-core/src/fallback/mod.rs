//! Durable local fallback for output that could not be delivered.
//!
//! Each failed run gets its own directory under the fallback root, named by
//! creation time (see [`naming::BundleName`]):
//!
//! ```text
//! <root>/20261019_070509/
//!     report.txt        transformation output
//!     error.txt         human-readable failure summary
//!     index.json        metadata + ordered artifact index
//!     artifacts/01_<label>.png ...
//! ```
//!
//! Bundles are written once and never modified. Only the operator-facing
//! `delete` removes them. Local filesystem errors are surfaced, not retried.

mod bundle;
pub mod naming;
mod store;

pub use bundle::{ArtifactCheck, ArtifactEntry, BundleIndex, BundleSummary, LoadedBundle};
pub use store::FallbackStore;

pub const REPORT_FILE: &str = "report.txt";
pub const ERROR_FILE: &str = "error.txt";
pub const INDEX_FILE: &str = "index.json";
pub const ARTIFACTS_DIR: &str = "artifacts";
