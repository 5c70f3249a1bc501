//! On-disk metadata of a fallback bundle and its read-side views.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One saved item, in original delivery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// 1-based position in the original item sequence.
    pub position: usize,
    pub label: String,
    /// File name inside the bundle's `artifacts/` directory.
    pub filename: String,
    pub bytes: u64,
    pub sha256: String,
}

/// Contents of `index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleIndex {
    /// RFC 3339 creation time (UTC).
    pub created_at: String,
    /// Rendered failure that triggered the save.
    pub error: String,
    pub text_bytes: u64,
    pub artifacts: Vec<ArtifactEntry>,
}

/// Listing entry for `list()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSummary {
    pub name: String,
    pub path: PathBuf,
    pub created_at: String,
    pub artifact_count: usize,
}

/// Full read of one bundle.
#[derive(Debug, Clone)]
pub struct LoadedBundle {
    pub name: String,
    pub path: PathBuf,
    pub text: String,
    pub error: String,
    pub index: BundleIndex,
}

impl LoadedBundle {
    pub fn artifact_count(&self) -> usize {
        self.index.artifacts.len()
    }
}

/// Result of re-hashing one artifact against the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCheck {
    pub filename: String,
    pub expected: String,
    /// `None` when the artifact file is missing or unreadable.
    pub actual: Option<String>,
}

impl ArtifactCheck {
    pub fn is_ok(&self) -> bool {
        self.actual.as_deref() == Some(self.expected.as_str())
    }
}
