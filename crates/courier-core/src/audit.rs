//! Append-only retry audit trail.
//!
//! One line per scheduled retry, across every call site:
//! `<rfc3339 utc>\t<operation>\tattempt=<n>\tdelay_ms=<ms>\t<error>`.
//! The file is opened in append mode and never truncated.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::logging;
use crate::retry::{RetryEvent, RetryObserver};

/// Retry observer that appends each event to a log file.
pub struct AuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl AuditLog {
    /// Open (or create) the audit log at `path`, creating parent dirs if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open audit log: {}", path.display()))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Default location: `~/.local/state/courier/retry_audit.log`.
    pub fn open_default() -> Result<Self> {
        Self::open(logging::state_dir()?.join("retry_audit.log"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Render one audit line (without trailing newline). Tabs and newlines in the
/// error text are flattened so each event stays on a single line.
fn format_line(event: &RetryEvent<'_>) -> String {
    let error: String = event
        .error
        .chars()
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .collect();
    format!(
        "{}\t{}\tattempt={}\tdelay_ms={}\t{}",
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        event.operation,
        event.attempt,
        event.delay.as_millis(),
        error
    )
}

impl RetryObserver for AuditLog {
    fn on_retry(&self, event: &RetryEvent<'_>) -> Result<()> {
        let line = format_line(event);
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("audit log lock poisoned"))?;
        writeln!(file, "{}", line).with_context(|| format!("append {}", self.path.display()))?;
        Ok(())
    }
}
