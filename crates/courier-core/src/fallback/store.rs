//! Filesystem-backed fallback bundle store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::bundle::{ArtifactCheck, ArtifactEntry, BundleIndex, BundleSummary, LoadedBundle};
use super::naming::{artifact_filename, is_safe_component, BundleName};
use super::{ARTIFACTS_DIR, ERROR_FILE, INDEX_FILE, REPORT_FILE};
use crate::checksum;
use crate::item::DeliverableItem;

/// Bundles more than this many per second are refused rather than looping forever.
const MAX_SEQUENCE: u32 = 10_000;

/// Handle to the fallback root directory.
#[derive(Debug, Clone)]
pub struct FallbackStore {
    root: PathBuf,
}

impl FallbackStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a new bundle and returns its directory. Every call creates a
    /// distinct directory; existing bundles are never overwritten.
    pub fn save(
        &self,
        text: &str,
        items: &[DeliverableItem],
        error: &dyn fmt::Display,
    ) -> Result<PathBuf> {
        self.save_at(Utc::now(), text, items, error)
    }

    pub(crate) fn save_at(
        &self,
        now: DateTime<Utc>,
        text: &str,
        items: &[DeliverableItem],
        error: &dyn fmt::Display,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("create fallback root: {}", self.root.display()))?;
        let dir = self.reserve_dir(now)?;
        discard_on_error(&dir, || write_contents(&dir, now, text, items, error))?;
        tracing::info!(
            path = %dir.display(),
            items = items.len(),
            "saved fallback bundle"
        );
        Ok(dir)
    }

    /// Atomically claims the first free `<timestamp>[_n]` directory.
    fn reserve_dir(&self, now: DateTime<Utc>) -> Result<PathBuf> {
        for sequence in 0..MAX_SEQUENCE {
            let dir = self.root.join(BundleName::new(now, sequence).render());
            match fs::create_dir(&dir) {
                Ok(()) => return Ok(dir),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| format!("create bundle dir: {}", dir.display()))
                }
            }
        }
        anyhow::bail!("too many fallback bundles for {}", now)
    }

    /// All bundles under the root, most recent first. Directories whose name is
    /// not a bundle timestamp are ignored; a missing root lists as empty.
    pub fn list(&self) -> Result<Vec<BundleSummary>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("read dir: {}", self.root.display()))
            }
        };

        let mut found: Vec<(BundleName, String, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("read dir: {}", self.root.display()))?;
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(parsed) = BundleName::parse(&name) {
                found.push((parsed, name, entry.path()));
            }
        }
        found.sort_by(|a, b| b.0.cmp(&a.0));

        let mut out = Vec::with_capacity(found.len());
        for (_, name, path) in found {
            match read_index(&path) {
                Ok(index) => out.push(BundleSummary {
                    name,
                    path,
                    created_at: index.created_at,
                    artifact_count: index.artifacts.len(),
                }),
                Err(e) => tracing::warn!(path = %path.display(), "skipping unreadable bundle: {:#}", e),
            }
        }
        Ok(out)
    }

    /// Reads text, error summary and index of one bundle.
    pub fn load(&self, name: &str) -> Result<LoadedBundle> {
        let path = self.bundle_path(name)?;
        let text = fs::read_to_string(path.join(REPORT_FILE))
            .with_context(|| format!("read report in {}", path.display()))?;
        let error = fs::read_to_string(path.join(ERROR_FILE))
            .with_context(|| format!("read error summary in {}", path.display()))?;
        let index = read_index(&path)?;
        Ok(LoadedBundle {
            name: name.to_string(),
            path,
            text,
            error,
            index,
        })
    }

    /// Loads the saved items back, in original order.
    pub fn load_items(&self, name: &str) -> Result<Vec<DeliverableItem>> {
        let path = self.bundle_path(name)?;
        let index = read_index(&path)?;
        let mut items = Vec::with_capacity(index.artifacts.len());
        for entry in &index.artifacts {
            let file = path.join(ARTIFACTS_DIR).join(&entry.filename);
            let bytes = fs::read(&file).with_context(|| format!("read {}", file.display()))?;
            items.push(DeliverableItem::new(entry.label.clone(), bytes));
        }
        Ok(items)
    }

    /// Re-hashes every artifact and compares with the digest in the index.
    pub fn verify(&self, name: &str) -> Result<Vec<ArtifactCheck>> {
        let path = self.bundle_path(name)?;
        let index = read_index(&path)?;
        Ok(index
            .artifacts
            .into_iter()
            .map(|entry| {
                let file = path.join(ARTIFACTS_DIR).join(&entry.filename);
                let actual = checksum::sha256_path(&file).ok();
                ArtifactCheck {
                    filename: entry.filename,
                    expected: entry.sha256,
                    actual,
                }
            })
            .collect())
    }

    /// Removes a bundle directory and everything in it.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.bundle_path(name)?;
        fs::remove_dir_all(&path).with_context(|| format!("remove {}", path.display()))?;
        tracing::info!(path = %path.display(), "deleted fallback bundle");
        Ok(())
    }

    fn bundle_path(&self, name: &str) -> Result<PathBuf> {
        if !is_safe_component(name) || BundleName::parse(name).is_none() {
            anyhow::bail!("not a fallback bundle name: {:?}", name);
        }
        let path = self.root.join(name);
        if !path.is_dir() {
            anyhow::bail!("fallback bundle not found: {}", name);
        }
        Ok(path)
    }
}

/// Runs `fill` on a freshly reserved bundle directory. If it fails, the
/// directory is removed so no bundle without an index is left behind.
fn discard_on_error<T>(dir: &Path, fill: impl FnOnce() -> Result<T>) -> Result<T> {
    fill().map_err(|err| {
        if let Err(e) = fs::remove_dir_all(dir) {
            tracing::warn!(path = %dir.display(), "could not remove partial bundle: {}", e);
        }
        err
    })
}

/// Writes artifacts, report, error summary and finally the index into `dir`.
fn write_contents(
    dir: &Path,
    now: DateTime<Utc>,
    text: &str,
    items: &[DeliverableItem],
    error: &dyn fmt::Display,
) -> Result<()> {
    let error_text = error.to_string();

    let artifacts_dir = dir.join(ARTIFACTS_DIR);
    fs::create_dir(&artifacts_dir)
        .with_context(|| format!("create dir: {}", artifacts_dir.display()))?;

    let mut artifacts = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let position = i + 1;
        let filename = artifact_filename(position, item.label(), item.extension());
        let path = artifacts_dir.join(&filename);
        fs::write(&path, item.payload())
            .with_context(|| format!("write artifact: {}", path.display()))?;
        artifacts.push(ArtifactEntry {
            position,
            label: item.label().to_string(),
            filename,
            bytes: item.payload().len() as u64,
            sha256: checksum::sha256_bytes(item.payload()),
        });
    }

    let report_path = dir.join(REPORT_FILE);
    fs::write(&report_path, text)
        .with_context(|| format!("write report: {}", report_path.display()))?;

    let created_at = now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let summary = format!(
        "Delivery failed at {}\nError: {}\nItems saved: {}\n",
        created_at,
        error_text,
        items.len()
    );
    let error_path = dir.join(ERROR_FILE);
    fs::write(&error_path, summary)
        .with_context(|| format!("write error summary: {}", error_path.display()))?;

    let index = BundleIndex {
        created_at,
        error: error_text,
        text_bytes: text.len() as u64,
        artifacts,
    };
    let json = serde_json::to_string_pretty(&index).context("serialize bundle index")?;
    let index_path = dir.join(INDEX_FILE);
    fs::write(&index_path, json)
        .with_context(|| format!("write index: {}", index_path.display()))?;
    Ok(())
}

fn read_index(dir: &Path) -> Result<BundleIndex> {
    let path = dir.join(INDEX_FILE);
    let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}
