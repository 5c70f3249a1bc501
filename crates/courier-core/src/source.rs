//! Acquisition from a local directory of captured images.
//!
//! Whatever produces the captures (a headless browser job, a cron'd screenshot
//! tool) writes them into `source_dir`; this collaborator reads them back in
//! file-name order, using each file stem as the item label.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::item::DeliverableItem;
use crate::pipeline::Acquire;
use crate::retry::OpError;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl Acquire for DirectorySource {
    async fn acquire(&self) -> Result<Vec<DeliverableItem>, OpError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(OpError::other(format!(
                    "source directory not found: {}",
                    self.dir.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && is_image(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(OpError::other(format!(
                "not found: no source images in {}",
                self.dir.display()
            )));
        }

        let mut items = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(&path).await?;
            let label = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            items.push(DeliverableItem::new(label, bytes));
        }
        tracing::debug!(dir = %self.dir.display(), count = items.len(), "acquired source images");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{classify, Disposition};

    #[tokio::test]
    async fn reads_images_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("02_signups.png"), b"two").unwrap();
        std::fs::write(dir.path().join("01_revenue.JPG"), b"one").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip").unwrap();
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let items = DirectorySource::new(dir.path()).acquire().await.unwrap();
        let labels: Vec<&str> = items.iter().map(|i| i.label()).collect();
        assert_eq!(labels, vec!["01_revenue", "02_signups"]);
        assert_eq!(items[0].payload(), b"one");
    }

    #[tokio::test]
    async fn empty_or_missing_dir_is_permanent() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirectorySource::new(dir.path()).acquire().await.unwrap_err();
        assert_eq!(classify(&err), Disposition::Permanent);

        let err = DirectorySource::new(dir.path().join("absent"))
            .acquire()
            .await
            .unwrap_err();
        assert_eq!(classify(&err), Disposition::Permanent);
    }
}
