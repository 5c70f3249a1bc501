//! `courier checksum <path>...` – SHA-256 of one or more files.

use anyhow::Result;
use courier_core::checksum;
use std::path::PathBuf;

/// Prints one `sha256sum`-style line per file. Unreadable files are reported
/// and skipped; the command fails if any file could not be hashed.
pub async fn run_checksum(paths: &[PathBuf]) -> Result<()> {
    let mut failed = 0usize;
    for path in paths {
        match checksum::sha256_path(path) {
            Ok(digest) => println!("{}  {}", digest, path.display()),
            Err(e) => {
                eprintln!("{}: {:#}", path.display(), e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{} of {} file(s) could not be hashed", failed, paths.len());
    }
    Ok(())
}
