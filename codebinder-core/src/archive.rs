//! Archive handling: extraction of uploaded project archives and bundling
//! of multi-artifact sets for delivery, driving the system `zip`/`unzip`
//! tools as external processes.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{error, info};

use crate::contract::{ArchiveError, Archiver};

/// Default [`Archiver`] backed by the system `zip` and `unzip` binaries.
pub struct ZipArchiver;

#[async_trait::async_trait]
impl Archiver for ZipArchiver {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
        std::fs::create_dir_all(dest)?;
        let status = Command::new("unzip")
            .arg("-o")
            .arg("-q")
            .arg(archive)
            .arg("-d")
            .arg(dest)
            .status()?;
        if !status.success() {
            error!(archive = %archive.display(), %status, "unzip exited with non-zero code");
            return Err(format!("unzip exited with status {status}").into());
        }
        info!(archive = %archive.display(), dest = %dest.display(), "Extracted archive");
        Ok(())
    }

    async fn bundle(&self, files: &[PathBuf], dest: &Path) -> Result<u64, ArchiveError> {
        if files.is_empty() {
            return Err("nothing to bundle".into());
        }
        // -j stores base names only, matching the flat delivery archive.
        let status = Command::new("zip")
            .arg("-j")
            .arg("-q")
            .arg(dest)
            .args(files)
            .status()?;
        if !status.success() {
            error!(dest = %dest.display(), %status, "zip exited with non-zero code");
            return Err(format!("zip exited with status {status}").into());
        }
        let bytes = std::fs::metadata(dest)?.len();
        info!(dest = %dest.display(), members = files.len(), bytes, "Bundled files into archive");
        Ok(bytes)
    }

    async fn bundle_dir(&self, dir: &Path, dest: &Path) -> Result<u64, ArchiveError> {
        let status = Command::new("zip")
            .current_dir(dir)
            .arg("-r")
            .arg("-q")
            .arg(dest)
            .arg(".")
            .status()?;
        if !status.success() {
            error!(dir = %dir.display(), %status, "zip exited with non-zero code");
            return Err(format!("zip exited with status {status}").into());
        }
        let bytes = std::fs::metadata(dest)?.len();
        info!(dir = %dir.display(), dest = %dest.display(), bytes, "Bundled directory into archive");
        Ok(bytes)
    }
}
