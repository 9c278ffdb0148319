use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Placeholder opened before a download starts. Dropping it (or calling
/// [`DownloadTarget::discard`]) removes the partial file; [`DownloadTarget::commit`]
/// moves it to its final name.
#[derive(Debug)]
pub struct DownloadTarget {
    dir: PathBuf,
    file: NamedTempFile,
}

impl DownloadTarget {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create download directory {}", dir.display()))?;
        let file = tempfile::Builder::new()
            .prefix(".subwiz-")
            .suffix(".part")
            .tempfile_in(dir)
            .with_context(|| format!("Cannot create a file in {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            file,
        })
    }

    pub fn temp_path(&self) -> &Path {
        self.file.path()
    }

    /// Write the payload and move it to `filename` in the target directory,
    /// never replacing an existing file.
    pub fn commit(mut self, bytes: &[u8], filename: &str) -> Result<PathBuf> {
        self.file.write_all(bytes)?;
        self.file.flush()?;

        let destination = unique_destination(&self.dir, filename);
        self.file
            .persist_noclobber(&destination)
            .map_err(|e| anyhow::anyhow!("Cannot save {}: {}", destination.display(), e.error))?;
        Ok(destination)
    }

    pub fn discard(self) {
        let path = self.file.path().to_path_buf();
        if let Err(e) = self.file.close() {
            tracing::warn!("Failed to remove placeholder {}: {}", path.display(), e);
        }
    }
}

/// `dir/filename`, or `dir/stem (n).ext` for the first `n` that is free.
pub fn unique_destination(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.to_string());
    let ext = path.extension().map(|e| e.to_string_lossy().to_string());

    (1u32..)
        .map(|n| match &ext {
            Some(ext) => dir.join(format!("{stem} ({n}).{ext}")),
            None => dir.join(format!("{stem} ({n})")),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
