use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use engine_logging::engine_info;
use examscan_core::Artifact;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::filename::artifact_filename;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("download directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), DeliveryError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| DeliveryError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(DeliveryError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| DeliveryError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write bytes to `{dir}/{filename}` by writing a temp file then renaming.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, DeliveryError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        // The temp file is removed on drop if anything below fails.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| DeliveryError::Io(e.error))?;
        Ok(target)
    }
}

/// Hands finished artifacts to the user by placing them in the download
/// directory. Existing files with the same name are replaced.
pub struct ArtifactWriter {
    files: AtomicFileWriter,
}

impl ArtifactWriter {
    pub fn new(download_dir: PathBuf) -> Self {
        Self {
            files: AtomicFileWriter::new(download_dir),
        }
    }

    pub fn download_dir(&self) -> &Path {
        self.files.dir()
    }

    pub fn deliver(&self, artifact: &Artifact) -> Result<PathBuf, DeliveryError> {
        let filename = artifact_filename(&artifact.filename, artifact.kind.default_filename());
        let path = self.files.write(&filename, &artifact.bytes)?;
        engine_info!(
            "delivered {} ({}, {} bytes) to {}",
            artifact.kind,
            artifact.mime_hint(),
            artifact.bytes.len(),
            path.display()
        );
        Ok(path)
    }
}
