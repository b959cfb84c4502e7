//! File operations

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::SiteError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, SiteError> {
        Ok(fs::read_to_string(&self.path).await?)
    }

    /// Write string to file
    pub async fn write_string(&self, contents: &str) -> Result<(), SiteError> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&self.path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Copy this file to `target`, returning the number of bytes copied
    pub async fn copy_to(&self, target: &File) -> Result<u64, SiteError> {
        Ok(fs::copy(&self.path, &target.path).await?)
    }

    /// Atomic write using a temporary file next to the target
    pub async fn write_atomic(&self, contents: &[u8]) -> Result<(), SiteError> {
        let mut temp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        temp_name.push(".tmp");
        let temp_path = self.path.with_file_name(temp_name);

        // Write to temp file
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        // Keep the permissions of the file being replaced
        if let Ok(meta) = fs::metadata(&self.path).await {
            fs::set_permissions(&temp_path, meta.permissions()).await?;
        }

        // Rename to target
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}
