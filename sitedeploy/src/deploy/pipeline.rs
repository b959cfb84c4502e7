//! Output directory replacement
//!
//! A deployment resets the served directory, drops the placeholder page in,
//! waits for the upload and extracts it. There is no rollback: a failed
//! extraction leaves whatever was written, at least the placeholder.

use std::future::Future;

use axum::body::Bytes;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::deploy::archive::{extract_zip, ExtractSummary};
use crate::errors::SiteError;
use crate::storage::layout::SiteLayout;

pub struct Deployer {
    layout: SiteLayout,
    lock: Mutex<()>,
}

impl Deployer {
    pub fn new(layout: SiteLayout) -> Self {
        Self {
            layout,
            lock: Mutex::new(()),
        }
    }

    pub fn layout(&self) -> &SiteLayout {
        &self.layout
    }

    /// Replace the output directory with the archive produced by `upload`.
    ///
    /// Concurrent deployments run one after another.
    pub async fn deploy<F>(&self, upload: F) -> Result<ExtractSummary, SiteError>
    where
        F: Future<Output = Result<Bytes, SiteError>>,
    {
        let _lock = self.lock.lock().await;
        let public_dir = self.layout.public_dir();

        public_dir.delete().await.map_err(|e| {
            SiteError::ExtractionError(format!("Failed to clear output directory: {}", e))
        })?;
        self.copy_placeholder().await;

        let data = upload.await?;
        info!("Received archive of {} bytes", data.len());

        let target = public_dir.path().to_path_buf();
        let summary = tokio::task::spawn_blocking(move || extract_zip(&data, &target))
            .await?
            .inspect_err(|e| error!("Error extracting archive: {}", e))?;

        info!(
            "Extracted {} files ({} bytes) into {}",
            summary.files,
            summary.bytes,
            public_dir.path().display()
        );
        Ok(summary)
    }

    /// Best effort; a missing or unreadable placeholder never fails a deployment
    async fn copy_placeholder(&self) {
        let placeholder = self.layout.placeholder_file();
        if !placeholder.exists().await {
            return;
        }

        let public_dir = self.layout.public_dir();
        let result = async {
            public_dir.create().await?;
            placeholder.copy_to(&public_dir.file("index.html")).await
        }
        .await;

        if let Err(e) = result {
            warn!(
                "Failed to copy placeholder {}: {}",
                placeholder.path().display(),
                e
            );
        }
    }
}
