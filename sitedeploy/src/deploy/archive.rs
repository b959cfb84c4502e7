//! Zip archive extraction

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use crate::errors::SiteError;

/// What an extraction wrote to disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub dirs: usize,
    pub bytes: u64,
}

/// Extract every entry of the zip in `data` below `target`, one at a time.
///
/// Blocking; call from `spawn_blocking`. Entries whose names would land
/// outside `target` abort the extraction. Entries written before a failure
/// stay on disk.
pub fn extract_zip(data: &[u8], target: &Path) -> Result<ExtractSummary, SiteError> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    let mut summary = ExtractSummary::default();

    fs::create_dir_all(target)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let relative: PathBuf = entry.enclosed_name().ok_or_else(|| {
            SiteError::ExtractionError(format!("Unsafe path in archive: {}", entry.name()))
        })?;
        let out_path = target.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            summary.dirs += 1;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = fs::File::create(&out_path)?;
        let written = io::copy(&mut entry, &mut out)?;
        debug!("Extracted {} ({} bytes)", relative.display(), written);

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode & 0o777))?;
        }

        summary.files += 1;
        summary.bytes += written;
    }

    Ok(summary)
}
