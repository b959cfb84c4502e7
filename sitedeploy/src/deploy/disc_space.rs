//! Free disc space checks before accepting an upload
//!
//! The probe answers "how many bytes are free on the volume holding this
//! path", or `None` when it cannot tell. [`has_enough_space`] is the only
//! place that turns an unknown answer into a decision, and it fails open:
//! a probe that cannot read the host's report never blocks a deployment.

use std::path::Path;

use async_trait::async_trait;
use sysinfo::Disks;
use tokio::process::Command;
use tracing::{debug, info, warn};

const MIB: f64 = 1024.0 * 1024.0;

/// Which probe implementation to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiscSpaceBackend {
    /// Parse `df -Ph` output
    #[default]
    Df,
    /// Query the OS through `sysinfo`
    Sysinfo,
}

impl std::str::FromStr for DiscSpaceBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "df" => Ok(DiscSpaceBackend::Df),
            "sysinfo" => Ok(DiscSpaceBackend::Sysinfo),
            _ => Err(format!("Invalid disc space probe: {}", s)),
        }
    }
}

impl DiscSpaceBackend {
    pub fn probe(&self) -> Box<dyn DiscSpaceProbe> {
        match self {
            DiscSpaceBackend::Df => Box::new(DfProbe),
            DiscSpaceBackend::Sysinfo => Box::new(SysinfoProbe),
        }
    }
}

#[async_trait]
pub trait DiscSpaceProbe: Send + Sync {
    /// Bytes available on the volume holding `path`, if known
    async fn bytes_available(&self, path: &Path) -> Option<u64>;
}

/// Whether strictly more than `expected` bytes are free at `path`.
///
/// Unknown free space counts as enough.
pub async fn has_enough_space(probe: &dyn DiscSpaceProbe, path: &Path, expected: u64) -> bool {
    match probe.bytes_available(path).await {
        Some(available) => {
            info!(
                "{} MiB available, {} MiB expected",
                available / (1024 * 1024),
                expected / (1024 * 1024)
            );
            available > expected
        }
        None => {
            warn!(
                "Could not determine free disc space at {}, allowing deployment",
                path.display()
            );
            true
        }
    }
}

/// Reads the "Avail" column of `df -Ph <path>`
#[derive(Debug, Clone, Copy, Default)]
pub struct DfProbe;

#[async_trait]
impl DiscSpaceProbe for DfProbe {
    async fn bytes_available(&self, path: &Path) -> Option<u64> {
        let output = match Command::new("df").arg("-Ph").arg(path).output().await {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to run df: {}", e);
                return None;
            }
        };

        if !output.status.success() {
            warn!(
                "df exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        parse_df_available(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extract the available bytes from `df -h` style output.
///
/// Takes the first row after the header and its fourth column, e.g. `100M`.
pub fn parse_df_available(output: &str) -> Option<u64> {
    let Some(row) = output.lines().nth(1) else {
        warn!("Unexpected df output, no data row: {:?}", output);
        return None;
    };

    let columns: Vec<&str> = row.split_whitespace().collect();
    if columns.len() <= 3 {
        warn!("Unexpected df row, too few columns: {:?}", row);
        return None;
    }

    let available = columns[3];
    let bytes = parse_human_size(available);
    if bytes.is_none() {
        warn!("Unexpected df size {:?}", available);
    }
    bytes
}

/// Parse a `df -h` size such as `100M` or `1.5G` into bytes.
///
/// Sizes below one kilobyte, including a full volume's `0`, have no unit
/// and are plain bytes.
pub fn parse_human_size(size: &str) -> Option<u64> {
    let unit = size.chars().last()?;
    if unit.is_ascii_digit() {
        return size.parse().ok();
    }

    let multiplier = match unit {
        'K' => 1.0 / 1024.0,
        'M' => 1.0,
        'G' => 1024.0,
        'T' => 1024.0 * 1024.0,
        _ => return None,
    };

    let number: f64 = size[..size.len() - unit.len_utf8()].parse().ok()?;
    if !number.is_finite() || number < 0.0 {
        return None;
    }

    Some((number * multiplier * MIB) as u64)
}

/// Uses the mounted disks reported by the OS
#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoProbe;

#[async_trait]
impl DiscSpaceProbe for SysinfoProbe {
    async fn bytes_available(&self, path: &Path) -> Option<u64> {
        let path = match tokio::fs::canonicalize(path).await {
            Ok(path) => path,
            Err(e) => {
                warn!("Cannot resolve {}: {}", path.display(), e);
                return None;
            }
        };

        tokio::task::spawn_blocking(move || {
            let disks = Disks::new_with_refreshed_list();
            let disk = disks
                .iter()
                .filter(|d| path.starts_with(d.mount_point()))
                .max_by_key(|d| d.mount_point().as_os_str().len())?;
            debug!(
                "Disc for {} is mounted at {}",
                path.display(),
                disk.mount_point().display()
            );
            Some(disk.available_space())
        })
        .await
        .ok()
        .flatten()
    }
}

/// A probe that always reports the same value
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub Option<u64>);

#[async_trait]
impl DiscSpaceProbe for FixedProbe {
    async fn bytes_available(&self, _path: &Path) -> Option<u64> {
        self.0
    }
}
