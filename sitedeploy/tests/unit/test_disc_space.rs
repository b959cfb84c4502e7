use std::path::Path;

use async_trait::async_trait;

use sitedeploy::deploy::disc_space::{
    has_enough_space, parse_df_available, DfProbe, DiscSpaceBackend, DiscSpaceProbe, SysinfoProbe,
};

const MIB: u64 = 1024 * 1024;

/// Reports space only for one directory
struct PerPathProbe {
    path: &'static str,
    bytes: u64,
}

#[async_trait]
impl DiscSpaceProbe for PerPathProbe {
    async fn bytes_available(&self, path: &Path) -> Option<u64> {
        (path == Path::new(self.path)).then_some(self.bytes)
    }
}

#[tokio::test]
async fn test_custom_probe() {
    let probe = PerPathProbe {
        path: "/srv/site",
        bytes: 10 * MIB,
    };

    assert!(has_enough_space(&probe, Path::new("/srv/site"), 5 * MIB).await);
    assert!(!has_enough_space(&probe, Path::new("/srv/site"), 10 * MIB).await);
    // Unknown space never blocks a deployment
    assert!(has_enough_space(&probe, Path::new("/elsewhere"), u64::MAX).await);
}

#[tokio::test]
async fn test_probes_on_missing_path() {
    let missing = Path::new("/definitely/not/a/real/site/root");

    assert_eq!(DfProbe.bytes_available(missing).await, None);
    assert_eq!(SysinfoProbe.bytes_available(missing).await, None);
    assert!(has_enough_space(&DfProbe, missing, u64::MAX).await);
}

#[tokio::test]
async fn test_configured_backend_allows_small_upload() {
    let tmp = tempfile::tempdir().unwrap();

    for backend in [DiscSpaceBackend::Df, DiscSpaceBackend::Sysinfo] {
        let probe = backend.probe();
        assert!(has_enough_space(probe.as_ref(), tmp.path(), 0).await);
    }
}

#[test]
fn test_df_output_formats() {
    let gnu = "\
Filesystem      Size  Used Avail Use% Mounted on
overlay          59G   41G   16G  73% /
";
    assert_eq!(parse_df_available(gnu), Some(16 * 1024 * MIB));

    let busybox = "\
Filesystem                Size      Used Available Use% Mounted on
/dev/sda1               975.9M    520.0M    388.7M  57% /
";
    assert_eq!(
        parse_df_available(busybox),
        Some((388.7 * MIB as f64) as u64)
    );

    assert_eq!(parse_df_available("df: /nope: No such file or directory\n"), None);
}
