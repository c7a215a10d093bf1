//! Bootstrap of bundled PCM assets into the data directory.

use playout_core::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Copy `bundle` into `data_dir` unless an identical copy is already there.
///
/// Returns the path of the copy. A stale copy is replaced through a
/// temporary file so readers never see a half-written asset.
pub fn materialize_asset(bundle: &Path, data_dir: &Path) -> Result<PathBuf> {
    let file_name = bundle.file_name().ok_or_else(|| {
        Error::InvalidConfig(format!("Asset path has no file name: {}", bundle.display()))
    })?;
    fs::create_dir_all(data_dir)?;
    let target = data_dir.join(file_name);

    let digest = file_digest(bundle)?;
    if target.is_file() && file_digest(&target)? == digest {
        debug!("Asset {} already up to date", target.display());
        return Ok(target);
    }

    let mut staging = target.clone().into_os_string();
    staging.push(".part");
    let staging = PathBuf::from(staging);

    fs::copy(bundle, &staging)?;
    if let Err(e) = fs::rename(&staging, &target) {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }
    info!("Copied asset to {} (sha256 {digest})", target.display());
    Ok(target)
}

fn file_digest(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::time::{Duration, SystemTime};

    fn bundle(dir: &Path, bytes: &[u8]) -> PathBuf {
        let path = dir.join("haidao.pcm");
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_first_run_copies() {
        let bundle_dir = tempfile::tempdir().unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        let source = bundle(bundle_dir.path(), &[1, 2, 3, 4]);

        let copy = materialize_asset(&source, &data_dir.path().join("assets")).unwrap();
        assert_eq!(copy.file_name().unwrap(), "haidao.pcm");
        assert_eq!(fs::read(&copy).unwrap(), vec![1, 2, 3, 4]);
        assert!(!copy.with_file_name("haidao.pcm.part").exists());
    }

    #[test]
    fn test_identical_copy_is_reused() {
        let bundle_dir = tempfile::tempdir().unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        let source = bundle(bundle_dir.path(), &[9; 64]);

        let copy = materialize_asset(&source, data_dir.path()).unwrap();
        let old = SystemTime::now() - Duration::from_secs(3600);
        File::options()
            .write(true)
            .open(&copy)
            .unwrap()
            .set_modified(old)
            .unwrap();

        materialize_asset(&source, data_dir.path()).unwrap();
        assert_eq!(fs::metadata(&copy).unwrap().modified().unwrap(), old);
    }

    #[test]
    fn test_stale_copy_is_replaced() {
        let bundle_dir = tempfile::tempdir().unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        fs::write(data_dir.path().join("haidao.pcm"), b"stale").unwrap();
        let source = bundle(bundle_dir.path(), b"fresh pcm");

        let copy = materialize_asset(&source, data_dir.path()).unwrap();
        assert_eq!(fs::read(copy).unwrap(), b"fresh pcm");
    }

    #[test]
    fn test_missing_bundle_is_an_error() {
        let data_dir = tempfile::tempdir().unwrap();
        let result = materialize_asset(Path::new("/nonexistent/haidao.pcm"), data_dir.path());
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
