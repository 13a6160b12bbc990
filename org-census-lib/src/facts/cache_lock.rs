use crate::Result;
use fs4::fs_std::FileExt;
use ohno::IntoAppError;
use std::fs::{File, OpenOptions};
use std::path::Path;

const LOG_TARGET: &str = "     cache";

/// Holds an exclusive advisory lock on a cache directory until dropped.
#[derive(Debug)]
pub struct CacheLockGuard(File);

impl Drop for CacheLockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.unlock() {
            log::warn!(target: LOG_TARGET, "Could not unlock cache: {e:#}");
        }
    }
}

/// Block until no other org-census process is using `cache_dir`.
pub async fn acquire_cache_lock(cache_dir: &Path) -> Result<CacheLockGuard> {
    let lock_path = cache_dir.join("cache.lock");

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .into_app_err_with(|| format!("opening cache lock file at '{}'", lock_path.display()))?;

    // lock_exclusive blocks the calling thread, possibly for a long time
    let file = tokio::task::spawn_blocking(move || {
        file.lock_exclusive()
            .into_app_err_with(|| format!("acquiring exclusive lock on cache at '{}'", lock_path.display()))?;
        log::debug!(target: LOG_TARGET, "Acquired cache lock at '{}'", lock_path.display());
        Ok::<_, ohno::AppError>(file)
    })
    .await
    .into_app_err("lock task panicked")??;

    Ok(CacheLockGuard(file))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lock_file_is_created() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let lock_path = temp_dir.path().join("cache.lock");
        assert!(!lock_path.exists());

        let guard = acquire_cache_lock(temp_dir.path()).await.unwrap();
        assert!(lock_path.exists());
        drop(guard);
    }

    #[tokio::test]
    async fn lock_can_be_reacquired_after_drop() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

        let guard = acquire_cache_lock(temp_dir.path()).await.unwrap();
        drop(guard);

        let _guard = acquire_cache_lock(temp_dir.path()).await.unwrap();
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let path = Path::new("org_census_missing_cache_directory_31337");
        let _ = acquire_cache_lock(path).await.unwrap_err();
    }
}
