//! Exclusive lock on the source directory.
//!
//! The lock is a file created with `O_EXCL` semantics inside the directory.
//! It carries the holder's pid for operators and is removed on release or
//! drop. A stale lockfile left by a crashed process must be removed by hand.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::batch::BatchError;

pub const LOCK_FILE_NAME: &str = ".pricecat.lock";

#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
    released: bool,
}

impl DirLock {
    /// Try once to lock `dir`. `Ok(None)` when another holder has it.
    ///
    /// # Errors
    ///
    /// Returns I/O errors other than `AlreadyExists`.
    pub fn try_lock(dir: &Path) -> io::Result<Option<Self>> {
        let path = dir.join(LOCK_FILE_NAME);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                Ok(Some(Self {
                    path,
                    released: false,
                }))
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// # Errors
    ///
    /// Returns the I/O error if the lockfile cannot be removed.
    pub fn unlock(mut self) -> io::Result<()> {
        self.released = true;
        std::fs::remove_file(&self.path)
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Acquire the lock on `dir`, retrying up to `attempts` times with a fixed
/// pause in between.
///
/// # Errors
///
/// [`BatchError::Locked`] when every attempt found the lock held,
/// [`BatchError::Cancelled`] when `cancel` fires while waiting, or
/// [`BatchError::Io`] if the lockfile cannot be created.
pub async fn acquire_with_retry(
    dir: &Path,
    attempts: u32,
    backoff: Duration,
    cancel: &CancellationToken,
) -> Result<DirLock, BatchError> {
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        let lock = DirLock::try_lock(dir).map_err(|source| BatchError::Io {
            dir: dir.to_path_buf(),
            source,
        })?;
        if let Some(lock) = lock {
            tracing::debug!(dir = %dir.display(), attempt, "acquired source lock");
            return Ok(lock);
        }

        tracing::warn!(
            dir = %dir.display(),
            attempt,
            max_attempts = attempts,
            "source directory locked, waiting"
        );
        if attempt == attempts {
            break;
        }
        tokio::select! {
            () = cancel.cancelled() => return Err(BatchError::Cancelled),
            () = tokio::time::sleep(backoff) => {}
        }
    }

    Err(BatchError::Locked {
        dir: dir.to_path_buf(),
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lock_is_refused_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let first = DirLock::try_lock(dir.path()).unwrap().unwrap();
        assert!(DirLock::try_lock(dir.path()).unwrap().is_none());

        first.unlock().unwrap();
        assert!(DirLock::try_lock(dir.path()).unwrap().is_some());
    }

    #[test]
    fn drop_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        {
            let lock = DirLock::try_lock(dir.path()).unwrap().unwrap();
            assert!(lock.path().exists());
        }
        assert!(!dir.path().join(LOCK_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let _held = DirLock::try_lock(dir.path()).unwrap().unwrap();

        let err = acquire_with_retry(
            dir.path(),
            3,
            Duration::from_millis(1),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BatchError::Locked { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn cancellation_interrupts_backoff() {
        let dir = tempfile::tempdir().unwrap();
        let _held = DirLock::try_lock(dir.path()).unwrap().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = acquire_with_retry(dir.path(), 5, Duration::from_secs(60), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Cancelled));
    }

    #[tokio::test]
    async fn acquires_once_holder_releases() {
        let dir = tempfile::tempdir().unwrap();
        let held = DirLock::try_lock(dir.path()).unwrap().unwrap();
        let path = dir.path().to_path_buf();

        let waiter = tokio::spawn(async move {
            acquire_with_retry(&path, 50, Duration::from_millis(10), &CancellationToken::new())
                .await
                .map(|lock| lock.path().to_path_buf())
        });
        tokio::time::sleep(Duration::from_millis(25)).await;
        held.unlock().unwrap();

        let acquired = waiter.await.unwrap().unwrap();
        assert!(acquired.ends_with(LOCK_FILE_NAME));
    }
}
