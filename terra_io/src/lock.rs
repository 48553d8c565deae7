//! File-based mutual exclusion.
//!
//! A process owns `path` while the marker `<path>.lock` exists and was
//! created by it. Creation uses `create_new`, which is atomic on local file
//! systems. On conflict the caller sleeps a random fraction of the retry
//! interval and tries again.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::error::{Result, TerraIoError};

/// Lock on a file path.
#[derive(Debug, Clone)]
pub struct PathLock {
    lock_path: PathBuf,
    interval: Duration,
    max_retries: Option<usize>,
}

impl PathLock {
    /// Lock `path` with a one second retry interval and unbounded retries.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let mut lock_path: OsString = path.as_ref().as_os_str().to_owned();
        lock_path.push(".lock");
        Self {
            lock_path: PathBuf::from(lock_path),
            interval: Duration::from_secs(1),
            max_retries: None,
        }
    }

    /// Upper bound of the randomized sleep between attempts.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Retry at most `retries` times after the first attempt. `None` retries forever.
    pub fn with_max_retries(mut self, retries: Option<usize>) -> Self {
        self.max_retries = retries;
        self
    }

    /// Path of the marker file.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Acquire the lock, blocking through retries.
    ///
    /// The returned guard removes the marker when dropped.
    pub fn acquire(&self) -> Result<PathLockGuard> {
        let mut rng = rand::thread_rng();
        let mut attempts = 0usize;
        loop {
            attempts += 1;
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.lock_path)
            {
                Ok(_) => {
                    return Ok(PathLockGuard {
                        lock_path: self.lock_path.clone(),
                        released: false,
                    })
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if let Some(max) = self.max_retries {
                        if attempts > max {
                            return Err(TerraIoError::LockAcquisition {
                                path: self.lock_path.clone(),
                                attempts,
                            });
                        }
                    }
                    let pause = self.interval.mul_f64(rng.gen::<f64>());
                    log::trace!(
                        "{} is held, retrying in {:?}",
                        self.lock_path.display(),
                        pause
                    );
                    thread::sleep(pause);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Held lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct PathLockGuard {
    lock_path: PathBuf,
    released: bool,
}

impl PathLockGuard {
    /// Release explicitly, reporting failure to delete the marker.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        std::fs::remove_file(&self.lock_path)?;
        Ok(())
    }
}

impl Drop for PathLockGuard {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = std::fs::remove_file(&self.lock_path) {
                log::warn!("failed to remove {}: {}", self.lock_path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_path_suffix() {
        let lock = PathLock::new("/tmp/metrics.csv");
        assert_eq!(lock.lock_path(), Path::new("/tmp/metrics.csv.lock"));
    }

    #[test]
    fn test_acquire_release() {
        let dir = tempfile::tempdir().unwrap();
        let lock = PathLock::new(dir.path().join("a.csv"));

        let guard = lock.acquire().unwrap();
        assert!(lock.lock_path().exists());
        guard.release().unwrap();
        assert!(!lock.lock_path().exists());

        {
            let _guard = lock.acquire().unwrap();
            assert!(lock.lock_path().exists());
        }
        assert!(!lock.lock_path().exists());
    }

    #[test]
    fn test_contention_exhausts_retries() {
        let dir = tempfile::tempdir().unwrap();
        let lock = PathLock::new(dir.path().join("a.csv"))
            .with_interval(Duration::from_millis(1))
            .with_max_retries(Some(3));

        let _held = lock.acquire().unwrap();
        match lock.acquire() {
            Err(TerraIoError::LockAcquisition { attempts, .. }) => assert_eq!(attempts, 4),
            other => panic!("expected lock acquisition error, got {:?}", other),
        }
        assert!(lock.lock_path().exists());
    }

    #[test]
    fn test_zero_retries_single_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let lock = PathLock::new(dir.path().join("b.csv")).with_max_retries(Some(0));
        let _held = lock.acquire().unwrap();
        assert!(matches!(
            lock.acquire(),
            Err(TerraIoError::LockAcquisition { attempts: 1, .. })
        ));
    }
}
