//! Advisory inter-process locking for the cookie file.
//!
//! The lock is the existence of a sibling `<name>.lock` file, created with
//! exclusive-create semantics so that exactly one process can hold it.
//! Removing the file releases the lock. A crashed holder leaves the lock
//! file behind, in which case acquisition times out until the file is
//! removed by hand; no staleness detection is attempted.

use crate::error::Error;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// How long to keep retrying before giving up on the lock.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay between create attempts while another process holds the lock.
const RETRY_DELAY: Duration = Duration::from_millis(20);

/// An exclusive lock over a cookie file. Dropping the guard releases the
/// lock.
#[derive(Debug)]
pub(crate) struct FileLock {
    path: PathBuf,
}

impl FileLock {
    /// Acquire the lock guarding `file`, spinning until the current holder
    /// releases it or [`ACQUIRE_TIMEOUT`] elapses.
    pub fn acquire(file: &Path) -> Result<Self, Error> {
        Self::acquire_with_timeout(file, ACQUIRE_TIMEOUT)
    }

    pub fn acquire_with_timeout(file: &Path, timeout: Duration) -> Result<Self, Error> {
        let path = lock_path(file);
        let deadline = Instant::now() + timeout;

        loop {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(Error::LockContended);
                    }

                    thread::sleep(RETRY_DELAY);
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Nothing useful to do on failure; at worst the next acquisition
        // times out.
        let _ = fs::remove_file(&self.path);
    }
}

fn lock_path(file: &Path) -> PathBuf {
    let mut name = file.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    file.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_file_lives_next_to_the_cookie_file() {
        assert_eq!(
            lock_path(Path::new("/tmp/dir/cookies")),
            Path::new("/tmp/dir/cookies.lock")
        );
    }

    #[test]
    fn acquire_creates_and_drop_removes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cookies");

        let lock = FileLock::acquire(&file).unwrap();
        assert!(dir.path().join("cookies.lock").exists());

        drop(lock);
        assert!(!dir.path().join("cookies.lock").exists());
    }

    #[test]
    fn held_lock_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cookies");

        let _held = FileLock::acquire(&file).unwrap();

        assert!(matches!(
            FileLock::acquire_with_timeout(&file, Duration::from_millis(100)),
            Err(Error::LockContended)
        ));
    }

    #[test]
    fn released_lock_can_be_reacquired() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cookies");

        drop(FileLock::acquire(&file).unwrap());
        drop(FileLock::acquire(&file).unwrap());
    }
}
