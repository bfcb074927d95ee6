use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};

use crate::domain::ports::store::StoreError;

const LOCK_FILE: &str = "run.lock";

/// Exclusive lock on a state directory, held for the duration of a run.
///
/// Exclusion comes from a non-blocking `flock(2)` on `run.lock`; the kernel
/// releases it when the owner exits, however it exits. The file stays in
/// place and only records the last owner's pid for diagnostics.
pub struct RunLock {
    path: PathBuf,
    _file: Flock<File>,
}

impl RunLock {
    /// Acquire the lock in `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockHeld` if another run holds the lock,
    /// `StoreError::WriteFailed` if the lock file cannot be opened or locked.
    pub fn acquire(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| StoreError::WriteFailed(format!("{}: {e}", dir.display())))?;
        let path = dir.join(LOCK_FILE);

        // Never truncate on open: the holder's pid must survive a failed attempt.
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| lock_failed(&path, e))?;

        let mut file = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(file) => file,
            Err((_, errno)) if errno == Errno::EWOULDBLOCK => {
                let owner = std::fs::read_to_string(&path).unwrap_or_default();
                let owner = owner.trim();
                return Err(StoreError::LockHeld(if owner.is_empty() {
                    path.display().to_string()
                } else {
                    format!("{} (pid {owner})", path.display())
                }));
            }
            Err((_, errno)) => return Err(lock_failed(&path, errno)),
        };

        file.set_len(0).map_err(|e| lock_failed(&path, e))?;
        writeln!(file, "{}", std::process::id()).map_err(|e| lock_failed(&path, e))?;
        tracing::debug!("Acquired {}", path.display());

        Ok(Self { path, _file: file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for RunLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLock").field("path", &self.path).finish()
    }
}

fn lock_failed(path: &Path, e: impl std::fmt::Display) -> StoreError {
    StoreError::WriteFailed(format!("{}: {e}", path.display()))
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    use super::*;

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let lock = RunLock::acquire(dir.path()).expect("first acquire");
        let err = RunLock::acquire(dir.path()).expect_err("should be held");
        match err {
            StoreError::LockHeld(owner) => {
                assert!(owner.contains(&std::process::id().to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
        drop(lock);
        RunLock::acquire(dir.path()).expect("acquire after release");
    }

    #[test]
    fn failed_attempt_keeps_owner_pid() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let lock = RunLock::acquire(dir.path()).expect("first acquire");
        let _ = RunLock::acquire(dir.path());
        let owner = std::fs::read_to_string(lock.path()).expect("read lock");
        assert_eq!(owner.trim(), std::process::id().to_string());
    }

    #[test]
    fn leftover_file_without_holder_is_reused() {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join(LOCK_FILE), "4194300\n").expect("write old lock");
        let lock = RunLock::acquire(dir.path()).expect("acquire over leftover file");
        let owner = std::fs::read_to_string(lock.path()).expect("read lock");
        assert_eq!(owner.trim(), std::process::id().to_string());
    }

    #[test]
    fn empty_file_does_not_bypass_holder() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let _lock = RunLock::acquire(dir.path()).expect("first acquire");
        std::fs::write(dir.path().join(LOCK_FILE), "").expect("clear pid");
        let err = RunLock::acquire(dir.path()).expect_err("should be held");
        assert!(matches!(err, StoreError::LockHeld(_)));
    }

    #[test]
    fn concurrent_acquires_admit_one_holder() {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join(LOCK_FILE), "not a pid").expect("write old lock");

        for _ in 0..50 {
            let threads = 8;
            let start = Arc::new(Barrier::new(threads));
            let done = Arc::new(Barrier::new(threads));
            let holders = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let dir = dir.path().to_path_buf();
                    let (start, done, holders) =
                        (Arc::clone(&start), Arc::clone(&done), Arc::clone(&holders));
                    std::thread::spawn(move || {
                        start.wait();
                        let lock = RunLock::acquire(&dir);
                        if lock.is_ok() {
                            holders.fetch_add(1, Ordering::SeqCst);
                        }
                        // Every winner keeps its lock until all attempts are made.
                        done.wait();
                        drop(lock);
                    })
                })
                .collect();
            for handle in handles {
                handle.join().expect("join");
            }
            assert_eq!(holders.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn creates_missing_state_dir() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let nested = dir.path().join("a/b");
        let _lock = RunLock::acquire(&nested).expect("acquire");
        assert!(nested.join(LOCK_FILE).exists());
    }
}
