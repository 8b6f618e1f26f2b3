//! Spacing for commands the set can't take in quick succession.
//!
//! A debounced command holds an exclusive `flock` on
//! `<dir>/.<command>_lock` while it is sent and for a settle delay after,
//! so other processes driving the same set are kept out too. A held lock
//! fails the request immediately.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::Error;

pub const DEFAULT_SETTLE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct DebounceGate {
    dir: PathBuf,
    settle: HashMap<String, Duration>,
}

impl Default for DebounceGate {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl DebounceGate {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            settle: HashMap::new(),
        }
    }

    pub fn set_dir(&mut self, dir: impl Into<PathBuf>) {
        self.dir = dir.into();
    }

    pub fn register(&mut self, command: &str, settle: Duration) {
        self.settle.insert(command.to_owned(), settle);
    }

    pub fn settle(&self, command: &str) -> Option<Duration> {
        self.settle.get(command).copied()
    }

    /// `Ok(None)` for commands that aren't debounced.
    pub fn try_acquire(&self, command: &str) -> Result<Option<DebounceGuard>, Error> {
        let settle = match self.settle(command) {
            Some(settle) => settle,
            None => return Ok(None),
        };

        let path = self.dir.join(format!(".{}_lock", command));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if ret != 0 {
            let err = std::io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::EWOULDBLOCK) => Err(Error::LockContention(command.to_owned())),
                _ => Err(err.into()),
            };
        }

        debug!(command, path = %path.display(), "debounce lock acquired");
        Ok(Some(DebounceGuard { file, settle }))
    }
}

/// Releases the lock on drop.
#[derive(Debug)]
pub struct DebounceGuard {
    file: File,
    settle: Duration,
}

impl DebounceGuard {
    /// Waits out the settle delay, then releases the lock.
    pub fn settle(self) {
        std::thread::sleep(self.settle);
    }
}

impl Drop for DebounceGuard {
    fn drop(&mut self) {
        // closing the file would release it as well
        unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) };
    }
}
