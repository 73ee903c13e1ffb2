//! Mtime-polling file watcher.
//!
//! A change is reported when the file's modification time moves forward, or
//! when a previously missing file appears. Editors frequently rewrite a file
//! without changing it (save-all, format-on-save with nothing to do), so on
//! every mtime change the content is hashed and compared to the last content
//! this watcher saw; identical content is swallowed.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

pub type ContentDigest = [u8; 32];

pub struct FileWatcher {
    path: PathBuf,
    last_seen_modified: Option<SystemTime>,
    last_seen_digest: Option<ContentDigest>,
    poll_interval: Duration,
    last_poll: Option<Instant>,
}

impl FileWatcher {
    pub fn new(path: PathBuf) -> Self {
        let mut watcher = Self {
            path,
            last_seen_modified: None,
            last_seen_digest: None,
            poll_interval: Duration::ZERO,
            last_poll: None,
        };
        watcher.sync();
        watcher
    }

    /// Skip polls that come sooner than `interval` after the previous one.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-baseline to the file's current state. Call after loading the file
    /// outside of `should_reload` (initial load, manual reload).
    pub fn sync(&mut self) {
        self.last_seen_modified = modified_time(&self.path);
        self.last_seen_digest = fs::read(&self.path).ok().map(|bytes| digest(&bytes));
    }

    pub fn should_reload(&mut self) -> bool {
        if !self.poll_interval.is_zero() {
            let now = Instant::now();
            if let Some(last) = self.last_poll {
                if now.duration_since(last) < self.poll_interval {
                    return false;
                }
            }
            self.last_poll = Some(now);
        }

        let current = modified_time(&self.path);
        let mtime_changed = match (self.last_seen_modified, current) {
            (Some(old), Some(now)) => now > old,
            (None, Some(_)) => true,
            _ => false,
        };
        if !mtime_changed {
            return false;
        }

        // A read failure usually means the writer still holds the file; leave
        // the mtime baseline alone so the next poll tries again.
        let Ok(bytes) = fs::read(&self.path) else {
            return false;
        };
        self.last_seen_modified = current;

        let new_digest = digest(&bytes);
        if self.last_seen_digest == Some(new_digest) {
            log::debug!(
                "'{}' touched without content change, skipping reload",
                self.path.display()
            );
            return false;
        }
        self.last_seen_digest = Some(new_digest);
        true
    }
}

pub fn digest(bytes: &[u8]) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}
