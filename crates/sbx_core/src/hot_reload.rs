//! A file-backed resource slot that can be swapped at frame boundaries.
//!
//! The slot always holds a usable value. The initial load falls back to a
//! built-in value when the file is missing or broken; a later reload that fails
//! keeps whatever was there before and only records the error. Callers pass the
//! loader on each call so the slot stays agnostic of GPU handles and devices.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::watcher::FileWatcher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceStatus {
    /// The value came from the file.
    Loaded,
    /// The file never loaded; a built-in value is in use.
    Fallback { error: String },
    /// A reload failed; the previously loaded value is still in use.
    Stale { error: String },
}

impl ResourceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Fallback { .. } => "fallback",
            Self::Stale { .. } => "stale",
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Loaded => None,
            Self::Fallback { error } | Self::Stale { error } => Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    Unchanged,
    Reloaded,
    Failed(String),
}

pub struct HotReload<T> {
    watcher: FileWatcher,
    value: T,
    status: ResourceStatus,
    generation: u64,
}

impl<T> HotReload<T> {
    pub fn load<L, F>(path: PathBuf, loader: L, fallback: F) -> Self
    where
        L: FnOnce(&Path) -> Result<T, String>,
        F: FnOnce() -> T,
    {
        let watcher = FileWatcher::new(path);
        let (value, status) = match loader(watcher.path()) {
            Ok(value) => {
                log::info!("Loaded '{}'", watcher.path().display());
                (value, ResourceStatus::Loaded)
            }
            Err(err) => {
                log::error!(
                    "Initial load of '{}' failed, using built-in fallback: {err}",
                    watcher.path().display()
                );
                (fallback(), ResourceStatus::Fallback { error: err })
            }
        };
        Self {
            watcher,
            value,
            status,
            generation: 0,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.watcher = self.watcher.with_poll_interval(interval);
        self
    }

    pub fn path(&self) -> &Path {
        self.watcher.path()
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn status(&self) -> &ResourceStatus {
        &self.status
    }

    /// Bumped on every successful swap. Dependents cache the generation they
    /// were built against and rebuild when it moves.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Reload if the watcher saw a change since the last poll.
    pub fn poll<L>(&mut self, loader: L) -> ReloadOutcome
    where
        L: FnOnce(&Path) -> Result<T, String>,
    {
        if !self.watcher.should_reload() {
            return ReloadOutcome::Unchanged;
        }
        let result = loader(self.watcher.path());
        self.apply(result, "file watcher")
    }

    pub fn force_reload<L>(&mut self, loader: L, reason: &str) -> ReloadOutcome
    where
        L: FnOnce(&Path) -> Result<T, String>,
    {
        self.watcher.sync();
        let result = loader(self.watcher.path());
        self.apply(result, reason)
    }

    fn apply(&mut self, result: Result<T, String>, reason: &str) -> ReloadOutcome {
        match result {
            Ok(value) => {
                self.value = value;
                self.status = ResourceStatus::Loaded;
                self.generation += 1;
                log::info!("Reloaded '{}' ({reason})", self.watcher.path().display());
                ReloadOutcome::Reloaded
            }
            Err(err) => {
                log::error!(
                    "Reload of '{}' failed ({reason}), keeping previous version: {err}",
                    self.watcher.path().display()
                );
                self.status = match self.status {
                    ResourceStatus::Fallback { .. } => ResourceStatus::Fallback { error: err.clone() },
                    _ => ResourceStatus::Stale { error: err.clone() },
                };
                ReloadOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::tests::{bump_mtime, temp_file_path};
    use std::fs;

    fn parse_number(path: &Path) -> Result<i32, String> {
        let raw = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        raw.trim()
            .parse::<i32>()
            .map_err(|e| format!("Failed to parse {}: {e}", path.display()))
    }

    #[test]
    fn initial_load_uses_file_value() {
        let path = temp_file_path("hr_initial", "txt");
        fs::write(&path, "7").expect("write");
        let slot = HotReload::load(path.clone(), parse_number, || -1);
        assert_eq!(*slot.value(), 7);
        assert_eq!(*slot.status(), ResourceStatus::Loaded);
        assert_eq!(slot.generation(), 0);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_uses_fallback() {
        let path = temp_file_path("hr_missing", "txt");
        let _ = fs::remove_file(&path);
        let slot = HotReload::load(path, parse_number, || -1);
        assert_eq!(*slot.value(), -1);
        assert_eq!(slot.status().label(), "fallback");
        assert!(slot.status().error().is_some());
    }

    #[test]
    fn poll_swaps_value_on_valid_change() {
        let path = temp_file_path("hr_swap", "txt");
        fs::write(&path, "1").expect("write");
        let mut slot = HotReload::load(path.clone(), parse_number, || -1);

        assert_eq!(slot.poll(parse_number), ReloadOutcome::Unchanged);

        fs::write(&path, "2").expect("rewrite");
        bump_mtime(&path, 5);
        assert_eq!(slot.poll(parse_number), ReloadOutcome::Reloaded);
        assert_eq!(*slot.value(), 2);
        assert_eq!(slot.generation(), 1);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn failed_reload_keeps_previous_value() {
        let path = temp_file_path("hr_keep", "txt");
        fs::write(&path, "10").expect("write");
        let mut slot = HotReload::load(path.clone(), parse_number, || -1);

        fs::write(&path, "not a number").expect("rewrite");
        bump_mtime(&path, 5);
        let outcome = slot.poll(parse_number);
        assert!(matches!(outcome, ReloadOutcome::Failed(_)));
        assert_eq!(*slot.value(), 10);
        assert_eq!(slot.status().label(), "stale");
        assert_eq!(slot.generation(), 0);

        fs::write(&path, "11").expect("fix");
        bump_mtime(&path, 10);
        assert_eq!(slot.poll(parse_number), ReloadOutcome::Reloaded);
        assert_eq!(*slot.value(), 11);
        assert_eq!(*slot.status(), ResourceStatus::Loaded);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn fallback_stays_fallback_until_a_load_succeeds() {
        let path = temp_file_path("hr_fallback", "txt");
        fs::write(&path, "garbage").expect("write");
        let mut slot = HotReload::load(path.clone(), parse_number, || -1);
        assert_eq!(slot.status().label(), "fallback");

        let outcome = slot.force_reload(parse_number, "manual trigger (R)");
        assert!(matches!(outcome, ReloadOutcome::Failed(_)));
        assert_eq!(slot.status().label(), "fallback");

        fs::write(&path, "3").expect("fix");
        bump_mtime(&path, 5);
        assert_eq!(slot.poll(parse_number), ReloadOutcome::Reloaded);
        assert_eq!(*slot.value(), 3);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn force_reload_ignores_watcher_state() {
        let path = temp_file_path("hr_force", "txt");
        fs::write(&path, "4").expect("write");
        let mut slot = HotReload::load(path.clone(), parse_number, || -1);
        assert_eq!(
            slot.force_reload(parse_number, "manual trigger (R)"),
            ReloadOutcome::Reloaded
        );
        assert_eq!(slot.generation(), 1);
        assert_eq!(slot.poll(parse_number), ReloadOutcome::Unchanged);
        let _ = fs::remove_file(path);
    }
}
