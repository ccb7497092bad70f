//! File watcher (spec §4.14): stat-based polling with debounce.
//!
//! Deliberately *not* grounded on the teacher's `notify` dependency
//! (`codegraph-ir/features/file_watcher/infrastructure/file_watcher.rs`
//! wraps the OS's native event API) — event-based watching is off the
//! table here; polling cadence is driven entirely by the host calling
//! `poll`/`poll_all` with its own clock.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::{CodegraphError, Result};

pub const DEFAULT_DEBOUNCE_MS: i64 = 300;
pub const MAX_WATCH_PATHS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

struct WatchEntry {
    path: PathBuf,
    last_mtime_ns: i128,
    last_size: u64,
    exists: bool,
    last_change_ms: i64,
    pending: bool,
    pending_kind: Option<ChangeKind>,
}

fn stat(path: &Path) -> (bool, i128, u64) {
    match fs::metadata(path) {
        Ok(meta) => {
            let mtime_ns = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_nanos() as i128)
                .unwrap_or(0);
            (true, mtime_ns, meta.len())
        }
        Err(_) => (false, 0, 0),
    }
}

/// Polling watcher over a capped set of paths, each independently
/// debounced.
pub struct FileWatcher {
    capacity: usize,
    debounce_ms: i64,
    entries: HashMap<PathBuf, WatchEntry>,
}

impl FileWatcher {
    pub fn new() -> Self {
        Self::with_capacity(MAX_WATCH_PATHS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            entries: HashMap::new(),
        }
    }

    pub fn with_debounce_ms(mut self, debounce_ms: i64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn watched_count(&self) -> usize {
        self.entries.len()
    }

    /// Idempotent on duplicate paths (silent no-op). Fails with
    /// `TooManyWatches` when adding a genuinely new path at capacity.
    pub fn watch(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        if self.entries.contains_key(&path) {
            return Ok(());
        }
        if self.entries.len() >= self.capacity {
            return Err(CodegraphError::too_many_watches(format!(
                "cannot watch more than {} paths",
                self.capacity
            )));
        }
        self.entries.insert(
            path.clone(),
            WatchEntry {
                path,
                last_mtime_ns: 0,
                last_size: 0,
                exists: false,
                last_change_ms: 0,
                pending: false,
                pending_kind: None,
            },
        );
        Ok(())
    }

    /// Calls `watch` once per path, returning the number of calls made
    /// (not the number of unique additions — duplicates still count).
    pub fn watch_many<I, P>(&mut self, paths: I) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut count = 0;
        for path in paths {
            self.watch(path)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn unwatch(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    /// Stats `path`, updates its recorded state, and emits an event only
    /// once the debounce window since the last detected change has
    /// elapsed.
    pub fn poll(&mut self, path: &Path, now_ms: i64) -> Option<ChangeEvent> {
        let debounce_ms = self.debounce_ms;
        let entry = self.entries.get_mut(path)?;
        let (cur_exists, cur_mtime_ns, cur_size) = stat(path);

        let kind = if !entry.exists && cur_exists {
            Some(ChangeKind::Created)
        } else if entry.exists && !cur_exists {
            Some(ChangeKind::Deleted)
        } else if entry.exists
            && cur_exists
            && (cur_mtime_ns != entry.last_mtime_ns || cur_size != entry.last_size)
        {
            Some(ChangeKind::Modified)
        } else {
            None
        };

        if let Some(k) = kind {
            entry.pending = true;
            entry.pending_kind = Some(k);
            entry.last_change_ms = now_ms;
        }
        entry.exists = cur_exists;
        entry.last_mtime_ns = cur_mtime_ns;
        entry.last_size = cur_size;

        if entry.pending && now_ms - entry.last_change_ms >= debounce_ms {
            entry.pending = false;
            let kind = entry.pending_kind.take().unwrap_or(ChangeKind::Modified);
            Some(ChangeEvent {
                path: entry.path.clone(),
                kind,
            })
        } else {
            None
        }
    }

    /// Polls every watched path, returning all events that cleared
    /// debounce this round.
    pub fn poll_all(&mut self, now_ms: i64) -> Vec<ChangeEvent> {
        let paths: Vec<PathBuf> = self.entries.keys().cloned().collect();
        paths
            .into_iter()
            .filter_map(|p| self.poll(&p, now_ms))
            .collect()
    }
}

impl Default for FileWatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn watch_is_idempotent() {
        let mut w = FileWatcher::new();
        w.watch("/tmp/a").unwrap();
        w.watch("/tmp/a").unwrap();
        assert_eq!(w.watched_count(), 1);
    }

    #[test]
    fn watch_many_counts_calls_not_unique_additions() {
        let mut w = FileWatcher::new();
        let count = w.watch_many(["/tmp/a", "/tmp/a", "/tmp/b"]).unwrap();
        assert_eq!(count, 3);
        assert_eq!(w.watched_count(), 2);
    }

    #[test]
    fn watching_past_capacity_fails() {
        let mut w = FileWatcher::with_capacity(1);
        w.watch("/tmp/a").unwrap();
        let err = w.watch("/tmp/b").unwrap_err();
        assert!(err.is(crate::error::ErrorKind::TooManyWatches));
    }

    #[test]
    fn duplicate_watch_at_capacity_still_succeeds() {
        let mut w = FileWatcher::with_capacity(1);
        w.watch("/tmp/a").unwrap();
        w.watch("/tmp/a").unwrap();
    }

    #[test]
    fn debounce_scenario_s7() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");

        let mut w = FileWatcher::new();
        w.watch(&path).unwrap();

        let mut f = File::create(&path).unwrap();
        f.write_all(b"hello").unwrap();
        drop(f);

        assert!(w.poll(&path, 5000).is_none());
        assert!(w.poll(&path, 5299).is_none());
        let event = w.poll(&path, 5300).unwrap();
        assert_eq!(event.kind, ChangeKind::Created);
        assert_eq!(event.path, path);
    }

    #[test]
    fn deletion_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        File::create(&path).unwrap();

        let mut w = FileWatcher::new();
        w.watch(&path).unwrap();
        w.poll(&path, 0);
        w.poll(&path, DEFAULT_DEBOUNCE_MS);

        std::fs::remove_file(&path).unwrap();
        assert!(w.poll(&path, DEFAULT_DEBOUNCE_MS + 100).is_none());
        let event = w.poll(&path, DEFAULT_DEBOUNCE_MS * 2 + 100).unwrap();
        assert_eq!(event.kind, ChangeKind::Deleted);
    }

    #[test]
    fn churn_faster_than_debounce_emits_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        let mut w = FileWatcher::new();
        w.watch(&path).unwrap();

        File::create(&path).unwrap();
        assert!(w.poll(&path, 1000).is_none());

        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"more").unwrap();
        drop(f);
        assert!(w.poll(&path, 1200).is_none());

        assert!(w.poll(&path, 1500).is_some());
    }

    #[test]
    fn polling_unwatched_path_returns_none() {
        let mut w = FileWatcher::new();
        assert!(w.poll(Path::new("/tmp/never-watched"), 0).is_none());
    }
}
