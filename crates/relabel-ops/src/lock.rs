//! Per-path locking around check-then-act sequences.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;

/// A table of mutexes keyed by path.
///
/// Renames hold the locks of both their old and new path while they check
/// for collisions and mutate, so two renames racing for the same target are
/// serialized. Entries are dropped once no caller holds them.
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock of every path in `paths`.
    ///
    /// Locks are taken in sorted order, so callers locking overlapping sets
    /// cannot deadlock. Duplicate paths are locked once.
    ///
    /// The entries are released even if `f` panics.
    pub fn with_locked<R>(&self, paths: &[&str], f: impl FnOnce() -> R) -> R {
        let mut keys: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
        keys.sort_unstable();
        keys.dedup();

        let handles = keys.iter().map(|k| self.handle(k)).collect();
        let held = Held {
            locks: self,
            keys,
            handles,
        };

        // Guards are dropped before `held`, which then releases the entries.
        let _guards: Vec<MutexGuard<'_, ()>> = held
            .handles
            .iter()
            .map(|h| h.lock().unwrap_or_else(PoisonError::into_inner))
            .collect();
        f()
    }

    /// Number of paths currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn handle(&self, path: &str) -> Arc<Mutex<()>> {
        self.locks.entry(path.to_string()).or_default().clone()
    }
}

/// Lock handles taken by one caller, returned to the table on drop.
struct Held<'a> {
    locks: &'a PathLocks,
    keys: Vec<String>,
    handles: Vec<Arc<Mutex<()>>>,
}

impl Drop for Held<'_> {
    fn drop(&mut self) {
        self.handles.clear();
        for key in &self.keys {
            self.locks
                .locks
                .remove_if(key.as_str(), |_, handle| Arc::strong_count(handle) == 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_entries_released() {
        let locks = PathLocks::new();
        let value = locks.with_locked(&["/b", "/a", "/a"], || {
            assert_eq!(locks.len(), 2);
            42
        });
        assert_eq!(value, 42);
        assert!(locks.is_empty());
    }

    #[test]
    fn test_same_path_is_serialized() {
        let locks = Arc::new(PathLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let locks = locks.clone();
                let inside = inside.clone();
                let max_inside = max_inside.clone();
                thread::spawn(move || {
                    // Alternate order to exercise sorted acquisition.
                    let paths = if i % 2 == 0 { ["/x", "/target"] } else { ["/target", "/y"] };
                    locks.with_locked(&paths, || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[test]
    fn test_entries_released_after_panic() {
        let locks = PathLocks::new();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            locks.with_locked::<()>(&["/a", "/b"], || panic!("rename blew up"));
        }));
        assert!(result.is_err());
        assert!(locks.is_empty());

        // The poisoned mutex is gone, so the paths lock normally again.
        assert_eq!(locks.with_locked(&["/a"], || 7), 7);
    }
}
