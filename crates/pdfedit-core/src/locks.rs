//! Per-session mutual exclusion
//!
//! Two edits of the same session must not interleave their
//! load/mutate/persist cycles, or one of them is silently lost. Edits of
//! different sessions share nothing and run in parallel.

use crate::store::SessionId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct SessionLocks {
    table: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock of session `id`
    pub fn with<T>(&self, id: &SessionId, f: impl FnOnce() -> T) -> T {
        let release = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            Release {
                locks: self,
                id,
                entry: Arc::clone(table.entry(id.clone()).or_default()),
            }
        };

        // Poisoning carries no meaning for a unit value
        let _guard = release.entry.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of sessions with a live lock entry
    pub fn active(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Drops the table entry of a session once its last user is done, also
/// when that user panicked
struct Release<'a> {
    locks: &'a SessionLocks,
    id: &'a SessionId,
    entry: Arc<Mutex<()>>,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        let mut table = self
            .locks
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Only the table and this call still reference the entry
        if Arc::strong_count(&self.entry) == 2 {
            table.remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_same_session_is_serialized() {
        let locks = Arc::new(SessionLocks::new());
        let id = SessionId::generate();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let id = id.clone();
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    locks.with(&id, || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(5));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active(), 0);
    }

    #[test]
    fn test_different_sessions_do_not_block_each_other() {
        let locks = SessionLocks::new();
        let a = SessionId::generate();
        let b = SessionId::generate();

        let value = locks.with(&a, || locks.with(&b, || 42));
        assert_eq!(value, 42);
        assert_eq!(locks.active(), 0);
    }

    #[test]
    fn test_panicking_holder_releases_entry() {
        let locks = SessionLocks::new();
        let id = SessionId::generate();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            locks.with(&id, || panic!("edit failed"));
        }));
        assert!(result.is_err());
        assert_eq!(locks.active(), 0);

        assert_eq!(locks.with(&id, || 7), 7);
        assert_eq!(locks.active(), 0);
    }
}
