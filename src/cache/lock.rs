//! Poisoned-lock recovery.
//!
//! Cached snapshots are recomputed on the next miss and the fallback
//! counters are best-effort, so a lock poisoned by a panicking holder is
//! safe to claim and keep using.

use std::sync::LockResult;

use tracing::warn;

/// Unwrap a `lock()`/`read()`/`write()` result, claiming the inner data
/// even when the lock is poisoned.
pub(crate) fn recover_poisoned<G>(result: LockResult<G>, op: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(op, "recovered data from a poisoned lock");
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex, RwLock};

    use super::*;

    #[test]
    fn healthy_locks_pass_through() {
        let lock = RwLock::new(1usize);
        *recover_poisoned(lock.write(), "test.write") = 2;
        assert_eq!(*recover_poisoned(lock.read(), "test.read"), 2);
    }

    #[test]
    fn poisoned_mutex_yields_its_data() {
        let lock = Arc::new(Mutex::new(5usize));
        let holder = Arc::clone(&lock);
        std::thread::spawn(move || {
            let _guard = holder.lock().unwrap();
            panic!("holder panics while holding the lock");
        })
        .join()
        .unwrap_err();

        assert!(lock.is_poisoned());
        assert_eq!(*recover_poisoned(lock.lock(), "test.lock"), 5);
    }

    #[test]
    fn poisoned_rwlock_stays_usable() {
        let lock = Arc::new(RwLock::new(vec![1, 2, 3]));
        let holder = Arc::clone(&lock);
        std::thread::spawn(move || {
            let _guard = holder.write().unwrap();
            panic!("holder panics while holding the lock");
        })
        .join()
        .unwrap_err();

        recover_poisoned(lock.write(), "test.write").push(4);
        assert_eq!(recover_poisoned(lock.read(), "test.read").len(), 4);
    }
}
