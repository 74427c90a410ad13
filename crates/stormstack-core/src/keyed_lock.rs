//! Per-key critical sections for components that keep their data in
//! `StateStore` but need the read-check-write spanning a get and a put to
//! be atomic per record (spec.md §5: "C1's in-memory index is protected by
//! a read/write lock ... per-record"; "C2 ... single critical section").
//!
//! Holds only the lock per key, not the record itself — the record still
//! lives in `StateStore` — so operations on different keys proceed fully
//! in parallel and only same-key operations serialise.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` as a critical section for `key`: concurrent callers for the
    /// same key block on each other, callers for different keys don't.
    pub fn with_lock<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let record_lock = {
            let mut locks = self.locks.lock().unwrap();
            locks.entry(key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        let _guard = record_lock.lock().unwrap();
        f()
    }
}
