//! MatchRegistry (C2) — authoritative match-id → {node, status, roster} map.
//!
//! Each mutating operation is a per-`match_id` critical section via
//! `KeyedLocks`: the get-then-put span against `StateStore` is not itself
//! atomic, so the lock is what makes `increment_players`' limit-check-and-update
//! a single critical section per spec.md §5.

use std::sync::Arc;

use stormstack_core::ids::{MatchId, NodeId};
use stormstack_core::time::now_secs;
use stormstack_core::KeyedLocks;
use stormstack_state::{MatchRegistryEntry, MatchStatus, StateStore};
use tracing::{debug, info, warn};

use crate::error::{MatchError, MatchResult};

#[derive(Clone)]
pub struct MatchRegistry {
    state: StateStore,
    locks: Arc<KeyedLocks>,
    finished_retention_secs: u64,
}

impl MatchRegistry {
    pub fn new(state: StateStore, finished_retention_secs: u64) -> Self {
        Self {
            state,
            locks: Arc::new(KeyedLocks::new()),
            finished_retention_secs,
        }
    }

    pub fn create(&self, entry: MatchRegistryEntry) -> MatchResult<MatchRegistryEntry> {
        let match_id = entry.match_id.clone();
        self.locks.with_lock(&match_id, || {
            if self.state.get_match(&entry.match_id)?.is_some() {
                return Err(MatchError::AlreadyExists(entry.match_id));
            }
            self.state.put_match(&entry)?;
            info!(match_id = %entry.match_id, node_id = %entry.node_id, "match created");
            Ok(entry)
        })
    }

    pub fn update_status(&self, match_id: &str, status: MatchStatus) -> MatchResult<MatchRegistryEntry> {
        self.locks.with_lock(match_id, || {
            let mut entry = self.get(match_id)?;
            entry.status = status;
            self.state.put_match(&entry)?;
            debug!(%match_id, ?status, "match status updated");
            Ok(entry)
        })
    }

    /// Fails `MatchFull` if `player_limit > 0` and already at the limit.
    /// Transitions RUNNING → FULL when the increment reaches the limit.
    pub fn increment_players(&self, match_id: &str) -> MatchResult<MatchRegistryEntry> {
        self.locks.with_lock(match_id, || {
            let mut entry = self.get(match_id)?;
            if entry.is_full() {
                return Err(MatchError::Full(match_id.to_string()));
            }
            entry.player_count += 1;
            if entry.is_full() && entry.status == MatchStatus::Running {
                entry.status = MatchStatus::Full;
            }
            self.state.put_match(&entry)?;
            Ok(entry)
        })
    }

    pub fn decrement_players(&self, match_id: &str) -> MatchResult<MatchRegistryEntry> {
        self.locks.with_lock(match_id, || {
            let mut entry = self.get(match_id)?;
            entry.player_count = entry.player_count.saturating_sub(1);
            if entry.status == MatchStatus::Full && !entry.is_full() {
                entry.status = MatchStatus::Running;
            }
            self.state.put_match(&entry)?;
            Ok(entry)
        })
    }

    pub fn delete(&self, match_id: &str) -> MatchResult<()> {
        self.locks.with_lock(match_id, || {
            if !self.state.delete_match(match_id)? {
                return Err(MatchError::NotFound(match_id.to_string()));
            }
            info!(%match_id, "match deleted");
            Ok(())
        })
    }

    pub fn find(&self, match_id: &str) -> MatchResult<Option<MatchRegistryEntry>> {
        Ok(self.state.get_match(match_id)?)
    }

    pub fn find_by_node(&self, node_id: &str) -> MatchResult<Vec<MatchRegistryEntry>> {
        Ok(self
            .state
            .list_matches()?
            .into_iter()
            .filter(|e| e.node_id == node_id)
            .collect())
    }

    pub fn find_by_status(&self, status: MatchStatus) -> MatchResult<Vec<MatchRegistryEntry>> {
        Ok(self
            .state
            .list_matches()?
            .into_iter()
            .filter(|e| e.status == status)
            .collect())
    }

    pub fn find_all(&self) -> MatchResult<Vec<MatchRegistryEntry>> {
        Ok(self.state.list_matches()?)
    }

    fn get(&self, match_id: &str) -> MatchResult<MatchRegistryEntry> {
        self.state
            .get_match(match_id)?
            .ok_or_else(|| MatchError::NotFound(match_id.to_string()))
    }

    /// Purge FINISHED/ERROR entries whose `created_at` is older than
    /// `finished_retention`. Real retention should key off the terminal
    /// transition time, but the data model only stamps `created_at`, so
    /// this sweeper uses that as a conservative proxy.
    pub fn sweep_retention(&self) -> MatchResult<Vec<MatchId>> {
        let now = now_secs();
        let mut purged = Vec::new();
        for entry in self.state.list_matches()? {
            if entry.status.is_terminal() && now.saturating_sub(entry.created_at) >= self.finished_retention_secs {
                self.state.delete_match(&entry.match_id)?;
                warn!(match_id = %entry.match_id, "finished match purged by retention sweeper");
                purged.push(entry.match_id);
            }
        }
        Ok(purged)
    }

    /// Delete all entries hosted on `node_id`. Used when C1 removes an
    /// OFFLINE node past its own retention window.
    pub fn delete_for_node(&self, node_id: &NodeId) -> MatchResult<Vec<MatchId>> {
        let mut deleted = Vec::new();
        for entry in self.find_by_node(node_id)? {
            self.locks.with_lock(&entry.match_id, || self.state.delete_match(&entry.match_id))?;
            deleted.push(entry.match_id);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_entry(match_id: &str, node_id: &str, player_limit: u32) -> MatchRegistryEntry {
        MatchRegistryEntry {
            match_id: match_id.to_string(),
            node_id: node_id.to_string(),
            container_id: "c0".to_string(),
            status: MatchStatus::Running,
            module_names: vec!["arena".to_string()],
            created_at: now_secs(),
            advertise_address: "http://10.0.0.1:9000".to_string(),
            websocket_url: "ws://10.0.0.1:9000/ws".to_string(),
            player_count: 0,
            player_limit,
        }
    }

    fn registry() -> MatchRegistry {
        MatchRegistry::new(StateStore::open_in_memory().unwrap(), 3600)
    }

    #[test]
    fn create_fails_on_duplicate() {
        let reg = registry();
        reg.create(test_entry("m1", "node-1", 8)).unwrap();
        let err = reg.create(test_entry("m1", "node-1", 8)).unwrap_err();
        assert!(matches!(err, MatchError::AlreadyExists(_)));
    }

    #[test]
    fn increment_transitions_to_full_at_limit() {
        let reg = registry();
        reg.create(test_entry("m1", "node-1", 2)).unwrap();
        reg.increment_players("m1").unwrap();
        let entry = reg.increment_players("m1").unwrap();
        assert_eq!(entry.status, MatchStatus::Full);
        assert_eq!(entry.player_count, 2);
    }

    #[test]
    fn increment_fails_when_full() {
        let reg = registry();
        reg.create(test_entry("m1", "node-1", 1)).unwrap();
        reg.increment_players("m1").unwrap();
        let err = reg.increment_players("m1").unwrap_err();
        assert!(matches!(err, MatchError::Full(_)));
    }

    #[test]
    fn concurrent_increments_never_exceed_limit() {
        use std::thread;

        let reg = Arc::new(registry());
        reg.create(test_entry("m1", "node-1", 8)).unwrap();

        let handles: Vec<_> = (0..40)
            .map(|_| {
                let reg = reg.clone();
                thread::spawn(move || reg.increment_players("m1"))
            })
            .collect();

        let mut succeeded = 0;
        for h in handles {
            if h.join().unwrap().is_ok() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 8);
        assert_eq!(reg.find("m1").unwrap().unwrap().player_count, 8);
    }

    #[test]
    fn unlimited_player_limit_never_fills() {
        let reg = registry();
        reg.create(test_entry("m1", "node-1", 0)).unwrap();
        for _ in 0..50 {
            reg.increment_players("m1").unwrap();
        }
        let entry = reg.find("m1").unwrap().unwrap();
        assert_eq!(entry.status, MatchStatus::Running);
        assert_eq!(entry.player_count, 50);
    }

    #[test]
    fn decrement_reverts_full_to_running() {
        let reg = registry();
        reg.create(test_entry("m1", "node-1", 1)).unwrap();
        reg.increment_players("m1").unwrap();
        let entry = reg.decrement_players("m1").unwrap();
        assert_eq!(entry.status, MatchStatus::Running);
        assert_eq!(entry.player_count, 0);
    }

    #[test]
    fn find_by_node_and_status() {
        let reg = registry();
        reg.create(test_entry("m1", "node-1", 8)).unwrap();
        reg.create(test_entry("m2", "node-1", 8)).unwrap();
        reg.create(test_entry("m3", "node-2", 8)).unwrap();
        reg.update_status("m3", MatchStatus::Finished).unwrap();

        assert_eq!(reg.find_by_node("node-1").unwrap().len(), 2);
        assert_eq!(reg.find_by_status(MatchStatus::Finished).unwrap().len(), 1);
    }

    #[test]
    fn delete_unknown_match_fails() {
        let reg = registry();
        assert!(matches!(reg.delete("ghost").unwrap_err(), MatchError::NotFound(_)));
    }

    #[test]
    fn retention_sweeper_purges_old_finished_matches() {
        let reg = MatchRegistry::new(StateStore::open_in_memory().unwrap(), 0);
        reg.create(test_entry("m1", "node-1", 8)).unwrap();
        reg.update_status("m1", MatchStatus::Finished).unwrap();

        let purged = reg.sweep_retention().unwrap();
        assert_eq!(purged, vec!["m1".to_string()]);
        assert!(reg.find("m1").unwrap().is_none());
    }

    #[test]
    fn retention_sweeper_leaves_running_matches_alone() {
        let reg = MatchRegistry::new(StateStore::open_in_memory().unwrap(), 0);
        reg.create(test_entry("m1", "node-1", 8)).unwrap();

        let purged = reg.sweep_retention().unwrap();
        assert!(purged.is_empty());
        assert!(reg.find("m1").unwrap().is_some());
    }
}
