use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::rule::RuleSet;
use crate::services::aggregate::AggregateTracker;
use crate::utils::locks::LockRegistry;

/// Shared mutable state of one warden instance. Cloning hands out
/// another handle to the same state; nothing here is process-global, so
/// tests can run independent instances side by side.
#[derive(Clone)]
pub struct WardenState {
    /// Configured rules; each rule's active tier is re-resolved whenever
    /// the aggregate changes.
    pub rules: Arc<Mutex<RuleSet>>,
    pub aggregate: AggregateTracker,
    /// One in-flight role evaluation per (player, role) pair.
    pub role_locks: LockRegistry,
    /// One in-flight leadership evaluation per player.
    pub leader_locks: LockRegistry,
    /// Marks squads currently handled by the new-squad path so the
    /// became-leader path skips them.
    pub squad_locks: LockRegistry,
}

impl WardenState {
    pub fn new(rules: RuleSet, aggregate: AggregateTracker) -> Self {
        Self {
            rules: Arc::new(Mutex::new(rules)),
            aggregate,
            role_locks: LockRegistry::new(),
            leader_locks: LockRegistry::new(),
            squad_locks: LockRegistry::new(),
        }
    }

    /// Drops every in-flight enforcement key. Shutdown/reset only.
    pub fn release_all_locks(&self) {
        self.role_locks.release_all();
        self.leader_locks.release_all();
        self.squad_locks.release_all();
    }
}
