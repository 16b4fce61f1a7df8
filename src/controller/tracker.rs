//! In-memory bookkeeping of reconciled resources
//!
//! The tracker remembers the last observed state of every resource identity
//! and when its next transition is due. Status writes made by the simulator
//! trigger watch events of their own; the due time lets the reconciler tell
//! those apart from a scheduled wake-up so configured delays are honored.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::kind::{ResourceKey, ResourceKind};

/// Label used for resources seen before any state was recorded
pub const NEW_STATE: &str = "New";

#[derive(Clone, Debug, Default)]
struct Tracked {
    state: Option<String>,
    due: Option<Instant>,
}

/// Resource counts for one kind
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindCounts {
    /// Number of tracked resources
    pub total: usize,
    /// Tracked resources grouped by state
    pub by_state: BTreeMap<String, usize>,
}

/// Concurrent map of resource identity to observed state
#[derive(Debug, Default)]
pub struct ResourceTracker {
    entries: DashMap<ResourceKey, Tracked>,
}

impl ResourceTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the currently observed state of a resource
    pub fn observe(&self, key: &ResourceKey, state: Option<&str>) {
        self.entries.entry(key.clone()).or_default().state = state.map(str::to_string);
    }

    /// Record that a resource entered `state` and its next transition is due
    /// after `delay`
    pub fn schedule(&self, key: &ResourceKey, state: &str, delay: Duration) {
        let mut entry = self.entries.entry(key.clone()).or_default();
        entry.state = Some(state.to_string());
        entry.due = (!delay.is_zero()).then(|| Instant::now() + delay);
    }

    /// Record a state with nothing further scheduled
    pub fn settle(&self, key: &ResourceKey, state: &str) {
        self.schedule(key, state, Duration::ZERO);
    }

    /// Time left before the next transition of `key` is due
    pub fn remaining(&self, key: &ResourceKey) -> Option<Duration> {
        let due = self.entries.get(key)?.due?;
        let left = due.saturating_duration_since(Instant::now());
        (!left.is_zero()).then_some(left)
    }

    /// Drop a resource that no longer exists
    pub fn forget(&self, key: &ResourceKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Last recorded state of `key`
    pub fn state(&self, key: &ResourceKey) -> Option<String> {
        self.entries.get(key).and_then(|e| e.state.clone())
    }

    /// Number of tracked resources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts per kind; every kind is present even when empty
    pub fn counts(&self) -> BTreeMap<ResourceKind, KindCounts> {
        let mut counts: BTreeMap<ResourceKind, KindCounts> = ResourceKind::ALL
            .iter()
            .map(|kind| (*kind, KindCounts::default()))
            .collect();

        for entry in self.entries.iter() {
            let kind = counts.entry(entry.key().kind).or_default();
            kind.total += 1;
            let state = entry.state.as_deref().unwrap_or(NEW_STATE);
            *kind.by_state.entry(state.to_string()).or_default() += 1;
        }
        counts
    }
}
