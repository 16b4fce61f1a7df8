//! Behavior engine: configuration store plus override registry
//!
//! The engine answers two questions for any resource instance:
//!
//! - should this reconciliation fail, and with which failure scenario?
//! - how long should we wait before the next reconciliation?
//!
//! Configuration and overrides sit behind one reader/writer lock. Writers
//! swap in whole new values (`Arc<SimulatorConfig>`, one override per key), so
//! a reader holding a snapshot never sees a half-applied update.

mod overrides;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::{debug, info};

use crate::config::{FailureScenario, KindConfig, SimulatorConfig};
use crate::kind::{ResourceKey, ResourceKind};
use crate::Result;

pub use overrides::{OverrideEntry, ResourceOverride};

struct EngineState {
    config: Arc<SimulatorConfig>,
    overrides: HashMap<ResourceKey, Arc<ResourceOverride>>,
}

/// Shared configuration and override registry
pub struct BehaviorEngine {
    state: RwLock<EngineState>,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl BehaviorEngine {
    /// Create an engine seeded from OS entropy
    pub fn new(config: SimulatorConfig) -> Self {
        Self::with_rng(config, Box::new(StdRng::from_entropy()))
    }

    /// Create an engine whose failure sampling is reproducible
    pub fn with_seed(config: SimulatorConfig, seed: u64) -> Self {
        Self::with_rng(config, Box::new(StdRng::seed_from_u64(seed)))
    }

    /// Create an engine drawing from the given random source
    pub fn with_rng(config: SimulatorConfig, rng: Box<dyn RngCore + Send>) -> Self {
        Self {
            state: RwLock::new(EngineState {
                config: Arc::new(config),
                overrides: HashMap::new(),
            }),
            rng: Mutex::new(rng),
        }
    }

    /// Decide whether the reconciliation of `key` should fail
    ///
    /// Forced success beats forced failure, which beats the configured
    /// scenarios. Each configured scenario is sampled independently in
    /// declaration order and the first hit wins, so probabilities are not a
    /// normalized distribution.
    pub fn should_fail(&self, key: &ResourceKey) -> Option<FailureScenario> {
        let (config, override_) = {
            let state = self.state.read();
            (state.config.clone(), state.overrides.get(key).cloned())
        };

        if let Some(o) = override_ {
            if o.force_success {
                debug!(resource = %key, "forced success override");
                return None;
            }
            if let Some(scenario) = &o.force_fail {
                debug!(resource = %key, condition = %scenario.condition, "forced failure override");
                return Some(scenario.clone());
            }
        }

        let mut rng = self.rng.lock();
        for scenario in &config.kind(key.kind).failure_scenarios {
            if scenario.probability <= 0.0 {
                continue;
            }
            let roll: f64 = rng.gen();
            if roll < scenario.probability {
                debug!(
                    resource = %key,
                    condition = %scenario.condition,
                    probability = scenario.probability,
                    roll,
                    "failure scenario fired"
                );
                return Some(scenario.clone());
            }
        }

        None
    }

    /// Delay before the next reconciliation of `key`
    pub fn transition_delay(&self, key: &ResourceKey, default: Duration) -> Duration {
        self.state
            .read()
            .overrides
            .get(key)
            .and_then(|o| o.forced_delay())
            .unwrap_or(default)
    }

    /// Replace the override for `key`
    pub fn set_override(&self, key: ResourceKey, override_: ResourceOverride) {
        info!(resource = %key, ?override_, "setting override");
        self.state.write().overrides.insert(key, Arc::new(override_));
    }

    /// Edit the override for `key` in one step
    ///
    /// An override left empty by `f` is removed.
    pub fn amend_override<F>(&self, key: ResourceKey, f: F) -> ResourceOverride
    where
        F: FnOnce(&mut ResourceOverride),
    {
        let mut state = self.state.write();
        let mut updated = state
            .overrides
            .get(&key)
            .map(|o| (**o).clone())
            .unwrap_or_default();
        f(&mut updated);

        info!(resource = %key, override_ = ?updated, "amending override");
        if updated.is_empty() {
            state.overrides.remove(&key);
        } else {
            state.overrides.insert(key, Arc::new(updated.clone()));
        }
        updated
    }

    /// Remove the override for `key`, returning whether one existed
    pub fn clear_override(&self, key: &ResourceKey) -> bool {
        let removed = self.state.write().overrides.remove(key).is_some();
        info!(resource = %key, removed, "clearing override");
        removed
    }

    /// Remove every override
    pub fn clear_all_overrides(&self) -> usize {
        let mut state = self.state.write();
        let count = state.overrides.len();
        state.overrides.clear();
        info!(count, "cleared all overrides");
        count
    }

    /// Current override for `key`
    pub fn override_for(&self, key: &ResourceKey) -> Option<ResourceOverride> {
        self.state.read().overrides.get(key).map(|o| (**o).clone())
    }

    /// All overrides, sorted by resource identity
    pub fn overrides(&self) -> Vec<OverrideEntry> {
        let mut entries: Vec<_> = self
            .state
            .read()
            .overrides
            .iter()
            .map(|(key, o)| OverrideEntry {
                key: key.clone(),
                override_: (**o).clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Number of active overrides
    pub fn override_count(&self) -> usize {
        self.state.read().overrides.len()
    }

    /// Snapshot of the full configuration
    pub fn config(&self) -> Arc<SimulatorConfig> {
        self.state.read().config.clone()
    }

    /// Snapshot of one kind's configuration
    pub fn kind_config(&self, kind: ResourceKind) -> KindConfig {
        self.config().kind(kind).clone()
    }

    /// Validate and atomically replace one kind's configuration
    pub fn update_config(&self, kind: ResourceKind, config: KindConfig) -> Result<()> {
        config.validate(kind)?;

        let mut state = self.state.write();
        let updated = (*state.config).clone().with_kind(kind, config);
        state.config = Arc::new(updated);
        info!(%kind, "updated configuration");
        Ok(())
    }

    /// Validate and atomically replace the whole configuration
    pub fn replace_config(&self, config: SimulatorConfig) -> Result<()> {
        config.validate()?;
        self.state.write().config = Arc::new(config);
        info!("replaced configuration");
        Ok(())
    }
}

impl Default for BehaviorEngine {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}
