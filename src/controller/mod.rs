//! Controllers for the simulated Hive resources
//!
//! All three kinds share one generic reconciler; the backing store and the
//! per-resource bookkeeping live alongside it.

mod simulation;
mod store;
mod tracker;

pub use simulation::{error_policy, reconcile, Context, ContextBuilder, Reconciled, ERROR_REQUEUE};
pub use store::{KubeStore, ResourceStore, SecretStore, FIELD_MANAGER};
pub use tracker::{KindCounts, ResourceTracker, NEW_STATE};

#[cfg(test)]
pub use store::{MockResourceStore, MockSecretStore};
