//! Integration tests for the Hive simulator
//!
//! These tests run the reconciler against a real Kubernetes cluster (kind)
//! and tell the story of how a clusters-service style client sees simulated
//! Hive resources evolve.
//!
//! # Test Organization
//!
//! - `crd_operations`: Stories about installing the CRDs and creating, reading
//!   and patching simulated resources through the Kubernetes API
//!
//! - `simulation_lifecycle`: Stories about how the reconciler walks claims
//!   and ClusterDeployments through their configured lifecycles, including
//!   dependency waits and injected failures
//!
//! # Running These Tests
//!
//! ```bash
//! cargo test --test kind -- --ignored
//!
//! # Only the lifecycle stories
//! cargo test --test kind simulation_lifecycle -- --ignored --nocapture
//! ```

mod crd_operations;
mod helpers;
mod simulation_lifecycle;
