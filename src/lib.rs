//! Hive simulator - a test double for the Hive control plane
//!
//! The simulator watches ClusterDeployment, AccountClaim and ProjectClaim
//! resources and walks each one through a configurable lifecycle, writing the
//! conditions, identifiers and URLs a real Hive installation would produce.
//! Delays, injected failures and per-resource overrides are controlled at
//! runtime through an HTTP API.
//!
//! # Architecture
//!
//! - A [`behavior::BehaviorEngine`] owns the lifecycle configuration and the
//!   per-resource overrides, and decides whether a reconciliation fails and
//!   how long the next transition takes
//! - A generic [`state_machine::StateMachine`] computes and applies the next
//!   state of any simulated kind
//! - A [`dependency::DependencyResolver`] holds ClusterDeployments back until
//!   their account or project claim is ready
//! - [`controller::reconcile`] ties the three together for every watched
//!   resource
//!
//! # Modules
//!
//! - [`crd`] - Custom Resource Definitions (ClusterDeployment, claims, ClusterImageSet)
//! - [`config`] - Lifecycle configuration, defaults and validation
//! - [`behavior`] - Configuration store and override registry
//! - [`state_machine`] - Per-kind lifecycle policy and the generic state machine
//! - [`dependency`] - Claim readiness checks
//! - [`controller`] - Kubernetes controller reconciliation logic
//! - [`api`] - HTTP configuration API
//! - [`image_sets`] - ClusterImageSet prepopulation
//! - [`telemetry`] - Logging setup
//! - [`retry`] - Backoff for startup calls
//! - [`error`] - Error types for the simulator

#![deny(missing_docs)]

pub mod api;
pub mod behavior;
pub mod config;
pub mod controller;
pub mod crd;
pub mod dependency;
pub mod error;
pub mod image_sets;
pub mod kind;
pub mod retry;
pub mod state_machine;
pub mod telemetry;

pub use error::Error;
pub use kind::{ResourceKey, ResourceKind};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================

/// Default port for the configuration API
pub const DEFAULT_API_PORT: u16 = 8080;

/// Label linking a ClusterDeployment to its account or project claim
pub const CORRELATION_LABEL: &str = "api.openshift.com/id";

/// Label on a ClusterDeployment selecting which claim kind it waits for
pub const CLOUD_PROVIDER_LABEL: &str = "cloud-provider";
