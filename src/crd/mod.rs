//! Custom Resource Definitions served by the simulator
//!
//! The simulator owns the schemas of the resources it drives so it can run
//! against an empty API server.

mod account_claim;
mod cluster_deployment;
mod cluster_image_set;
mod project_claim;
mod types;

pub use account_claim::{AccountClaim, AccountClaimSpec, LegalEntity};
pub use cluster_deployment::{
    ClusterDeployment, ClusterDeploymentSpec, ClusterDeploymentStatus, ClusterMetadata,
};
pub use cluster_image_set::{ClusterImageSet, ClusterImageSetSpec};
pub use project_claim::{ProjectClaim, ProjectClaimSpec};
pub use types::{ClaimStatus, Condition, ConditionStatus, LocalObjectReference, SecretReference};
