//! Closed set of simulated resource kinds
//!
//! Every piece of per-kind behavior (configuration, overrides, state policy)
//! is looked up by [`ResourceKind`] rather than by free-form strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::state_machine::{CLAIM_ERROR_STATE, PROVISION_FAILED_STATE};
use crate::Error;

/// A resource kind the simulator drives through its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Hive ClusterDeployment (primary workload resource)
    ClusterDeployment,
    /// AWS account claim
    AccountClaim,
    /// GCP project claim
    ProjectClaim,
}

impl ResourceKind {
    /// All kinds in registration order
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::ClusterDeployment,
        ResourceKind::AccountClaim,
        ResourceKind::ProjectClaim,
    ];

    /// Lower-case identifier used in API paths and override keys
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::ClusterDeployment => "clusterdeployment",
            Self::AccountClaim => "accountclaim",
            Self::ProjectClaim => "projectclaim",
        }
    }

    /// Whether this is a claim kind that a ClusterDeployment may wait on
    pub fn is_claim(&self) -> bool {
        !matches!(self, Self::ClusterDeployment)
    }

    /// State a resource of this kind is forced into when a failure fires
    pub fn failure_state(&self) -> &'static str {
        match self {
            Self::ClusterDeployment => PROVISION_FAILED_STATE,
            Self::AccountClaim | Self::ProjectClaim => CLAIM_ERROR_STATE,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClusterDeployment => write!(f, "ClusterDeployment"),
            Self::AccountClaim => write!(f, "AccountClaim"),
            Self::ProjectClaim => write!(f, "ProjectClaim"),
        }
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clusterdeployment" => Ok(Self::ClusterDeployment),
            "accountclaim" => Ok(Self::AccountClaim),
            "projectclaim" => Ok(Self::ProjectClaim),
            other => Err(Error::validation(format!("unknown resource kind: {other}"))),
        }
    }
}

/// Identity of one resource instance: kind + namespace + name
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Resource kind
    pub kind: ResourceKind,
    /// Namespace
    pub namespace: String,
    /// Name
    pub name: String,
}

impl ResourceKey {
    /// Create a new key
    pub fn new(kind: ResourceKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.kind.path_segment(),
            self.namespace,
            self.name
        )
    }
}
