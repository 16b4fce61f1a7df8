//! Readiness checks between a ClusterDeployment and its claims
//!
//! A ClusterDeployment and its AccountClaim or ProjectClaim share the
//! [`CORRELATION_LABEL`]. The `cloud-provider` label on the ClusterDeployment
//! picks which claim kind it waits for.

use std::sync::Arc;
use std::time::Duration;

use kube::ResourceExt;
use tracing::{debug, warn};

use crate::config::{KindConfig, SimulatorConfig};
use crate::controller::ResourceStore;
use crate::crd::{AccountClaim, ProjectClaim};
use crate::kind::ResourceKind;
use crate::state_machine::SimulatedResource;
use crate::{CLOUD_PROVIDER_LABEL, CORRELATION_LABEL};

/// Retry interval while a claim is missing or not yet ready
pub const NOT_READY_RETRY: Duration = Duration::from_secs(2);

/// Retry interval when claims could not be listed
pub const STORE_UNAVAILABLE_RETRY: Duration = Duration::from_secs(5);

/// Outcome of a dependency check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Readiness {
    /// All prerequisites are ready
    pub ready: bool,
    /// When to check again if not ready
    pub retry_after: Duration,
}

impl Readiness {
    /// Dependency satisfied
    pub const READY: Readiness = Readiness {
        ready: true,
        retry_after: Duration::ZERO,
    };

    /// Dependency not satisfied yet
    pub fn waiting(retry_after: Duration) -> Self {
        Self {
            ready: false,
            retry_after,
        }
    }
}

/// Value of the correlation label, if present
pub fn correlation_key<R: ResourceExt>(resource: &R) -> Option<&str> {
    resource
        .labels()
        .get(CORRELATION_LABEL)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

/// Checks whether the claims a ClusterDeployment depends on are ready
pub struct DependencyResolver {
    account_claims: Arc<dyn ResourceStore<AccountClaim>>,
    project_claims: Arc<dyn ResourceStore<ProjectClaim>>,
}

impl DependencyResolver {
    /// Create a resolver listing claims from the given stores
    pub fn new(
        account_claims: Arc<dyn ResourceStore<AccountClaim>>,
        project_claims: Arc<dyn ResourceStore<ProjectClaim>>,
    ) -> Self {
        Self {
            account_claims,
            project_claims,
        }
    }

    /// Claim kind `primary` waits for, selected by its cloud-provider label
    ///
    /// `aws` (or no label) selects AccountClaim, `gcp` selects ProjectClaim.
    /// Returns `None` when the selected kind is not a configured dependency.
    pub fn dependency_for<P: ResourceExt>(
        primary: &P,
        config: &KindConfig,
    ) -> Option<ResourceKind> {
        let provider = primary
            .labels()
            .get(CLOUD_PROVIDER_LABEL)
            .map(|p| p.to_ascii_lowercase())
            .unwrap_or_default();

        match provider.as_str() {
            "" | "aws" if config.depends_on_account_claim => Some(ResourceKind::AccountClaim),
            "gcp" if config.depends_on_project_claim => Some(ResourceKind::ProjectClaim),
            _ => None,
        }
    }

    /// Check whether the `dependency` claim of `primary` is ready
    ///
    /// Store failures are reported as not ready rather than as errors.
    pub async fn check_ready<P: ResourceExt + Sync>(
        &self,
        primary: &P,
        dependency: ResourceKind,
        config: &SimulatorConfig,
    ) -> Readiness {
        let Some(key) = correlation_key(primary) else {
            debug!("no correlation label, nothing to wait for");
            return Readiness::READY;
        };
        let namespace = primary.namespace().unwrap_or_default();

        match dependency {
            ResourceKind::AccountClaim => {
                check_claims(
                    self.account_claims.as_ref(),
                    &namespace,
                    key,
                    config.kind(dependency),
                )
                .await
            }
            ResourceKind::ProjectClaim => {
                check_claims(
                    self.project_claims.as_ref(),
                    &namespace,
                    key,
                    config.kind(dependency),
                )
                .await
            }
            ResourceKind::ClusterDeployment => {
                warn!("ClusterDeployment is not a claim kind, treating as ready");
                Readiness::READY
            }
        }
    }
}

async fn check_claims<C: SimulatedResource>(
    store: &dyn ResourceStore<C>,
    namespace: &str,
    key: &str,
    config: &KindConfig,
) -> Readiness {
    let claims = match store.list(namespace).await {
        Ok(claims) => claims,
        Err(e) => {
            warn!(kind = %C::KIND, %namespace, error = %e, "failed to list claims");
            return Readiness::waiting(STORE_UNAVAILABLE_RETRY);
        }
    };

    let Some(claim) = claims.iter().find(|c| correlation_key(*c) == Some(key)) else {
        debug!(kind = %C::KIND, correlation = %key, "no matching claim yet");
        return Readiness::waiting(NOT_READY_RETRY);
    };

    let state = claim.derive_state(config);
    if state.as_deref().is_some_and(|s| config.is_terminal(s)) {
        debug!(kind = %C::KIND, claim = %claim.name_any(), "claim ready");
        Readiness::READY
    } else {
        debug!(
            kind = %C::KIND,
            claim = %claim.name_any(),
            state = state.as_deref().unwrap_or(""),
            "claim not ready"
        );
        Readiness::waiting(NOT_READY_RETRY)
    }
}
