//! Reconciliation of simulated resources
//!
//! One generic reconciler drives all three kinds. A cycle fetches the latest
//! copy of the resource, consults the behavior engine for injected failures,
//! waits for claims when the kind depends on them, then moves the resource
//! one state forward and schedules the next cycle after the state's delay.

use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use super::store::{KubeStore, ResourceStore, SecretStore};
use super::tracker::ResourceTracker;
use crate::behavior::BehaviorEngine;
use crate::crd::{AccountClaim, ClusterDeployment, ProjectClaim};
use crate::dependency::DependencyResolver;
use crate::state_machine::{SimulatedResource, StateMachine};
use crate::Error;

/// Requeue interval after a failed reconciliation
pub const ERROR_REQUEUE: Duration = Duration::from_secs(5);

/// Shared state for every reconciliation
///
/// Use [`ContextBuilder`] to construct instances:
///
/// ```ignore
/// let ctx = Context::builder(client)
///     .engine(engine)
///     .tracker(tracker)
///     .build();
/// ```
pub struct Context {
    /// Configuration and override registry
    pub engine: Arc<BehaviorEngine>,
    /// ClusterDeployment access
    pub cluster_deployments: Arc<dyn ResourceStore<ClusterDeployment>>,
    /// AccountClaim access
    pub account_claims: Arc<dyn ResourceStore<AccountClaim>>,
    /// ProjectClaim access
    pub project_claims: Arc<dyn ResourceStore<ProjectClaim>>,
    /// Credential secret creation
    pub secrets: Arc<dyn SecretStore>,
    /// Claim readiness checks
    pub dependencies: DependencyResolver,
    /// Observed states and due times
    pub tracker: Arc<ResourceTracker>,
}

impl Context {
    /// Create a builder for constructing a Context
    pub fn builder(client: Client) -> ContextBuilder {
        ContextBuilder::new(client)
    }

    /// Create a context for testing with custom stores
    ///
    /// This method is primarily for unit tests where a real Kubernetes
    /// client is not available. For production code, use [`Context::builder`].
    #[cfg(test)]
    pub fn for_testing(
        engine: Arc<BehaviorEngine>,
        cluster_deployments: Arc<dyn ResourceStore<ClusterDeployment>>,
        account_claims: Arc<dyn ResourceStore<AccountClaim>>,
        project_claims: Arc<dyn ResourceStore<ProjectClaim>>,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            engine,
            cluster_deployments,
            dependencies: DependencyResolver::new(account_claims.clone(), project_claims.clone()),
            account_claims,
            project_claims,
            secrets,
            tracker: Arc::new(ResourceTracker::new()),
        }
    }
}

/// Builder for constructing [`Context`] instances
pub struct ContextBuilder {
    client: Client,
    engine: Option<Arc<BehaviorEngine>>,
    tracker: Option<Arc<ResourceTracker>>,
    cluster_deployments: Option<Arc<dyn ResourceStore<ClusterDeployment>>>,
    account_claims: Option<Arc<dyn ResourceStore<AccountClaim>>>,
    project_claims: Option<Arc<dyn ResourceStore<ProjectClaim>>>,
    secrets: Option<Arc<dyn SecretStore>>,
}

impl ContextBuilder {
    fn new(client: Client) -> Self {
        Self {
            client,
            engine: None,
            tracker: None,
            cluster_deployments: None,
            account_claims: None,
            project_claims: None,
            secrets: None,
        }
    }

    /// Share an existing behavior engine (the API server holds the same one)
    pub fn engine(mut self, engine: Arc<BehaviorEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Share an existing tracker
    pub fn tracker(mut self, tracker: Arc<ResourceTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Override the ClusterDeployment store (primarily for testing)
    pub fn cluster_deployment_store(
        mut self,
        store: Arc<dyn ResourceStore<ClusterDeployment>>,
    ) -> Self {
        self.cluster_deployments = Some(store);
        self
    }

    /// Override the AccountClaim store (primarily for testing)
    pub fn account_claim_store(mut self, store: Arc<dyn ResourceStore<AccountClaim>>) -> Self {
        self.account_claims = Some(store);
        self
    }

    /// Override the ProjectClaim store (primarily for testing)
    pub fn project_claim_store(mut self, store: Arc<dyn ResourceStore<ProjectClaim>>) -> Self {
        self.project_claims = Some(store);
        self
    }

    /// Override the secret store (primarily for testing)
    pub fn secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secrets = Some(store);
        self
    }

    /// Build the Context
    pub fn build(self) -> Context {
        let kube = Arc::new(KubeStore::new(self.client));

        let account_claims = self
            .account_claims
            .unwrap_or_else(|| kube.clone() as Arc<dyn ResourceStore<AccountClaim>>);
        let project_claims = self
            .project_claims
            .unwrap_or_else(|| kube.clone() as Arc<dyn ResourceStore<ProjectClaim>>);

        Context {
            engine: self.engine.unwrap_or_default(),
            cluster_deployments: self
                .cluster_deployments
                .unwrap_or_else(|| kube.clone() as Arc<dyn ResourceStore<ClusterDeployment>>),
            dependencies: DependencyResolver::new(account_claims.clone(), project_claims.clone()),
            account_claims,
            project_claims,
            secrets: self
                .secrets
                .unwrap_or_else(|| kube as Arc<dyn SecretStore>),
            tracker: self.tracker.unwrap_or_default(),
        }
    }
}

/// A simulated kind with a store in the [`Context`]
pub trait Reconciled: SimulatedResource {
    /// Store holding resources of this kind
    fn store(ctx: &Context) -> &dyn ResourceStore<Self>;
}

impl Reconciled for ClusterDeployment {
    fn store(ctx: &Context) -> &dyn ResourceStore<Self> {
        ctx.cluster_deployments.as_ref()
    }
}

impl Reconciled for AccountClaim {
    fn store(ctx: &Context) -> &dyn ResourceStore<Self> {
        ctx.account_claims.as_ref()
    }
}

impl Reconciled for ProjectClaim {
    fn store(ctx: &Context) -> &dyn ResourceStore<Self> {
        ctx.project_claims.as_ref()
    }
}

/// Reconcile one simulated resource
///
/// Each call advances the resource by at most one state. Returns the
/// [`Action`] for the next cycle, or an error for [`error_policy`] to handle.
#[instrument(
    skip(resource, ctx),
    fields(
        kind = %R::KIND,
        namespace = %resource.namespace().unwrap_or_default(),
        name = %resource.name_any(),
    )
)]
pub async fn reconcile<R: Reconciled>(
    resource: Arc<R>,
    ctx: Arc<Context>,
) -> Result<Action, Error> {
    let key = resource.resource_key();
    let store = R::store(&ctx);

    // The watch cache can lag behind our own writes, so work from a fresh copy
    let Some(current) = store.get(&key.namespace, &key.name).await? else {
        debug!("resource no longer exists");
        ctx.tracker.forget(&key);
        return Ok(Action::await_change());
    };

    if current.meta().deletion_timestamp.is_some() {
        debug!("resource is being deleted");
        ctx.tracker.forget(&key);
        return Ok(Action::await_change());
    }

    let config = ctx.engine.config();
    let machine = StateMachine::<R>::new(config.clone());
    let state = machine.current_state(&current);
    ctx.tracker.observe(&key, state.as_deref());

    if machine.is_settled(&current) {
        debug!(state = state.as_deref().unwrap_or(""), "resource settled");
        return Ok(Action::await_change());
    }

    // Our own status writes wake us up early; keep the scheduled cadence
    if let Some(remaining) = ctx.tracker.remaining(&key) {
        debug!(remaining_ms = remaining.as_millis() as u64, "transition not due yet");
        return Ok(Action::requeue(remaining));
    }

    if let Some(scenario) = ctx.engine.should_fail(&key) {
        let mut failed = current.clone();
        machine.apply_failure(&mut failed, &scenario)?;
        store.update_status(&failed).await?;
        ctx.tracker.settle(&key, R::FAILURE_STATE);
        warn!(
            condition = %scenario.condition,
            reason = %scenario.reason,
            "failure injected"
        );
        return Ok(Action::await_change());
    }

    if machine.should_wait_for_dependencies() {
        if let Some(dependency) = DependencyResolver::dependency_for(&current, machine.config()) {
            let readiness = ctx
                .dependencies
                .check_ready(&current, dependency, &config)
                .await;
            if !readiness.ready {
                debug!(
                    %dependency,
                    retry_secs = readiness.retry_after.as_secs(),
                    "waiting for dependency"
                );
                return Ok(Action::requeue(readiness.retry_after));
            }
        }
    }

    let transition = machine.next_state(&current);
    let mut updated = current.clone();
    machine.apply_state(&mut updated, &transition.state)?;

    if machine.config().is_terminal(&transition.state) {
        if let Some(secret) = updated.credential_secret() {
            ctx.secrets.create_secret(&secret).await?;
        }
    }

    store.update_status(&updated).await?;
    if !updated.spec_eq(&current) {
        store.update_spec(&updated).await?;
    }

    let delay = ctx.engine.transition_delay(&key, transition.duration);
    if delay.is_zero() {
        ctx.tracker.settle(&key, &transition.state);
        info!(state = %transition.state, "state applied, no further transitions");
        return Ok(Action::await_change());
    }

    ctx.tracker.schedule(&key, &transition.state, delay);
    info!(
        state = %transition.state,
        delay_secs = delay.as_secs(),
        "state applied"
    );
    Ok(Action::requeue(delay))
}

/// Error policy for the controllers
///
/// Logs the failure with the full resource identity and requeues after
/// [`ERROR_REQUEUE`].
pub fn error_policy<R: Reconciled>(resource: Arc<R>, error: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        ?error,
        kind = %R::KIND,
        namespace = %resource.namespace().unwrap_or_default(),
        name = %resource.name_any(),
        class = %error.class(),
        retryable = error.is_retryable(),
        "reconciliation failed"
    );

    Action::requeue(ERROR_REQUEUE)
}
