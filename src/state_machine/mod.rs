//! Configuration-driven lifecycle state machine
//!
//! One generic [`StateMachine`] drives every kind. What differs between kinds
//! (where the current state lives, what entering a state synthesizes, what a
//! failure looks like) is supplied by the [`SimulatedResource`] impl of the
//! resource type.
//!
//! Progression for a kind with states `[A, B, C]`:
//!
//! ```text
//! (none) -> A -> B -> C -> C ...
//!   any non-terminal state -> failure state (on injected failure)
//! ```

mod account_claim;
mod artifacts;
mod cluster_deployment;
mod project_claim;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::NamespaceResourceScope;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::{
    FailureScenario, KindConfig, SimulatorConfig, FALLBACK_DURATION, FALLBACK_STATE,
};
use crate::crd::Condition;
use crate::kind::{ResourceKey, ResourceKind};
use crate::{Error, Result};

pub use artifacts::{
    api_url, aws_account_id, cluster_id, console_url, gcp_project_id, infra_id,
};
pub use cluster_deployment::{derive_cluster_deployment_state, PROVISION_FAILED_STATE};
pub use project_claim::PROJECT_CREATING_STATE;

/// Name of the failure state for both claim kinds
pub const CLAIM_ERROR_STATE: &str = "Error";

/// Where a state sits in its kind's sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatePosition<'a> {
    /// State name
    pub name: &'a str,
    /// Zero-based index in the sequence
    pub index: usize,
    /// Length of the sequence
    pub count: usize,
}

impl StatePosition<'_> {
    /// First configured state
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    /// Last configured state
    pub fn is_terminal(&self) -> bool {
        self.index + 1 == self.count
    }
}

/// Next state and how long the resource should nominally stay in it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// State to enter
    pub state: String,
    /// Nominal time before the following transition; zero when settled
    pub duration: Duration,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}s)", self.state, self.duration.as_secs())
    }
}

/// Per-kind policy for resources driven by the simulator
pub trait SimulatedResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Kind identifier
    const KIND: ResourceKind;

    /// State a resource is forced into when a failure fires
    const FAILURE_STATE: &'static str;

    /// Current lifecycle state, or `None` when nothing has been recorded
    fn derive_state(&self, config: &KindConfig) -> Option<String>;

    /// Whether the resource reached its terminal or failure state
    fn is_settled(&self, config: &KindConfig) -> bool;

    /// Current conditions
    fn conditions(&self) -> &[Condition];

    /// Mutable conditions, creating the status if needed
    fn conditions_mut(&mut self) -> &mut Vec<Condition>;

    /// Record that the resource is now in `state`
    fn record_state(&mut self, state: &str);

    /// Kind-specific side effects of entering a state
    ///
    /// Must be idempotent: derived values are only written when unset.
    fn enter_state(&mut self, position: StatePosition<'_>, now: DateTime<Utc>);

    /// Set the kind's failure marker
    fn mark_failed(&mut self);

    /// Whether the spec is unchanged relative to `other`
    fn spec_eq(&self, other: &Self) -> bool;

    /// Credential secret to create on reaching the terminal state
    fn credential_secret(&self) -> Option<Secret> {
        None
    }

    /// Identity of this resource instance
    fn resource_key(&self) -> ResourceKey {
        ResourceKey::new(
            Self::KIND,
            self.namespace().unwrap_or_default(),
            self.name_any(),
        )
    }
}

/// Lifecycle engine for one kind, bound to a configuration snapshot
pub struct StateMachine<R> {
    config: Arc<SimulatorConfig>,
    _kind: PhantomData<fn() -> R>,
}

impl<R: SimulatedResource> StateMachine<R> {
    /// Create a state machine over a configuration snapshot
    pub fn new(config: Arc<SimulatorConfig>) -> Self {
        Self {
            config,
            _kind: PhantomData,
        }
    }

    /// Configuration of this machine's kind
    pub fn config(&self) -> &KindConfig {
        self.config.kind(R::KIND)
    }

    /// Current state of `resource`
    pub fn current_state(&self, resource: &R) -> Option<String> {
        resource.derive_state(self.config())
    }

    /// Whether `resource` needs no further reconciliation
    pub fn is_settled(&self, resource: &R) -> bool {
        resource.is_settled(self.config())
    }

    /// Whether this kind waits on claims before progressing
    pub fn should_wait_for_dependencies(&self) -> bool {
        self.config().should_wait_for_dependencies()
    }

    /// Compute the state `resource` should move to next
    ///
    /// Unknown or missing states restart at the first configured state. A
    /// resource already in the terminal state stays there with zero duration.
    pub fn next_state(&self, resource: &R) -> Transition {
        let config = self.config();
        let Some(first) = config.states.first() else {
            return Transition {
                state: FALLBACK_STATE.to_string(),
                duration: FALLBACK_DURATION,
            };
        };

        let current = self.current_state(resource);
        let position = current.as_deref().and_then(|s| config.position(s));

        match position {
            Some(i) if i + 1 == config.states.len() => Transition {
                state: config.states[i].name.clone(),
                duration: Duration::ZERO,
            },
            Some(i) => {
                let next = &config.states[i + 1];
                Transition {
                    state: next.name.clone(),
                    duration: next.duration(),
                }
            }
            None => {
                if let Some(stale) = current {
                    debug!(
                        kind = %R::KIND,
                        state = %stale,
                        "state not in configuration, restarting"
                    );
                }
                Transition {
                    state: first.name.clone(),
                    duration: first.duration(),
                }
            }
        }
    }

    /// Move `resource` into `state`, stamping conditions with the current time
    pub fn apply_state(&self, resource: &mut R, state: &str) -> Result<()> {
        self.apply_state_at(resource, state, Utc::now())
    }

    /// Move `resource` into `state` as of `now`
    ///
    /// Fails without touching the resource if `state` is not configured.
    pub fn apply_state_at(&self, resource: &mut R, state: &str, now: DateTime<Utc>) -> Result<()> {
        let config = self.config();
        let index = config
            .position(state)
            .ok_or_else(|| Error::state_not_found(R::KIND, state))?;
        let entry = &config.states[index];

        *resource.conditions_mut() = entry
            .conditions
            .iter()
            .map(|c| {
                Condition::at(
                    c.type_.clone(),
                    c.status.clone(),
                    c.reason.clone(),
                    c.message.clone(),
                    now,
                )
            })
            .collect();
        resource.record_state(&entry.name);
        resource.enter_state(
            StatePosition {
                name: &entry.name,
                index,
                count: config.states.len(),
            },
            now,
        );
        Ok(())
    }

    /// Force `resource` into the failure state described by `scenario`
    ///
    /// Existing conditions and derived artifacts are kept; the failure
    /// condition is appended. A scenario without a condition type is
    /// rejected and leaves `resource` untouched.
    pub fn apply_failure(&self, resource: &mut R, scenario: &FailureScenario) -> Result<()> {
        if scenario.condition.trim().is_empty() {
            return Err(Error::validation(format!(
                "{} failure scenario {} has no condition type",
                R::KIND,
                scenario.reason
            )));
        }

        resource.record_state(R::FAILURE_STATE);
        resource.mark_failed();
        resource.conditions_mut().push(scenario.to_condition());
        Ok(())
    }
}
