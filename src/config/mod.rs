//! Simulator configuration
//!
//! Each resource kind gets an ordered list of named states, each with a
//! duration and the conditions it emits, plus a list of failure scenarios.
//! The configuration is loaded once from YAML (see [`load_from_file`]) and can
//! be replaced per kind at runtime through the behavior engine.

mod loader;

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crd::{Condition, ConditionStatus};
use crate::kind::ResourceKind;
use crate::{Error, Result};

pub use loader::{load_from_file, parse_config};

/// Fallback state name when a kind has no configured states
pub const FALLBACK_STATE: &str = "Pending";

/// Fallback requeue delay when a kind has no configured states
pub const FALLBACK_DURATION: Duration = Duration::from_secs(5);

/// Complete simulator configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulatorConfig {
    /// ClusterDeployment behavior
    pub cluster_deployment: KindConfig,
    /// AccountClaim behavior
    pub account_claim: KindConfig,
    /// ProjectClaim behavior
    pub project_claim: KindConfig,
    /// ClusterImageSets created at startup
    pub cluster_image_sets: Vec<ClusterImageSetConfig>,
}

impl SimulatorConfig {
    /// Configuration for one kind
    pub fn kind(&self, kind: ResourceKind) -> &KindConfig {
        match kind {
            ResourceKind::ClusterDeployment => &self.cluster_deployment,
            ResourceKind::AccountClaim => &self.account_claim,
            ResourceKind::ProjectClaim => &self.project_claim,
        }
    }

    /// Return a copy with one kind's configuration replaced
    pub fn with_kind(mut self, kind: ResourceKind, config: KindConfig) -> Self {
        match kind {
            ResourceKind::ClusterDeployment => self.cluster_deployment = config,
            ResourceKind::AccountClaim => self.account_claim = config,
            ResourceKind::ProjectClaim => self.project_claim = config,
        }
        self
    }

    /// Validate every kind's configuration
    pub fn validate(&self) -> Result<()> {
        for kind in ResourceKind::ALL {
            self.kind(kind).validate(kind)?;
        }
        for set in &self.cluster_image_sets {
            if set.name.trim().is_empty() {
                return Err(Error::validation("ClusterImageSet name must not be empty"));
            }
        }
        Ok(())
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            cluster_deployment: KindConfig {
                default_delay_seconds: 5,
                states: vec![
                    StateConfig::new("Pending", 1),
                    StateConfig::new("Provisioning", 2).condition(ConditionConfig::new(
                        "DeprovisionLaunchError",
                        ConditionStatus::False,
                        "Provisioning",
                        "Cluster is provisioning",
                    )),
                    StateConfig::new("Installing", 1).condition(ConditionConfig::new(
                        "DNSNotReady",
                        ConditionStatus::False,
                        "DNSReady",
                        "DNS is ready",
                    )),
                    StateConfig::new("Running", 1).condition(ConditionConfig::new(
                        "ClusterDeploymentCompleted",
                        ConditionStatus::True,
                        "ClusterDeploymentCompleted",
                        "Cluster deployment is complete",
                    )),
                ],
                failure_scenarios: Vec::new(),
                depends_on_account_claim: true,
                depends_on_project_claim: true,
            },
            account_claim: KindConfig {
                default_delay_seconds: 3,
                states: vec![
                    StateConfig::new("Pending", 2).condition(ConditionConfig::new(
                        "AccountUnclaimed",
                        ConditionStatus::True,
                        "AccountPending",
                        "Account is pending",
                    )),
                    StateConfig::new("Ready", 1).condition(ConditionConfig::new(
                        "AccountClaimed",
                        ConditionStatus::True,
                        "AccountClaimed",
                        "Account has been claimed",
                    )),
                ],
                ..Default::default()
            },
            project_claim: KindConfig {
                default_delay_seconds: 4,
                states: vec![
                    StateConfig::new("Pending", 1),
                    StateConfig::new("PendingProject", 2).condition(ConditionConfig::new(
                        "PendingProject",
                        ConditionStatus::True,
                        "ProjectCreating",
                        "GCP project is being created",
                    )),
                    StateConfig::new("Ready", 1).condition(ConditionConfig::new(
                        "Ready",
                        ConditionStatus::True,
                        "ProjectReady",
                        "GCP project is ready",
                    )),
                ],
                ..Default::default()
            },
            cluster_image_sets: ["4.12.0", "4.13.0", "4.14.0", "4.15.0"]
                .iter()
                .map(|v| ClusterImageSetConfig {
                    name: format!("openshift-v{v}"),
                    visible: true,
                })
                .collect(),
        }
    }
}

/// Behavior of a single resource kind
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindConfig {
    /// Nominal delay between transitions; 0 means "sum of state durations"
    #[serde(default)]
    pub default_delay_seconds: u64,

    /// Ordered lifecycle states; the last one is terminal
    #[serde(default)]
    pub states: Vec<StateConfig>,

    /// Failure scenarios, evaluated in declaration order
    #[serde(default)]
    pub failure_scenarios: Vec<FailureScenario>,

    /// Wait for a ready AccountClaim before progressing (ClusterDeployment only)
    #[serde(default, skip_serializing_if = "is_false")]
    pub depends_on_account_claim: bool,

    /// Wait for a ready ProjectClaim before progressing (ClusterDeployment only)
    #[serde(default, skip_serializing_if = "is_false")]
    pub depends_on_project_claim: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl KindConfig {
    /// Total time a resource of this kind nominally takes to settle
    pub fn total_duration(&self) -> Duration {
        if self.default_delay_seconds > 0 {
            return Duration::from_secs(self.default_delay_seconds);
        }
        Duration::from_secs(self.states.iter().map(|s| s.duration_seconds).sum())
    }

    /// Look up a state by name
    pub fn state(&self, name: &str) -> Option<&StateConfig> {
        self.states.iter().find(|s| s.name == name)
    }

    /// Index of a state in the sequence
    pub fn position(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s.name == name)
    }

    /// The terminal (last) state, if any states are configured
    pub fn terminal_state(&self) -> Option<&StateConfig> {
        self.states.last()
    }

    /// Name of the terminal state, falling back to the built-in default
    pub fn terminal_state_name(&self) -> &str {
        self.terminal_state()
            .map(|s| s.name.as_str())
            .unwrap_or(FALLBACK_STATE)
    }

    /// Whether the named state is the last in the sequence
    pub fn is_terminal(&self, name: &str) -> bool {
        self.terminal_state().is_some_and(|s| s.name == name)
    }

    /// Whether resources of this kind wait on claims before progressing
    pub fn should_wait_for_dependencies(&self) -> bool {
        self.depends_on_account_claim || self.depends_on_project_claim
    }

    /// Reject configuration the engine cannot run with
    pub fn validate(&self, kind: ResourceKind) -> Result<()> {
        let mut seen = HashSet::new();
        let last = self.states.len().saturating_sub(1);
        for (i, state) in self.states.iter().enumerate() {
            if i < last && state.name == kind.failure_state() {
                return Err(Error::validation(format!(
                    "{kind} state {} is reserved for failures and may only be last",
                    state.name
                )));
            }
            if state.name.trim().is_empty() {
                return Err(Error::validation(format!(
                    "{kind} state names must not be empty"
                )));
            }
            if !seen.insert(state.name.as_str()) {
                return Err(Error::validation(format!(
                    "{kind} state {} is declared more than once",
                    state.name
                )));
            }
        }

        for (i, scenario) in self.failure_scenarios.iter().enumerate() {
            if !scenario.probability.is_finite() || !(0.0..=1.0).contains(&scenario.probability) {
                return Err(Error::validation(format!(
                    "{kind} failure scenario {i} probability must be 0.0-1.0"
                )));
            }
        }

        if kind.is_claim() && self.should_wait_for_dependencies() {
            return Err(Error::validation(format!(
                "{kind} cannot depend on other claims"
            )));
        }

        Ok(())
    }
}

/// One named lifecycle state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateConfig {
    /// State name as written to the resource
    pub name: String,

    /// How long the resource nominally stays in this state
    #[serde(default)]
    pub duration_seconds: u64,

    /// Conditions emitted on entering this state
    #[serde(default)]
    pub conditions: Vec<ConditionConfig>,
}

impl StateConfig {
    /// Create a state with no conditions
    pub fn new(name: impl Into<String>, duration_seconds: u64) -> Self {
        Self {
            name: name.into(),
            duration_seconds,
            conditions: Vec::new(),
        }
    }

    /// Add a condition to emit on entering this state
    pub fn condition(mut self, condition: ConditionConfig) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Configured duration
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_seconds)
    }
}

/// Condition template emitted by a state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConditionConfig {
    /// Condition type
    #[serde(rename = "type")]
    pub type_: String,

    /// Condition status
    #[serde(default)]
    pub status: ConditionStatus,

    /// Machine-readable reason
    #[serde(default)]
    pub reason: String,

    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

impl ConditionConfig {
    /// Create a condition template
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
        }
    }

    /// Materialize into a resource condition stamped with the current time
    pub fn to_condition(&self) -> Condition {
        Condition::new(
            self.type_.clone(),
            self.status.clone(),
            self.reason.clone(),
            self.message.clone(),
        )
    }
}

/// A failure that may be injected into a reconciliation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureScenario {
    /// Chance of firing on each reconciliation, 0.0 to 1.0
    #[serde(default)]
    pub probability: f64,

    /// Condition type appended to the failed resource
    pub condition: String,

    /// Machine-readable reason
    #[serde(default)]
    pub reason: String,

    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

impl FailureScenario {
    /// Create a scenario
    pub fn new(
        probability: f64,
        condition: impl Into<String>,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            probability,
            condition: condition.into(),
            reason: reason.into(),
            message: message.into(),
        }
    }

    /// Condition recorded on the resource when this scenario fires
    pub fn to_condition(&self) -> Condition {
        Condition::new(
            self.condition.clone(),
            ConditionStatus::True,
            self.reason.clone(),
            self.message.clone(),
        )
    }
}

/// ClusterImageSet created at startup
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterImageSetConfig {
    /// Image set name, e.g. `openshift-v4.15.0`
    pub name: String,

    /// Whether the image set is offered to clients
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}
