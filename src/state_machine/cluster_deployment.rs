//! ClusterDeployment lifecycle policy
//!
//! Hive does not store a lifecycle state on a ClusterDeployment, so the
//! current state is derived from the strongest signal present:
//!
//! 1. `spec.installed` means the terminal state
//! 2. a failed provision ref means [`PROVISION_FAILED_STATE`]
//! 3. the state recorded by the simulator in `status.simulatorState`
//! 4. the latest configured state whose conditions are all present
//! 5. a provision ref means the second configured state
//!
//! Anything else is "no state recorded".

use chrono::{DateTime, Utc};
use kube::ResourceExt;

use super::artifacts::{api_url, cluster_id, console_url, infra_id};
use super::{SimulatedResource, StatePosition};
use crate::config::KindConfig;
use crate::crd::{ClusterDeployment, ClusterMetadata, Condition, LocalObjectReference};
use crate::kind::ResourceKind;

/// Failure state of a ClusterDeployment
pub const PROVISION_FAILED_STATE: &str = "ProvisionFailed";

const PROVISION_SUFFIX: &str = "-provision";
const PROVISION_FAILED_SUFFIX: &str = "-provision-failed";

/// Derive the lifecycle state of a ClusterDeployment
pub fn derive_cluster_deployment_state(
    cd: &ClusterDeployment,
    config: &KindConfig,
) -> Option<String> {
    if cd.spec.installed {
        return Some(config.terminal_state_name().to_string());
    }

    let status = cd.status.as_ref()?;

    if is_failed(cd) {
        return Some(PROVISION_FAILED_STATE.to_string());
    }

    if let Some(state) = status.simulator_state.as_deref().filter(|s| !s.is_empty()) {
        return Some(state.to_string());
    }

    let by_conditions = config.states.iter().rev().find(|state| {
        !state.conditions.is_empty()
            && state.conditions.iter().all(|expected| {
                status
                    .conditions
                    .iter()
                    .any(|c| c.type_ == expected.type_ && c.status == expected.status)
            })
    });
    if let Some(state) = by_conditions {
        return Some(state.name.clone());
    }

    if status.provision_ref.is_some() {
        return config.states.get(1).map(|s| s.name.clone());
    }

    None
}

fn is_failed(cd: &ClusterDeployment) -> bool {
    cd.status
        .as_ref()
        .and_then(|s| s.provision_ref.as_ref())
        .is_some_and(|r| r.name.ends_with(PROVISION_FAILED_SUFFIX))
}

impl SimulatedResource for ClusterDeployment {
    const KIND: ResourceKind = ResourceKind::ClusterDeployment;
    const FAILURE_STATE: &'static str = PROVISION_FAILED_STATE;

    fn derive_state(&self, config: &KindConfig) -> Option<String> {
        derive_cluster_deployment_state(self, config)
    }

    fn is_settled(&self, _config: &KindConfig) -> bool {
        self.spec.installed || is_failed(self)
    }

    fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }

    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.status.get_or_insert_with(Default::default).conditions
    }

    fn record_state(&mut self, state: &str) {
        self.status.get_or_insert_with(Default::default).simulator_state = Some(state.to_string());
    }

    fn enter_state(&mut self, position: StatePosition<'_>, now: DateTime<Utc>) {
        let name = self.name_any();
        let namespace = self.namespace().unwrap_or_default();
        let base_domain = self.base_domain().to_string();
        let status = self.status.get_or_insert_with(Default::default);

        if !position.is_first() && status.provision_ref.is_none() {
            let provision = format!("{name}{PROVISION_SUFFIX}");
            status.provision_ref = Some(LocalObjectReference::new(provision));
        }

        // URLs become available once installation starts
        if position.index >= 2 || position.is_terminal() {
            status
                .web_console_url
                .get_or_insert_with(|| console_url(&name, &base_domain));
            status
                .api_url
                .get_or_insert_with(|| api_url(&name, &base_domain));
        }

        if position.is_terminal() {
            status.installed_timestamp.get_or_insert(now);
            self.spec.installed = true;
            let metadata = self.spec.cluster_metadata.get_or_insert_with(ClusterMetadata::default);
            if metadata.infra_id.is_empty() {
                metadata.infra_id = infra_id(&name);
            }
            if metadata.cluster_id.is_empty() {
                metadata.cluster_id = cluster_id(&namespace, &name);
            }
        }
    }

    fn mark_failed(&mut self) {
        let name = self.name_any();
        self.status.get_or_insert_with(Default::default).provision_ref =
            Some(LocalObjectReference::new(format!("{name}{PROVISION_FAILED_SUFFIX}")));
    }

    fn spec_eq(&self, other: &Self) -> bool {
        self.spec == other.spec
    }
}
