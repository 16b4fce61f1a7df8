//! ClusterDeployment Custom Resource Definition
//!
//! A trimmed-down Hive `ClusterDeployment`: only the fields clients of the
//! simulator read back are modelled. The simulator records its own position in
//! the lifecycle in `status.simulatorState`; real Hive has no such field.

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{Condition, LocalObjectReference};

/// Specification for a ClusterDeployment
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "hive.openshift.io",
    version = "v1",
    kind = "ClusterDeployment",
    plural = "clusterdeployments",
    shortname = "cd",
    status = "ClusterDeploymentStatus",
    namespaced,
    printcolumn = r#"{"name":"InfraID","type":"string","jsonPath":".spec.clusterMetadata.infraID"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.simulatorState"}"#,
    printcolumn = r#"{"name":"Installed","type":"boolean","jsonPath":".spec.installed"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDeploymentSpec {
    /// Friendly cluster name
    #[serde(default)]
    pub cluster_name: String,

    /// Base DNS domain; URLs fall back to `example.com` when empty
    #[serde(default)]
    pub base_domain: String,

    /// Set once the cluster has finished installing
    #[serde(default)]
    pub installed: bool,

    /// Metadata generated by the install
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_metadata: Option<ClusterMetadata>,
}

/// Identifiers generated during installation
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ClusterMetadata {
    /// Cluster UUID
    #[serde(rename = "clusterID")]
    pub cluster_id: String,

    /// Infrastructure identifier
    #[serde(rename = "infraID")]
    pub infra_id: String,
}

/// Status for a ClusterDeployment
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDeploymentStatus {
    /// Conditions emitted by the current lifecycle state
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Reference to the active (or failed) provision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provision_ref: Option<LocalObjectReference>,

    /// Web console URL
    #[serde(
        default,
        rename = "webConsoleURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub web_console_url: Option<String>,

    /// API server URL
    #[serde(default, rename = "apiURL", skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// When the cluster finished installing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_timestamp: Option<DateTime<Utc>>,

    /// Last lifecycle state applied by the simulator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulator_state: Option<String>,
}

impl ClusterDeployment {
    /// Base domain used for generated URLs
    pub fn base_domain(&self) -> &str {
        if self.spec.base_domain.is_empty() {
            "example.com"
        } else {
            &self.spec.base_domain
        }
    }
}
