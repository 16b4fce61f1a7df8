//! ProjectClaim Custom Resource Definition
//!
//! Models the GCP project operator's claim for a GCP project.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{ClaimStatus, SecretReference};

/// Specification for a ProjectClaim
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "gcp.managed.openshift.io",
    version = "v1alpha1",
    kind = "ProjectClaim",
    plural = "projectclaims",
    status = "ClaimStatus",
    namespaced,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Project","type":"string","jsonPath":".spec.gcpProjectID"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProjectClaimSpec {
    /// GCP project ID, filled in once project creation starts
    #[serde(default, rename = "gcpProjectID")]
    pub gcp_project_id: String,

    /// Where to write the service account credentials
    #[serde(default)]
    pub gcp_credential_secret: SecretReference,

    /// GCP region
    #[serde(default)]
    pub region: String,
}
