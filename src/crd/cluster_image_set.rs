//! ClusterImageSet Custom Resource Definition
//!
//! Cluster-scoped list of installable OpenShift releases. The simulator only
//! creates these at startup so clients can resolve versions.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Specification for a ClusterImageSet
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "hive.openshift.io",
    version = "v1",
    kind = "ClusterImageSet",
    plural = "clusterimagesets",
    shortname = "imgset",
    printcolumn = r#"{"name":"Release","type":"string","jsonPath":".spec.releaseImage"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterImageSetSpec {
    /// Release image pull spec
    pub release_image: String,
}
