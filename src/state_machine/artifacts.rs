//! Deterministic identifiers synthesized for simulated resources
//!
//! Everything here is a pure function of the resource identity so that
//! re-applying a state always yields the same values.

use uuid::Uuid;

use crate::kind::ResourceKind;

fn identity_uuid(kind: ResourceKind, namespace: &str, name: &str) -> Uuid {
    let identity = format!("{}/{namespace}/{name}", kind.path_segment());
    Uuid::new_v5(&Uuid::NAMESPACE_OID, identity.as_bytes())
}

/// Cluster UUID for a ClusterDeployment
pub fn cluster_id(namespace: &str, name: &str) -> String {
    identity_uuid(ResourceKind::ClusterDeployment, namespace, name).to_string()
}

/// Infrastructure ID for a ClusterDeployment
pub fn infra_id(name: &str) -> String {
    format!("{name}-infra")
}

/// Web console URL for a cluster
pub fn console_url(name: &str, base_domain: &str) -> String {
    format!("https://console-openshift-console.apps.{name}.{base_domain}")
}

/// API server URL for a cluster
pub fn api_url(name: &str, base_domain: &str) -> String {
    format!("https://api.{name}.{base_domain}:6443")
}

/// Twelve-digit AWS account ID for an AccountClaim
pub fn aws_account_id(namespace: &str, name: &str) -> String {
    let value = identity_uuid(ResourceKind::AccountClaim, namespace, name).as_u128();
    format!("{:012}", value % 1_000_000_000_000)
}

/// GCP project ID for a ProjectClaim
pub fn gcp_project_id(namespace: &str, name: &str) -> String {
    let uuid = identity_uuid(ResourceKind::ProjectClaim, namespace, name);
    let suffix = uuid.simple().to_string();
    format!("project-{name}-{}", &suffix[..8])
}
