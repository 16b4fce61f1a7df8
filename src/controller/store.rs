//! Access to the backing object store
//!
//! The traits here are the only way the reconciler touches the API server, so
//! tests can swap in mocks.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use serde_json::{json, Value};
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use crate::state_machine::SimulatedResource;
use crate::Error;

/// Field manager recorded on every write
pub const FIELD_MANAGER: &str = "hive-simulator";

/// Typed access to simulated resources of one kind
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore<R: SimulatedResource>: Send + Sync {
    /// Fetch a resource, `None` if it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<R>, Error>;

    /// List all resources of this kind in a namespace
    async fn list(&self, namespace: &str) -> Result<Vec<R>, Error>;

    /// Persist the status of `resource`
    async fn update_status(&self, resource: &R) -> Result<(), Error>;

    /// Persist the spec of `resource`
    async fn update_spec(&self, resource: &R) -> Result<(), Error>;
}

/// Creation of side-effect secrets
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Create `secret`, returning `false` if it already existed
    async fn create_secret(&self, secret: &Secret) -> Result<bool, Error>;
}

/// Store backed by the Kubernetes API
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Create a store wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<R: SimulatedResource>(&self, namespace: &str) -> Api<R> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Extract one top-level field of a serialized resource for a merge patch
fn section<R: SimulatedResource>(resource: &R, field: &str) -> Result<Value, Error> {
    let value = serde_json::to_value(resource).map_err(|e| Error::serialization(e.to_string()))?;
    Ok(json!({ field: value.get(field).cloned().unwrap_or(Value::Null) }))
}

#[async_trait]
impl<R: SimulatedResource> ResourceStore<R> for KubeStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<R>, Error> {
        Ok(self.api::<R>(namespace).get_opt(name).await?)
    }

    async fn list(&self, namespace: &str) -> Result<Vec<R>, Error> {
        let list = self
            .api::<R>(namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::store_unavailable(e.to_string()))?;
        Ok(list.items)
    }

    async fn update_status(&self, resource: &R) -> Result<(), Error> {
        let namespace = resource.namespace().unwrap_or_default();
        let patch = section(resource, "status")?;

        self.api::<R>(&namespace)
            .patch_status(
                &resource.name_any(),
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await?;

        debug!(kind = %R::KIND, %namespace, name = %resource.name_any(), "status updated");
        Ok(())
    }

    async fn update_spec(&self, resource: &R) -> Result<(), Error> {
        let namespace = resource.namespace().unwrap_or_default();
        let patch = section(resource, "spec")?;

        self.api::<R>(&namespace)
            .patch(
                &resource.name_any(),
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await?;

        debug!(kind = %R::KIND, %namespace, name = %resource.name_any(), "spec updated");
        Ok(())
    }
}

#[async_trait]
impl SecretStore for KubeStore {
    async fn create_secret(&self, secret: &Secret) -> Result<bool, Error> {
        let namespace = secret.namespace().unwrap_or_default();
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);

        match api.create(&PostParams::default(), secret).await {
            Ok(_) => {
                info!(%namespace, name = %secret.name_any(), "created credentials secret");
                Ok(true)
            }
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                debug!(%namespace, name = %secret.name_any(), "credentials secret already exists");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ClaimStatus, ProjectClaim, ProjectClaimSpec};

    #[test]
    fn test_section_extracts_status_only() {
        let mut pc = ProjectClaim::new("pc", ProjectClaimSpec::default());
        pc.status = Some(ClaimStatus {
            state: Some("Ready".to_string()),
            conditions: vec![],
        });

        let patch = section(&pc, "status").unwrap();

        assert_eq!(patch["status"]["state"], "Ready");
        assert!(patch.get("spec").is_none());
        assert!(patch.get("metadata").is_none());
    }

    #[test]
    fn test_section_missing_field_is_null() {
        let pc = ProjectClaim::new("pc", ProjectClaimSpec::default());
        let patch = section(&pc, "status").unwrap();
        assert!(patch["status"].is_null());
    }
}
