//! ClusterImageSet prepopulation
//!
//! Clients of Hive look up installable OpenShift versions through
//! cluster-scoped ClusterImageSets. The simulator creates one per configured
//! release at startup, labelled the way clusters-service expects.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use kube::Client;
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use crate::config::ClusterImageSetConfig;
use crate::crd::{ClusterImageSet, ClusterImageSetSpec};
use crate::retry::{retry, RetryPolicy};
use crate::Error;

/// Label carrying the release channel group
pub const CHANNEL_GROUP_LABEL: &str = "api.openshift.com/channel-group";

/// Annotation carrying the bare release version
pub const VERSION_ANNOTATION: &str = "api.openshift.com/version";

/// Repository release images are pulled from
pub const RELEASE_IMAGE_REPOSITORY: &str = "quay.io/openshift-release-dev/ocp-release";

/// Channel group a release belongs to, inferred from its name
///
/// `openshift-v4.17.0-ec.0-candidate` is `candidate`,
/// `openshift-v4.17.0-fc.0-fast` is `fast`, anything with `-nightly` is
/// `nightly`, everything else `stable`.
pub fn channel_group(name: &str) -> &'static str {
    if name.contains("-ec.") || name.contains("-candidate") {
        "candidate"
    } else if name.contains("-fc.") || name.contains("-fast") {
        "fast"
    } else if name.contains("-nightly") {
        "nightly"
    } else {
        "stable"
    }
}

/// Release version without the `openshift-v` prefix or channel suffix
pub fn release_version(name: &str) -> &str {
    let version = name.strip_prefix("openshift-v").unwrap_or(name);
    ["-candidate", "-fast", "-nightly"]
        .iter()
        .fold(version, |v, suffix| v.strip_suffix(suffix).unwrap_or(v))
}

/// Build the ClusterImageSet for a configured release
pub fn build_image_set(config: &ClusterImageSetConfig) -> ClusterImageSet {
    ClusterImageSet {
        metadata: ObjectMeta {
            name: Some(config.name.clone()),
            labels: Some(BTreeMap::from([(
                CHANNEL_GROUP_LABEL.to_string(),
                channel_group(&config.name).to_string(),
            )])),
            annotations: Some(BTreeMap::from([(
                VERSION_ANNOTATION.to_string(),
                release_version(&config.name).to_string(),
            )])),
            ..Default::default()
        },
        spec: ClusterImageSetSpec {
            release_image: format!("{RELEASE_IMAGE_REPOSITORY}:{}", config.name),
        },
    }
}

/// Creation of ClusterImageSets
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ImageSetCreator: Send + Sync {
    /// Create `image_set`, returning `false` if it already existed
    async fn create(&self, image_set: &ClusterImageSet) -> Result<bool, Error>;
}

/// [`ImageSetCreator`] backed by the Kubernetes API
pub struct KubeImageSetCreator {
    client: Client,
}

impl KubeImageSetCreator {
    /// Create a creator using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageSetCreator for KubeImageSetCreator {
    async fn create(&self, image_set: &ClusterImageSet) -> Result<bool, Error> {
        let api: Api<ClusterImageSet> = Api::all(self.client.clone());
        match api.create(&PostParams::default(), image_set).await {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Create every visible configured image set
///
/// Each creation is retried per `policy`. A set that still cannot be created
/// is logged and skipped; the simulator runs fine without it. Returns how
/// many sets were newly created.
pub async fn prepopulate_image_sets(
    creator: &dyn ImageSetCreator,
    image_sets: &[ClusterImageSetConfig],
    policy: &RetryPolicy,
) -> usize {
    let mut created = 0;
    for config in image_sets {
        if !config.visible {
            debug!(name = %config.name, "skipping hidden image set");
            continue;
        }

        let image_set = build_image_set(config);
        match retry(policy, "create ClusterImageSet", || creator.create(&image_set)).await {
            Ok(true) => {
                created += 1;
                debug!(
                    name = %config.name,
                    channel = channel_group(&config.name),
                    version = release_version(&config.name),
                    "created ClusterImageSet"
                );
            }
            Ok(false) => debug!(name = %config.name, "ClusterImageSet already exists"),
            Err(e) => warn!(name = %config.name, error = %e, "failed to create ClusterImageSet"),
        }
    }

    info!(created, configured = image_sets.len(), "ClusterImageSets prepopulated");
    created
}
