//! Integration tests for CRD operations
//!
//! These tests tell the story of how a client interacts with the simulated Hive
//! resources through the Kubernetes API before the reconciler does anything.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::ResourceExt;

use hive_simulator::config::ClusterImageSetConfig;
use hive_simulator::crd::{
    AccountClaim, AccountClaimSpec, ClaimStatus, ClusterDeployment, ClusterDeploymentSpec,
    ClusterImageSet, SecretReference,
};
use hive_simulator::image_sets::{
    prepopulate_image_sets, KubeImageSetCreator, CHANNEL_GROUP_LABEL,
};
use hive_simulator::retry::RetryPolicy;
use hive_simulator::{CLOUD_PROVIDER_LABEL, CORRELATION_LABEL};

use super::helpers::{cleanup, ensure_test_cluster, TEST_NAMESPACE};

// =============================================================================
// Test Fixtures
// =============================================================================

fn sample_cluster_deployment(name: &str) -> ClusterDeployment {
    ClusterDeployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            labels: Some(BTreeMap::from([
                (CORRELATION_LABEL.to_string(), format!("{name}-id")),
                (CLOUD_PROVIDER_LABEL.to_string(), "aws".to_string()),
            ])),
            ..Default::default()
        },
        spec: ClusterDeploymentSpec {
            cluster_name: name.to_string(),
            base_domain: "sim.example.com".to_string(),
            ..Default::default()
        },
        status: None,
    }
}

fn sample_account_claim(name: &str) -> AccountClaim {
    AccountClaim {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: AccountClaimSpec {
            aws_credential_secret: SecretReference {
                name: format!("{name}-aws-credentials"),
                namespace: String::new(),
            },
            ..Default::default()
        },
        status: None,
    }
}

// =============================================================================
// Resource Creation Stories
// =============================================================================

/// Story: clusters-service submits a ClusterDeployment
///
/// The resource is accepted by the CRD schema as-is, with no status and the
/// correlation labels preserved for the dependency lookup.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_client_creates_cluster_deployment() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let api: Api<ClusterDeployment> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let name = "crd-create-cd";
    cleanup(&api, name).await;

    api.create(&PostParams::default(), &sample_cluster_deployment(name))
        .await
        .expect("failed to create ClusterDeployment");

    let fetched = api.get(name).await.expect("failed to get ClusterDeployment");
    assert_eq!(fetched.spec.base_domain, "sim.example.com");
    assert!(!fetched.spec.installed);
    assert!(fetched.status.is_none());
    assert_eq!(fetched.labels()[CORRELATION_LABEL], format!("{name}-id"));

    cleanup(&api, name).await;
}

/// Story: claim status lives behind the status subresource
///
/// A merge patch of the status is visible on the next read while the spec is
/// untouched, which is what the reconciler relies on.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_claim_status_is_patched_through_subresource() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let api: Api<AccountClaim> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let name = "crd-claim-status";
    cleanup(&api, name).await;

    api.create(&PostParams::default(), &sample_account_claim(name))
        .await
        .expect("failed to create AccountClaim");

    let status = ClaimStatus {
        state: Some("Pending".to_string()),
        conditions: Vec::new(),
    };
    api.patch_status(
        name,
        &PatchParams::apply("test"),
        &Patch::Merge(&serde_json::json!({ "status": status })),
    )
    .await
    .expect("failed to patch status");

    let fetched = api.get(name).await.expect("failed to get AccountClaim");
    assert_eq!(
        fetched.status.as_ref().and_then(|s| s.state()),
        Some("Pending")
    );
    assert_eq!(
        fetched.spec.aws_credential_secret.name,
        format!("{name}-aws-credentials")
    );

    cleanup(&api, name).await;
}

// =============================================================================
// ClusterImageSet Stories
// =============================================================================

/// Story: the simulator seeds installable versions at startup
///
/// Running prepopulation twice creates each visible set once and leaves hidden
/// sets out of the cluster entirely.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_image_sets_are_prepopulated_once() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let api: Api<ClusterImageSet> = Api::all(client.clone());
    let shown = "openshift-v4.99.0-candidate";
    let hidden = "openshift-v4.98.0";
    cleanup(&api, shown).await;
    cleanup(&api, hidden).await;

    let sets = [
        ClusterImageSetConfig {
            name: shown.to_string(),
            visible: true,
        },
        ClusterImageSetConfig {
            name: hidden.to_string(),
            visible: false,
        },
    ];
    let creator = KubeImageSetCreator::new(client.clone());
    let policy = RetryPolicy::default().attempts(3);

    assert_eq!(prepopulate_image_sets(&creator, &sets, &policy).await, 1);
    assert_eq!(prepopulate_image_sets(&creator, &sets, &policy).await, 0);

    let fetched = api.get(shown).await.expect("image set should exist");
    assert_eq!(fetched.labels()[CHANNEL_GROUP_LABEL], "candidate");
    assert!(fetched.spec.release_image.ends_with(shown));
    assert!(api
        .get_opt(hidden)
        .await
        .expect("lookup should succeed")
        .is_none());

    cleanup(&api, shown).await;
}
