//! Integration tests for the simulated lifecycles
//!
//! These tests drive the reconciler by hand against a real API server. Every
//! state is configured with a zero duration so a resource advances one state
//! per reconcile call, without waiting on the controller's requeue timers.

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use kube::runtime::controller::Action;
use kube::Client;

use hive_simulator::behavior::{BehaviorEngine, ResourceOverride};
use hive_simulator::config::{FailureScenario, SimulatorConfig};
use hive_simulator::controller::{reconcile, Context, Reconciled};
use hive_simulator::crd::{
    AccountClaim, AccountClaimSpec, ClusterDeployment, ClusterDeploymentSpec, SecretReference,
};
use hive_simulator::dependency::NOT_READY_RETRY;
use hive_simulator::state_machine::{SimulatedResource, StateMachine, PROVISION_FAILED_STATE};
use hive_simulator::{CLOUD_PROVIDER_LABEL, CORRELATION_LABEL};

use super::helpers::{cleanup, ensure_test_cluster, TEST_NAMESPACE};

// =============================================================================
// Test Fixtures
// =============================================================================

/// Default lifecycles with every state lasting zero seconds
fn instant_config() -> SimulatorConfig {
    let mut config = SimulatorConfig::default();
    for kind in [
        &mut config.cluster_deployment,
        &mut config.account_claim,
        &mut config.project_claim,
    ] {
        for state in &mut kind.states {
            state.duration_seconds = 0;
        }
    }
    config
}

fn labels(correlation: &str) -> Option<BTreeMap<String, String>> {
    Some(BTreeMap::from([
        (CORRELATION_LABEL.to_string(), correlation.to_string()),
        (CLOUD_PROVIDER_LABEL.to_string(), "aws".to_string()),
    ]))
}

fn account_claim(name: &str, correlation: &str) -> AccountClaim {
    AccountClaim {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            labels: labels(correlation),
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

fn cluster_deployment(name: &str, correlation: &str) -> ClusterDeployment {
    ClusterDeployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            labels: labels(correlation),
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

fn test_context(client: Client, engine: Arc<BehaviorEngine>) -> Arc<Context> {
    Arc::new(Context::builder(client).engine(engine).build())
}

/// Reconcile `name` until it settles, returning the final resource
async fn drive<R: Reconciled>(api: &Api<R>, name: &str, ctx: &Arc<Context>) -> R {
    for _ in 0..10 {
        let current = api.get(name).await.expect("failed to get resource");
        let action = reconcile(Arc::new(current), ctx.clone())
            .await
            .expect("reconcile should succeed");
        if action == Action::await_change() {
            let settled = api.get(name).await.expect("failed to get resource");
            let machine = StateMachine::<R>::new(ctx.engine.config());
            if machine.is_settled(&settled) {
                return settled;
            }
        }
    }
    panic!("{name} did not settle within 10 reconciliations");
}

// =============================================================================
// Claim Lifecycle Stories
// =============================================================================

/// Story: an AccountClaim becomes Ready and delivers credentials
///
/// Lifecycle: (new) -> Pending -> Ready, with the AWS account ID written to
/// the spec and the credential secret created in the claim's namespace.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_account_claim_becomes_ready() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let claims: Api<AccountClaim> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let secrets: Api<Secret> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let name = "life-ac-ready";
    cleanup(&claims, name).await;
    cleanup(&secrets, &format!("{name}-aws-credentials")).await;

    claims
        .create(&PostParams::default(), &account_claim(name, "life-ac-ready-id"))
        .await
        .expect("failed to create AccountClaim");

    let ctx = test_context(client.clone(), Arc::new(BehaviorEngine::new(instant_config())));
    let ready = drive(&claims, name, &ctx).await;

    assert_eq!(ready.status.as_ref().and_then(|s| s.state()), Some("Ready"));
    assert!(!ready.spec.byoc_aws_account_id.is_empty());
    let secret = secrets
        .get(&format!("{name}-aws-credentials"))
        .await
        .expect("credential secret should exist");
    assert!(secret
        .data
        .as_ref()
        .is_some_and(|d| d.contains_key("aws_access_key_id")));

    cleanup(&claims, name).await;
    cleanup(&secrets, &format!("{name}-aws-credentials")).await;
}

// =============================================================================
// ClusterDeployment Stories
// =============================================================================

/// Story: a ClusterDeployment waits for its account before installing
///
/// Without a ready AccountClaim carrying the same correlation label the
/// deployment is requeued and left untouched. Once the claim is Ready the
/// deployment runs through to Running and is marked installed.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_cluster_waits_for_account_then_installs() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let cds: Api<ClusterDeployment> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let claims: Api<AccountClaim> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let name = "life-cd-waits";
    let correlation = "life-cd-waits-id";
    cleanup(&cds, name).await;
    cleanup(&claims, name).await;

    cds.create(&PostParams::default(), &cluster_deployment(name, correlation))
        .await
        .expect("failed to create ClusterDeployment");

    let ctx = test_context(client.clone(), Arc::new(BehaviorEngine::new(instant_config())));

    // No claim yet: the deployment is requeued without any status
    let waiting = cds.get(name).await.expect("failed to get ClusterDeployment");
    let action = reconcile(Arc::new(waiting), ctx.clone())
        .await
        .expect("reconcile should succeed");
    assert_eq!(action, Action::requeue(NOT_READY_RETRY));
    assert!(cds.get(name).await.expect("get").status.is_none());

    // The account arrives and becomes ready
    claims
        .create(&PostParams::default(), &account_claim(name, correlation))
        .await
        .expect("failed to create AccountClaim");
    drive(&claims, name, &ctx).await;

    let running = drive(&cds, name, &ctx).await;
    let status = running.status.as_ref().expect("status should be set");
    assert_eq!(status.simulator_state.as_deref(), Some("Running"));
    assert!(running.spec.installed);
    assert_eq!(
        status.web_console_url.as_deref(),
        Some("https://console-openshift-console.apps.life-cd-waits.sim.example.com")
    );
    assert!(running
        .spec
        .cluster_metadata
        .as_ref()
        .is_some_and(|m| !m.infra_id.is_empty()));

    cleanup(&cds, name).await;
    cleanup(&claims, name).await;
}

/// Story: a tester forces one deployment to fail through an override
///
/// The forced failure is recorded on the resource and the deployment stays
/// failed on later reconciliations.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_forced_failure_sticks() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let cds: Api<ClusterDeployment> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let name = "life-cd-fails";
    cleanup(&cds, name).await;

    let mut cd = cluster_deployment(name, "life-cd-fails-id");
    cd.metadata.labels = None;
    cds.create(&PostParams::default(), &cd)
        .await
        .expect("failed to create ClusterDeployment");

    let engine = Arc::new(BehaviorEngine::new(instant_config()));
    let fetched = cds.get(name).await.expect("get");
    engine.set_override(
        fetched.resource_key(),
        ResourceOverride::failure(FailureScenario::new(
            1.0,
            "ProvisionFailed",
            "InstallerFailed",
            "installer pod failed",
        )),
    );
    let ctx = test_context(client.clone(), engine);

    let failed = drive(&cds, name, &ctx).await;
    let machine = StateMachine::<ClusterDeployment>::new(ctx.engine.config());
    assert_eq!(
        machine.current_state(&failed).as_deref(),
        Some(PROVISION_FAILED_STATE)
    );
    let conditions = &failed.status.as_ref().expect("status").conditions;
    assert!(conditions
        .iter()
        .any(|c| c.type_ == "ProvisionFailed" && c.reason == "InstallerFailed"));

    let again = reconcile(Arc::new(failed), ctx.clone())
        .await
        .expect("reconcile should succeed");
    assert_eq!(again, Action::await_change());

    cleanup(&cds, name).await;
}
