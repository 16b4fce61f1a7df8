//! Hive simulator - drives Hive resources through simulated lifecycles

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use futures::StreamExt;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Patch, PatchParams};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, CustomResourceExt, ResourceExt};

use hive_simulator::api::{api_router, ApiState};
use hive_simulator::behavior::BehaviorEngine;
use hive_simulator::config::{load_from_file, SimulatorConfig};
use hive_simulator::controller::{
    error_policy, reconcile, Context, Reconciled, ResourceTracker, FIELD_MANAGER,
};
use hive_simulator::crd::{AccountClaim, ClusterDeployment, ClusterImageSet, ProjectClaim};
use hive_simulator::image_sets::{prepopulate_image_sets, KubeImageSetCreator};
use hive_simulator::retry::{retry, RetryPolicy};
use hive_simulator::telemetry::{init_telemetry, LogFormat, TelemetryConfig};
use hive_simulator::{ResourceKind, DEFAULT_API_PORT};

/// Hive simulator - a test double for the Hive control plane
#[derive(Parser, Debug)]
#[command(name = "hive-simulator", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    /// Path to the simulator configuration file (YAML)
    #[arg(long, env = "HIVE_SIM_CONFIG")]
    config: Option<PathBuf>,

    /// Port of the configuration API
    #[arg(long, env = "HIVE_SIM_API_PORT", default_value_t = DEFAULT_API_PORT)]
    api_port: u16,

    /// Log level for the simulator when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Do not create ClusterImageSets at startup
    #[arg(long)]
    skip_image_sets: bool,
}

fn all_crds() -> Vec<CustomResourceDefinition> {
    vec![
        ClusterDeployment::crd(),
        AccountClaim::crd(),
        ProjectClaim::crd(),
        ClusterImageSet::crd(),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        let docs = all_crds()
            .iter()
            .map(serde_yaml::to_string)
            .collect::<Result<Vec<_>, _>>()
            .context("failed to serialize CRDs")?;
        println!("{}", docs.join("---\n"));
        return Ok(());
    }

    init_telemetry(TelemetryConfig {
        level: cli.log_level.clone(),
        format: cli.log_format,
    })?;

    let config = load_from_file(cli.config.as_deref()).context("failed to load configuration")?;
    log_configuration(&config);
    run(cli, config).await
}

fn log_configuration(config: &SimulatorConfig) {
    for kind in ResourceKind::ALL {
        let kind_config = config.kind(kind);
        tracing::info!(
            %kind,
            states = kind_config.states.len(),
            failure_scenarios = kind_config.failure_scenarios.len(),
            total_secs = kind_config.total_duration().as_secs(),
            "lifecycle configured"
        );
    }
}

/// Install or update the simulator's CRDs using server-side apply
async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    for crd in all_crds() {
        let name = crd.name_any();
        let patch = Patch::Apply(&crd);
        tracing::info!(crd = %name, "installing CRD");
        retry(&RetryPolicy::startup(), "install CRD", || {
            crds.patch(&name, &params, &patch)
        })
        .await
        .with_context(|| format!("failed to install CRD {name}"))?;
    }

    tracing::info!("all CRDs installed/updated");
    Ok(())
}

/// Run the controller for one simulated kind until shutdown
async fn run_controller<R: Reconciled>(client: Client, ctx: Arc<Context>) {
    let api: Api<R> = Api::all(client);
    Controller::new(api, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile::<R>, error_policy::<R>, ctx)
        .for_each(|result| async move {
            match result {
                Ok(action) => {
                    tracing::debug!(kind = %R::KIND, ?action, "reconciliation completed");
                }
                Err(e) => {
                    tracing::error!(kind = %R::KIND, error = ?e, "reconciliation error");
                }
            }
        })
        .await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}

async fn run(cli: Cli, config: SimulatorConfig) -> anyhow::Result<()> {
    tracing::info!("Hive simulator starting...");

    let client = Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;

    ensure_crds_installed(&client).await?;

    if cli.skip_image_sets {
        tracing::info!("skipping ClusterImageSet prepopulation");
    } else {
        let creator = KubeImageSetCreator::new(client.clone());
        prepopulate_image_sets(&creator, &config.cluster_image_sets, &RetryPolicy::startup()).await;
    }

    let engine = Arc::new(BehaviorEngine::new(config));
    let tracker = Arc::new(ResourceTracker::new());
    let ctx = Arc::new(
        Context::builder(client.clone())
            .engine(engine.clone())
            .tracker(tracker.clone())
            .build(),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.api_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind configuration API to {addr}"))?;
    let router = api_router(Arc::new(ApiState::new(engine, tracker)));
    tracing::info!(%addr, "configuration API listening");
    let api_server = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal());

    tracing::info!("Starting simulator controllers...");
    tracing::info!("  - ClusterDeployment controller");
    tracing::info!("  - AccountClaim controller");
    tracing::info!("  - ProjectClaim controller");

    tokio::select! {
        _ = run_controller::<ClusterDeployment>(client.clone(), ctx.clone()) => {
            tracing::info!("ClusterDeployment controller completed");
        }
        _ = run_controller::<AccountClaim>(client.clone(), ctx.clone()) => {
            tracing::info!("AccountClaim controller completed");
        }
        _ = run_controller::<ProjectClaim>(client, ctx) => {
            tracing::info!("ProjectClaim controller completed");
        }
        result = api_server => {
            result.context("configuration API failed")?;
            tracing::info!("configuration API stopped");
        }
    }

    tracing::info!("Hive simulator shutting down");
    Ok(())
}
