#[macro_use]
extern crate log;

use kube::Client;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus_exporter::start_prometheus_metrics_server;
use sqlx::PgPool;
use std::collections::HashSet;

mod adapters;
mod db;
mod errors;
mod finalizers;
mod namespace_scope;
mod prometheus_exporter;
mod spec_sync_controller;

/// The K8s field manager name.
const MANAGER: &'static str = "hub-of-hubs-spec-sync";

/// Runtime configuration shared by all spec syncers.
///
/// All reconcile state lives in the control plane and the database; this
/// context object replaces any process-wide mutable singletons.
#[derive(Clone)]
pub(crate) struct Configuration {
    pub client: Client,
    /// Namespaces this process watches at all. `None` means unrestricted,
    /// the per-adapter [`NamespaceScope`](namespace_scope::NamespaceScope)
    /// still applies on top.
    watch_namespaces: Option<HashSet<String>>,
    /// The namespace the controller itself runs in. Leader election is
    /// scoped to it by the deployment; recorded here for diagnostics.
    pub leader_election_namespace: String,
}

impl Configuration {
    pub fn new(client: Client) -> anyhow::Result<Self> {
        fn normalize(hs: HashSet<String>) -> Option<HashSet<String>> {
            if hs.is_empty() || hs.contains("*") || hs.contains("") {
                None
            } else {
                Some(hs)
            }
        }
        let watch_namespaces =
            normalize(required_env("WATCH_NAMESPACE")?.split(",").map(|v| v.trim().to_string()).collect());
        let leader_election_namespace = required_env("POD_NAMESPACE")?;
        if let Some(namespaces) = &watch_namespaces {
            let namespaces: Vec<&str> = namespaces.iter().map(|v| v.as_str()).collect();
            info!("Controller is watching namespaces: {}", namespaces.join(","));
        } else {
            info!("Controller is watching all namespaces");
        }
        Ok(Configuration {
            client,
            watch_namespaces,
            leader_election_namespace,
        })
    }

    /// Whether `namespace` is within the process wide watch scope.
    pub fn watches(&self, namespace: &str) -> bool {
        self.watch_namespaces
            .as_ref()
            .map_or(true, |v| v.contains(namespace))
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_env(name: &str) -> anyhow::Result<String> {
    env_var(name)
        .ok_or_else(|| anyhow::anyhow!("required environment variable {} is not set", name))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install the rustls ring crypto provider"))?;
    let metrics_addr = env_var("METRICS_LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0".to_string());
    let metrics_port = env_var("METRICS_LISTEN_PORT").unwrap_or_else(|| "9000".to_string());
    let metrics_addr = format!("{}:{}", metrics_addr, metrics_port).parse()?;
    let registry = prometheus::Registry::new();
    let prometheus_metrics_exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;
    let provider = SdkMeterProvider::builder()
        .with_reader(prometheus_metrics_exporter)
        .build();
    opentelemetry::global::set_meter_provider(provider);
    let prometheus_metrics_exporter = start_prometheus_metrics_server(metrics_addr, registry);
    let database_url = required_env("DATABASE_URL")?;
    let pool = PgPool::connect(database_url.as_str()).await?;
    let client = Client::try_default().await?;
    let configuration = Configuration::new(client)?;
    info!(
        "controller namespace (leader election scope): {}",
        configuration.leader_election_namespace
    );
    let syncers = adapters::run_syncers(configuration, pool);
    info!("start controllers ...");
    tokio::select! {
       _ = syncers => (),
       result = prometheus_metrics_exporter => result?,
    };
    Ok(())
}
