use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::{Serialize, de::DeserializeOwned};
use sqlx::PgPool;

use crate::{Configuration, namespace_scope::NamespaceScope, spec_sync_controller::SpecSyncController};

mod cluster_deployment;
mod hub_config;
mod klusterlet_addon_config;
mod machine_pool;
mod secret;

pub(crate) use cluster_deployment::ClusterDeploymentAdapter;
pub(crate) use hub_config::ConfigAdapter;
pub(crate) use klusterlet_addon_config::KlusterletAddonConfigAdapter;
pub(crate) use machine_pool::MachinePoolAdapter;
pub(crate) use secret::SecretAdapter;

/// The namespace holding the hub-of-hubs tenant configuration.
pub(crate) const HOH_SYSTEM_NAMESPACE: &'static str = "hoh-system";

/// The namespace holding the cluster-lifecycle objects (cluster deployment
/// requests, machine pools, addon configurations and credential secrets).
pub(crate) const HOH_CLC_NAMESPACE: &'static str = "hoh-system-clc";

/// Kind specific knowledge consumed by the generic [`SpecSyncController`].
///
/// An adapter is pure configuration: which object type to watch (the
/// associated type replaces the factory plus runtime type-cast the protocol
/// would otherwise need, kind mismatches are unrepresentable), which table
/// and finalizer to use, which namespaces are in scope, how to strip status
/// and how to compare two snapshots.
pub(crate) trait ResourceAdapter: Send + Sync + 'static {
    type Object: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + std::fmt::Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    fn table_name(&self) -> &'static str;

    /// The finalizer owned by this adapter's syncer, unique per adapter.
    /// Renaming it is a breaking change: objects carrying the old name would
    /// be stuck in deletion until the old finalizer is removed manually.
    fn finalizer_name(&self) -> &'static str;

    fn scope(&self) -> &NamespaceScope;

    /// Zeroes the status subtree of `instance`, leaving spec and metadata
    /// untouched. The syncer only ever persists status-stripped snapshots.
    fn clean_status(&self, instance: &mut Self::Object);

    /// Structural comparison restricted to the spec and any semantically
    /// relevant metadata of this kind. Must be reflexive and symmetric and
    /// must ignore everything outside its stated contract.
    fn are_equal(&self, left: &Self::Object, right: &Self::Object) -> bool;
}

/// Wires up one [`SpecSyncController`] per adapter and runs them to
/// completion (which is never, short of process shutdown).
pub(crate) async fn run_syncers(configuration: Configuration, pool: PgPool) {
    let cluster_deployments = SpecSyncController::new(
        ClusterDeploymentAdapter::new(),
        configuration.clone(),
        pool.clone(),
    )
    .start();
    let machine_pools =
        SpecSyncController::new(MachinePoolAdapter::new(), configuration.clone(), pool.clone())
            .start();
    let klusterlet_addon_configs = SpecSyncController::new(
        KlusterletAddonConfigAdapter::new(),
        configuration.clone(),
        pool.clone(),
    )
    .start();
    let configs =
        SpecSyncController::new(ConfigAdapter::new(), configuration.clone(), pool.clone()).start();
    let secrets = SpecSyncController::new(SecretAdapter::new(), configuration, pool).start();
    futures::join!(
        cluster_deployments,
        machine_pools,
        klusterlet_addon_configs,
        configs,
        secrets,
    );
}
