use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The hub-of-hubs API Group, also used as prefix for annotations and finalizers.
pub const API_GROUP: &'static str = "hub-of-hubs.open-cluster-management.io";

/// The Hive API Group owning `ClusterDeployment` and `MachinePool`.
pub const HIVE_API_GROUP: &'static str = "hive.openshift.io";

/// The klusterlet addon API Group owning `KlusterletAddonConfig`.
pub const AGENT_API_GROUP: &'static str = "agent.open-cluster-management.io";

/// How much of the managed clusters' state the hub-of-hubs aggregates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum AggregationLevel {
    /// Aggregate everything, including per-cluster compliance details.
    #[serde(rename = "full")]
    Full,
    /// Aggregate only summarized (counted) state.
    #[serde(rename = "minimal")]
    Minimal,
}

/// Hub-of-hubs tenant configuration, a singleton per hub-of-hubs system
/// namespace.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "hub-of-hubs.open-cluster-management.io",
    version = "v1",
    kind = "Config",
    derive = "PartialEq",
    status = "ConfigStatus",
    namespaced
)]
pub struct ConfigSpec {
    /// The level of aggregation performed by the hub-of-hubs status transport.
    #[serde(rename = "aggregationLevel")]
    pub aggregation_level: AggregationLevel,
    /// Whether policies created on leaf hubs are aggregated as well.
    #[serde(rename = "enableLocalPolicies")]
    pub enable_local_policies: bool,
}

/// Status of a [`Config`], owned by the status transport and never persisted
/// by the spec syncer.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ConfigStatus {
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Reference to a named object in the same namespace.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct LocalObjectReference {
    pub name: String,
}

/// A request to provision an OpenShift cluster, as defined by Hive.
///
/// Only the fields the hub-of-hubs tooling interprets are modelled as typed
/// fields. All remaining spec fields are captured in `extra` so that the
/// persisted payload is a lossless snapshot of the desired state.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "hive.openshift.io",
    version = "v1",
    kind = "ClusterDeployment",
    derive = "PartialEq",
    status = "ClusterDeploymentStatus",
    namespaced
)]
pub struct ClusterDeploymentSpec {
    /// The friendly name of the cluster, used in external references (DNS, ...).
    #[serde(rename = "clusterName")]
    pub cluster_name: String,
    /// The base DNS domain the cluster's ingress is rooted under.
    #[serde(rename = "baseDomain")]
    pub base_domain: String,
    /// Cloud platform specific provisioning configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<serde_json::Value>,
    /// Reference to the pull secret used during provisioning.
    #[serde(rename = "pullSecretRef", skip_serializing_if = "Option::is_none")]
    pub pull_secret_ref: Option<LocalObjectReference>,
    /// Whether installation of this cluster already completed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub installed: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ClusterDeploymentStatus {
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A pool of worker machines belonging to a [`ClusterDeployment`], as defined
/// by Hive.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "hive.openshift.io",
    version = "v1",
    kind = "MachinePool",
    derive = "PartialEq",
    status = "MachinePoolStatus",
    namespaced
)]
pub struct MachinePoolSpec {
    /// The cluster this pool belongs to.
    #[serde(rename = "clusterDeploymentRef")]
    pub cluster_deployment_ref: LocalObjectReference,
    /// The short name of the pool, unique within its cluster.
    pub name: String,
    /// The desired number of machines, absent if autoscaling is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i64>,
    /// Cloud platform specific machine configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct MachinePoolStatus {
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Enablement toggle for a single klusterlet addon agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct KlusterletAddonAgentConfig {
    pub enabled: bool,
}

/// Per managed-cluster configuration of the klusterlet addon agents.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "agent.open-cluster-management.io",
    version = "v1",
    kind = "KlusterletAddonConfig",
    derive = "PartialEq",
    status = "KlusterletAddonConfigStatus",
    namespaced
)]
pub struct KlusterletAddonConfigSpec {
    /// The name of the managed cluster the addons are installed on.
    #[serde(rename = "clusterName")]
    pub cluster_name: String,
    /// The namespace on the hub holding the managed cluster's resources.
    #[serde(rename = "clusterNamespace")]
    pub cluster_namespace: String,
    /// Labels applied to the managed cluster.
    #[serde(
        rename = "clusterLabels",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub cluster_labels: BTreeMap<String, String>,
    #[serde(rename = "applicationManager", default)]
    pub application_manager: KlusterletAddonAgentConfig,
    #[serde(rename = "policyController", default)]
    pub policy_controller: KlusterletAddonAgentConfig,
    #[serde(rename = "searchCollector", default)]
    pub search_collector: KlusterletAddonAgentConfig,
    #[serde(rename = "certPolicyController", default)]
    pub cert_policy_controller: KlusterletAddonAgentConfig,
    #[serde(rename = "iamPolicyController", default)]
    pub iam_policy_controller: KlusterletAddonAgentConfig,
    /// The addon agent version to deploy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct KlusterletAddonConfigStatus {
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}
