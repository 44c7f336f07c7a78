use hub_of_hubs_spec_sync_apis::KlusterletAddonConfig;

use crate::{
    adapters::{HOH_CLC_NAMESPACE, ResourceAdapter},
    namespace_scope::NamespaceScope,
};

/// Syncs `KlusterletAddonConfig` objects into the `klusterletaddonconfigs`
/// table.
pub(crate) struct KlusterletAddonConfigAdapter {
    scope: NamespaceScope,
}

impl KlusterletAddonConfigAdapter {
    pub fn new() -> Self {
        Self {
            scope: NamespaceScope::single(HOH_CLC_NAMESPACE),
        }
    }
}

impl ResourceAdapter for KlusterletAddonConfigAdapter {
    type Object = KlusterletAddonConfig;

    fn table_name(&self) -> &'static str {
        "klusterletaddonconfigs"
    }

    fn finalizer_name(&self) -> &'static str {
        "hub-of-hubs.open-cluster-management.io/klusterletaddonconfig-cleanup"
    }

    fn scope(&self) -> &NamespaceScope {
        &self.scope
    }

    fn clean_status(&self, instance: &mut KlusterletAddonConfig) {
        instance.status = None;
    }

    fn are_equal(&self, left: &KlusterletAddonConfig, right: &KlusterletAddonConfig) -> bool {
        left.spec == right.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_of_hubs_spec_sync_apis::KlusterletAddonConfigSpec;

    fn addon_config(policy_controller: bool) -> KlusterletAddonConfig {
        let mut spec = KlusterletAddonConfigSpec {
            cluster_name: "leaf-hub-1".to_string(),
            cluster_namespace: "leaf-hub-1".to_string(),
            cluster_labels: Default::default(),
            application_manager: Default::default(),
            policy_controller: Default::default(),
            search_collector: Default::default(),
            cert_policy_controller: Default::default(),
            iam_policy_controller: Default::default(),
            version: None,
            extra: Default::default(),
        };
        spec.policy_controller.enabled = policy_controller;
        KlusterletAddonConfig::new("leaf-hub-1", spec)
    }

    #[test]
    fn agent_toggle_is_a_spec_change() {
        let adapter = KlusterletAddonConfigAdapter::new();
        assert!(adapter.are_equal(&addon_config(true), &addon_config(true)));
        assert!(!adapter.are_equal(&addon_config(true), &addon_config(false)));
    }
}
