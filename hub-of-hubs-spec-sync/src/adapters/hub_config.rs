use hub_of_hubs_spec_sync_apis::Config;
use kube::ResourceExt;

use crate::{
    adapters::{HOH_SYSTEM_NAMESPACE, ResourceAdapter},
    namespace_scope::NamespaceScope,
};

/// Syncs the hub-of-hubs `Config` singleton into the `configs` table.
pub(crate) struct ConfigAdapter {
    scope: NamespaceScope,
}

impl ConfigAdapter {
    pub fn new() -> Self {
        Self {
            scope: NamespaceScope::single(HOH_SYSTEM_NAMESPACE),
        }
    }
}

impl ResourceAdapter for ConfigAdapter {
    type Object = Config;

    fn table_name(&self) -> &'static str {
        "configs"
    }

    fn finalizer_name(&self) -> &'static str {
        "hub-of-hubs.open-cluster-management.io/hoh-config-cleanup"
    }

    fn scope(&self) -> &NamespaceScope {
        &self.scope
    }

    fn clean_status(&self, instance: &mut Config) {
        instance.status = None;
    }

    /// Annotations carry tenant overrides for the `Config` kind, so they are
    /// part of the comparison contract next to the spec itself.
    fn are_equal(&self, left: &Config, right: &Config) -> bool {
        left.annotations() == right.annotations() && left.spec == right.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_of_hubs_spec_sync_apis::{AggregationLevel, ConfigSpec};

    fn config(level: AggregationLevel) -> Config {
        Config::new(
            "hub-of-hubs-config",
            ConfigSpec {
                aggregation_level: level,
                enable_local_policies: false,
            },
        )
    }

    #[test]
    fn equality_tracks_spec_and_annotations() {
        let adapter = ConfigAdapter::new();
        let a = config(AggregationLevel::Full);
        let b = config(AggregationLevel::Full);
        assert!(adapter.are_equal(&a, &b));
        assert!(!adapter.are_equal(&a, &config(AggregationLevel::Minimal)));
        let mut c = config(AggregationLevel::Full);
        c.annotations_mut()
            .insert("hub-of-hubs.open-cluster-management.io/origin".to_string(), "cli".to_string());
        assert!(!adapter.are_equal(&a, &c));
    }

    #[test]
    fn equality_ignores_labels_and_other_metadata() {
        let adapter = ConfigAdapter::new();
        let a = config(AggregationLevel::Full);
        let mut b = config(AggregationLevel::Full);
        b.labels_mut().insert("team".to_string(), "clc".to_string());
        b.metadata.generation = Some(7);
        assert!(adapter.are_equal(&a, &b));
    }
}
