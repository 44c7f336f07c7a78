use hub_of_hubs_spec_sync_apis::ClusterDeployment;

use crate::{
    adapters::{HOH_CLC_NAMESPACE, ResourceAdapter},
    namespace_scope::NamespaceScope,
};

/// Syncs Hive `ClusterDeployment` objects into the `clusterdeployments` table.
pub(crate) struct ClusterDeploymentAdapter {
    scope: NamespaceScope,
}

impl ClusterDeploymentAdapter {
    pub fn new() -> Self {
        Self {
            scope: NamespaceScope::single(HOH_CLC_NAMESPACE),
        }
    }
}

impl ResourceAdapter for ClusterDeploymentAdapter {
    type Object = ClusterDeployment;

    fn table_name(&self) -> &'static str {
        "clusterdeployments"
    }

    fn finalizer_name(&self) -> &'static str {
        "hub-of-hubs.open-cluster-management.io/clusterdeployment-cleanup"
    }

    fn scope(&self) -> &NamespaceScope {
        &self.scope
    }

    fn clean_status(&self, instance: &mut ClusterDeployment) {
        instance.status = None;
    }

    fn are_equal(&self, left: &ClusterDeployment, right: &ClusterDeployment) -> bool {
        left.spec == right.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_of_hubs_spec_sync_apis::{ClusterDeploymentSpec, ClusterDeploymentStatus};

    fn cluster_deployment(base_domain: &str) -> ClusterDeployment {
        ClusterDeployment::new(
            "prod",
            ClusterDeploymentSpec {
                cluster_name: "prod".to_string(),
                base_domain: base_domain.to_string(),
                platform: None,
                pull_secret_ref: None,
                installed: false,
                extra: Default::default(),
            },
        )
    }

    #[test]
    fn equality_tracks_the_spec() {
        let adapter = ClusterDeploymentAdapter::new();
        let a = cluster_deployment("example.com");
        let b = cluster_deployment("example.com");
        assert!(adapter.are_equal(&a, &b));
        let c = cluster_deployment("example.org");
        assert!(!adapter.are_equal(&a, &c));
    }

    #[test]
    fn equality_ignores_the_status() {
        let adapter = ClusterDeploymentAdapter::new();
        let a = cluster_deployment("example.com");
        let mut b = cluster_deployment("example.com");
        b.status = Some(ClusterDeploymentStatus::default());
        assert!(adapter.are_equal(&a, &b));
    }

    #[test]
    fn clean_status_strips_only_the_status() {
        let adapter = ClusterDeploymentAdapter::new();
        let mut instance = cluster_deployment("example.com");
        instance.status = Some(ClusterDeploymentStatus::default());
        adapter.clean_status(&mut instance);
        assert!(instance.status.is_none());
        assert_eq!(instance.spec.base_domain, "example.com");
    }
}
