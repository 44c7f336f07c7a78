use hub_of_hubs_spec_sync_apis::MachinePool;

use crate::{
    adapters::{HOH_CLC_NAMESPACE, ResourceAdapter},
    namespace_scope::NamespaceScope,
};

/// Syncs Hive `MachinePool` objects into the `machinepools` table.
pub(crate) struct MachinePoolAdapter {
    scope: NamespaceScope,
}

impl MachinePoolAdapter {
    pub fn new() -> Self {
        Self {
            scope: NamespaceScope::single(HOH_CLC_NAMESPACE),
        }
    }
}

impl ResourceAdapter for MachinePoolAdapter {
    type Object = MachinePool;

    fn table_name(&self) -> &'static str {
        "machinepools"
    }

    fn finalizer_name(&self) -> &'static str {
        "hub-of-hubs.open-cluster-management.io/machinepool-cleanup"
    }

    fn scope(&self) -> &NamespaceScope {
        &self.scope
    }

    fn clean_status(&self, instance: &mut MachinePool) {
        instance.status = None;
    }

    fn are_equal(&self, left: &MachinePool, right: &MachinePool) -> bool {
        left.spec == right.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_of_hubs_spec_sync_apis::{LocalObjectReference, MachinePoolSpec};

    fn machine_pool(replicas: i64) -> MachinePool {
        MachinePool::new(
            "prod-worker",
            MachinePoolSpec {
                cluster_deployment_ref: LocalObjectReference {
                    name: "prod".to_string(),
                },
                name: "worker".to_string(),
                replicas: Some(replicas),
                platform: None,
                extra: Default::default(),
            },
        )
    }

    #[test]
    fn replica_change_is_a_spec_change() {
        let adapter = MachinePoolAdapter::new();
        assert!(adapter.are_equal(&machine_pool(3), &machine_pool(3)));
        assert!(!adapter.are_equal(&machine_pool(3), &machine_pool(5)));
    }
}
