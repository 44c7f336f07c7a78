use hub_of_hubs_spec_sync_apis::{ClusterDeployment, Config, KlusterletAddonConfig, MachinePool};
use kube::CustomResourceExt;

pub fn main() {
    for crd in [
        Config::crd(),
        ClusterDeployment::crd(),
        MachinePool::crd(),
        KlusterletAddonConfig::crd(),
    ] {
        println!("---\n{}", serde_yaml::to_string(&crd).unwrap());
    }
}
