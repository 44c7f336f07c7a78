use k8s_openapi::api::core::v1::Secret;

use crate::{
    adapters::{HOH_CLC_NAMESPACE, ResourceAdapter},
    namespace_scope::NamespaceScope,
};

/// Syncs cluster-lifecycle credential `Secret`s into the `secrets` table.
pub(crate) struct SecretAdapter {
    scope: NamespaceScope,
}

impl SecretAdapter {
    pub fn new() -> Self {
        Self {
            scope: NamespaceScope::single(HOH_CLC_NAMESPACE),
        }
    }
}

impl ResourceAdapter for SecretAdapter {
    type Object = Secret;

    fn table_name(&self) -> &'static str {
        "secrets"
    }

    fn finalizer_name(&self) -> &'static str {
        "hub-of-hubs.open-cluster-management.io/secret-cleanup"
    }

    fn scope(&self) -> &NamespaceScope {
        &self.scope
    }

    /// `Secret` has no status subresource, there is nothing to strip.
    fn clean_status(&self, _instance: &mut Secret) {}

    /// Only `data` and `stringData` matter, the provisioning process reads
    /// nothing else from these secrets.
    fn are_equal(&self, left: &Secret, right: &Secret) -> bool {
        left.data == right.data && left.string_data == right.string_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    fn secret(token: &[u8]) -> Secret {
        let mut data = BTreeMap::new();
        data.insert("token".to_string(), ByteString(token.to_vec()));
        Secret {
            data: Some(data),
            ..Default::default()
        }
    }

    #[test]
    fn equality_tracks_data() {
        let adapter = SecretAdapter::new();
        assert!(adapter.are_equal(&secret(b"aws"), &secret(b"aws")));
        assert!(!adapter.are_equal(&secret(b"aws"), &secret(b"gcp")));
    }

    #[test]
    fn equality_ignores_type_and_metadata() {
        let adapter = SecretAdapter::new();
        let a = secret(b"aws");
        let mut b = secret(b"aws");
        b.type_ = Some("Opaque".to_string());
        b.metadata.resource_version = Some("17".to_string());
        assert!(adapter.are_equal(&a, &b));
    }
}
