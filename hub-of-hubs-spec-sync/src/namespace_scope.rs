use std::collections::HashSet;

/// The set of namespaces a syncer is restricted to.
///
/// Evaluated before any control-plane read: scopes covering exactly one
/// namespace are turned into a namespaced watch (server side filtering),
/// larger scopes fall back to a cluster wide watch guarded by [`contains`].
///
/// [`contains`]: NamespaceScope::contains
#[derive(Clone, Debug)]
pub(crate) struct NamespaceScope {
    namespaces: HashSet<String>,
}

impl NamespaceScope {
    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespaces: namespaces.into_iter().map(|v| v.into()).collect(),
        }
    }

    pub fn single(namespace: &str) -> Self {
        Self::new([namespace])
    }

    /// Pure predicate deciding whether an object in `namespace` is in scope.
    pub fn contains(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }

    /// The namespace to restrict the watch to, if the scope covers exactly one.
    pub fn exactly_one(&self) -> Option<&str> {
        let mut iter = self.namespaces.iter();
        match (iter.next(), iter.next()) {
            (Some(ns), None) => Some(ns.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Display for NamespaceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut namespaces: Vec<&str> = self.namespaces.iter().map(|v| v.as_str()).collect();
        namespaces.sort();
        write!(f, "{}", namespaces.join(","))
    }
}
