//! Cluster context identity.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Already-resolved connection details for one cluster, pinned to a context.
///
/// Kubeconfig parsing and authentication happen outside this crate; by the
/// time a `ClusterConfig` exists it is ready to hand to an API-client
/// capability as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    /// API server URL.
    pub server: String,
    /// Default namespace for the context, if the kubeconfig sets one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// User entry name the context is bound to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ClusterConfig {
    /// Creates a config pointing at the given API server.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            namespace: None,
            user: None,
        }
    }

    /// Sets the context's default namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the user entry the context is bound to.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// One cluster context drawn from a larger kubeconfig.
///
/// Immutable after construction. Equality and hashing go by context name
/// only: the name is the stable comparison key used to index informers,
/// permission checkers and forward services, and is never compared
/// structurally against cluster or user objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterContext {
    name: String,
    cluster: ClusterConfig,
}

impl ClusterContext {
    /// Creates a context identity.
    pub fn new(name: impl Into<String>, cluster: ClusterConfig) -> Self {
        Self {
            name: name.into(),
            cluster,
        }
    }

    /// The context name; the unit of isolation for everything in this crate.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pinned cluster configuration.
    pub fn cluster(&self) -> &ClusterConfig {
        &self.cluster
    }
}

impl PartialEq for ClusterContext {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ClusterContext {}

impl Hash for ClusterContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for ClusterContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_equality_goes_by_name_only() {
        let a = ClusterContext::new("prod", ClusterConfig::new("https://one.example:6443"));
        let b = ClusterContext::new("prod", ClusterConfig::new("https://two.example:6443"));
        let c = ClusterContext::new("staging", ClusterConfig::new("https://one.example:6443"));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_usable_as_map_key() {
        let mut map = HashMap::new();
        let ctx = ClusterContext::new(
            "dev",
            ClusterConfig::new("https://dev.example:6443").with_namespace("default"),
        );
        map.insert(ctx.clone(), 1);

        let same_name = ClusterContext::new("dev", ClusterConfig::new("https://other:6443"));
        assert_eq!(map.get(&same_name), Some(&1));
    }
}
