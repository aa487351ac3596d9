//! Cached cluster resources and the events an informer emits about them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Key identifying one cluster object: `(namespace, name)`.
pub type ResourceKey = (Option<String>, String);

/// A cluster object held in an informer's cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResource {
    /// Namespace the object lives in; `None` for cluster-scoped kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Object name.
    pub name: String,
    /// Server-assigned version, used to detect no-op updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    /// Raw object payload as delivered by the API client.
    #[serde(default)]
    pub manifest: serde_json::Value,
}

impl CachedResource {
    /// Creates a resource with no version or payload.
    pub fn new(namespace: Option<&str>, name: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
            resource_version: None,
            manifest: serde_json::Value::Null,
        }
    }

    /// Sets the resource version.
    pub fn with_resource_version(mut self, version: &str) -> Self {
        self.resource_version = Some(version.to_string());
        self
    }

    /// Sets the raw payload.
    pub fn with_manifest(mut self, manifest: serde_json::Value) -> Self {
        self.manifest = manifest;
        self
    }

    /// The `(namespace, name)` cache key.
    pub fn key(&self) -> ResourceKey {
        (self.namespace.clone(), self.name.clone())
    }
}

/// Set of cached resources for one (context, kind) pair.
///
/// Owned exclusively by its informer; external callers only ever receive
/// snapshots from [`ResourceCache::list`].
#[derive(Debug, Default)]
pub struct ResourceCache {
    entries: HashMap<ResourceKey, CachedResource>,
}

impl ResourceCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole cache with the given items (initial list).
    pub fn replace(&mut self, items: Vec<CachedResource>) {
        self.entries = items.into_iter().map(|r| (r.key(), r)).collect();
    }

    /// Inserts or replaces one resource, returning the previous entry.
    pub fn upsert(&mut self, resource: CachedResource) -> Option<CachedResource> {
        self.entries.insert(resource.key(), resource)
    }

    /// Removes one resource, returning it if it was cached.
    pub fn remove(&mut self, key: &ResourceKey) -> Option<CachedResource> {
        self.entries.remove(key)
    }

    /// Looks up one resource.
    pub fn get(&self, key: &ResourceKey) -> Option<&CachedResource> {
        self.entries.get(key)
    }

    /// Snapshot of all cached resources. Order is unspecified.
    pub fn list(&self) -> Vec<CachedResource> {
        self.entries.values().cloned().collect()
    }

    /// Number of cached resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fired whenever an informer's cache changes.
///
/// `count_changed` is `true` for changes that alter how many objects exist
/// (the initial list, deletions) and `false` for in-place updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheUpdateEvent {
    /// Context name the informer watches.
    pub context: String,
    /// Resource kind the informer watches (e.g. "pods").
    pub resource_name: String,
    /// Whether the object count changed.
    pub count_changed: bool,
}

/// Fired when the underlying watch reports a transport error.
///
/// Cleared implicitly by a successful `reconnect()`; the informer never
/// retries on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineEvent {
    /// Context name the informer watches.
    pub context: String,
    /// Resource kind the informer watches.
    pub resource_name: String,
    /// Always `true`; present so subscribers share one event shape.
    pub offline: bool,
    /// Transport error description.
    pub reason: String,
}

impl OfflineEvent {
    /// Creates an offline event for the given informer identity.
    pub fn new(context: &str, resource_name: &str, reason: &str) -> Self {
        Self {
            context: context.to_string(),
            resource_name: resource_name.to_string(),
            offline: true,
            reason: reason.to_string(),
        }
    }
}
