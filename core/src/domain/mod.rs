//! Domain layer - Pure data models.
//!
//! This module contains the entities shared by the informer, permission
//! and port-forward components. These types have no I/O dependencies and
//! can be tested in isolation.

mod context;
mod forward;
mod permissions;
mod resource;

// Re-export all domain types
pub use context::{ClusterConfig, ClusterContext};
pub use forward::{ForwardConfig, ForwardKind, ForwardRequest, PortMapping, UserForwardConfig};
pub use permissions::{
    AccessReviewStatus, ContextResourcePermission, PermissionAttrs, PermissionRequest,
    PermissionResult, WILDCARD,
};
pub use resource::{CacheUpdateEvent, CachedResource, OfflineEvent, ResourceCache, ResourceKey};
