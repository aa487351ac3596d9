//! KubeBridge Core Library
//!
//! Cluster-state watching, permission resolution, and port-forward
//! orchestration for desktop tooling that operates Kubernetes engines.
//! Provides functionality to:
//! - Watch one resource kind per context and keep a live local cache
//! - Resolve wildcard access reviews into per-resource verdicts
//! - Orchestrate local-to-cluster port-forward sessions, one service per
//!   context
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure data models (contexts, cached resources, permissions,
//!   forward configurations)
//! - `ports`: Trait definitions for the external capabilities consumed
//!   (list-watch streams, access reviews, tunnel transport, config storage)
//! - `adapters`: Implementations shipped with the crate (JSON-file store)
//! - `informer`, `permissions`, `forward`: The components built on top
//!
//! The crate owns no network transport of its own. Kubeconfig parsing and
//! authentication happen outside; every component receives an immutable
//! [`domain::ClusterContext`] pinned to one cluster context, which is the
//! unit of isolation throughout.

// Hexagonal architecture layers
pub mod adapters;
pub mod domain;
pub mod ports;

// Components
pub mod forward;
pub mod informer;
pub mod permissions;

// Shared primitives
pub mod error;
pub mod events;

// Re-export domain types (primary API)
pub use domain::{
    CacheUpdateEvent, CachedResource, ClusterConfig, ClusterContext, ContextResourcePermission,
    ForwardConfig, ForwardKind, ForwardRequest, OfflineEvent, PermissionAttrs, PermissionRequest,
    PermissionResult, PortMapping, UserForwardConfig,
};

// Re-export other commonly used types
pub use adapters::FileForwardStore;
pub use error::{Error, Result};
pub use events::{Disposable, EventEmitter, Subscription};
pub use forward::{
    ForwardSessionHandle, KubernetesPortForwardService, KubernetesPortForwardServiceProvider,
};
pub use informer::ResourceInformer;
pub use permissions::{CheckerState, ContextPermissionsChecker};
