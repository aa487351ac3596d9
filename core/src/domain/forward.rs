//! Port-forward configuration models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One local-port to remote-port pair within a forward configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    /// Local TCP port to listen on.
    pub local_port: u16,
    /// Port inside the cluster workload to tunnel to.
    pub remote_port: u16,
}

impl PortMapping {
    /// Creates a mapping.
    pub fn new(local_port: u16, remote_port: u16) -> Self {
        Self {
            local_port,
            remote_port,
        }
    }
}

impl std::fmt::Display for PortMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.local_port, self.remote_port)
    }
}

/// Workload kinds a forward can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForwardKind {
    Pod,
    Deployment,
    Service,
}

impl ForwardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pod => "pod",
            Self::Deployment => "deployment",
            Self::Service => "service",
        }
    }
}

/// A named set of port mappings onto one cluster workload.
///
/// `id` is generated once at creation and is the durable identity used for
/// persistence and session lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardConfig {
    pub id: Uuid,
    /// Target workload name.
    pub name: String,
    /// Namespace the workload lives in.
    pub namespace: String,
    /// Target workload kind.
    pub kind: ForwardKind,
    /// Port mappings; a workload may expose several ports.
    pub forwards: Vec<PortMapping>,
}

/// The persisted shape: a [`ForwardConfig`] plus a user-supplied display
/// name. This is what the config store holds and what callers get back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserForwardConfig {
    #[serde(flatten)]
    pub config: ForwardConfig,
    /// Name the user gave this forward.
    pub display_name: String,
}

impl UserForwardConfig {
    /// The durable identity of this forward.
    pub fn id(&self) -> Uuid {
        self.config.id
    }

    /// The configured port mappings.
    pub fn forwards(&self) -> &[PortMapping] {
        &self.config.forwards
    }
}

/// User intent for creating a new forward; the service assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRequest {
    /// Target workload name.
    pub name: String,
    /// Namespace the workload lives in.
    pub namespace: String,
    /// Target workload kind.
    pub kind: ForwardKind,
    /// Initial port mappings.
    pub forwards: Vec<PortMapping>,
    /// Name to show the user.
    pub display_name: String,
}

impl ForwardRequest {
    /// Turns the intent into a config with a freshly generated id.
    pub fn into_config(self) -> UserForwardConfig {
        UserForwardConfig {
            config: ForwardConfig {
                id: Uuid::new_v4(),
                name: self.name,
                namespace: self.namespace,
                kind: self.kind,
                forwards: self.forwards,
            },
            display_name: self.display_name,
        }
    }
}
