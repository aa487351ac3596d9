//! Port-forward orchestration.
//!
//! This module turns user intents ("create a forward", "delete a mapping",
//! "start forwarding") into calls against the tunnel transport and the
//! durable config store, while keeping an in-memory index of active
//! sessions. One service exists per cluster context, handed out by the
//! provider, so forwarding state for different clusters never collides.

mod provider;
mod service;

pub use provider::KubernetesPortForwardServiceProvider;
pub use service::{ForwardSessionHandle, KubernetesPortForwardService};
