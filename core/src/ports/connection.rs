//! Tunnel transport port (interface).

use crate::domain::{ForwardConfig, PortMapping};
use crate::error::Result;
use crate::events::Disposable;

/// Port for opening one local-to-cluster tunnel.
///
/// Failure and retry of the transport itself are the implementation's
/// responsibility; the orchestrator only records the returned handle and
/// disposes it to tear the tunnel down.
pub trait PortForwardConnector: Send + Sync {
    /// Opens a tunnel for one mapping of the given forward configuration.
    fn start_forward(
        &self,
        config: &ForwardConfig,
        mapping: PortMapping,
    ) -> impl std::future::Future<Output = Result<Box<dyn Disposable + Send>>> + Send;
}
