//! Forward-config persistence port (interface).

use uuid::Uuid;

use crate::domain::UserForwardConfig;
use crate::error::Result;

/// Port for durable storage of named forward configurations.
///
/// The storage layout is the implementation's concern; the orchestrator
/// only requires that `id` round-trips stably and that `list_forwards`
/// reflects the latest successful mutation.
pub trait ForwardConfigStore: Send + Sync {
    /// Persists a new configuration.
    fn create_forward(
        &self,
        config: &UserForwardConfig,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Replaces an existing configuration, matched by id.
    fn update_forward(
        &self,
        config: &UserForwardConfig,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Deletes a configuration by id.
    fn delete_forward(&self, id: Uuid) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Lists all stored configurations.
    fn list_forwards(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<UserForwardConfig>>> + Send;
}
