//! List-watch capability port (interface).

use tokio::sync::mpsc;

use crate::domain::CachedResource;
use crate::error::Result;

/// One event delivered by a live watch stream.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// An object was created or modified. The informer decides whether the
    /// object is new by consulting its own cache.
    Updated(CachedResource),
    /// An object was removed.
    Deleted(CachedResource),
    /// The transport failed. The stream ends after this; recovery goes
    /// through `ResourceInformer::reconnect()`.
    Error(String),
}

/// Port for the Kubernetes list-watch primitive of one (context, kind) pair.
///
/// Implementations wrap an API client pinned to a single context. The
/// HTTP/SPDY details of the watch stream are their concern; the informer
/// only consumes the channel.
pub trait ResourceStreamer: Send + Sync {
    /// Lists the current objects once.
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<CachedResource>>> + Send;

    /// Opens the streaming watch. Events arrive on the returned channel in
    /// server order; dropping the receiver tears the stream down.
    fn watch(
        &self,
    ) -> impl std::future::Future<Output = Result<mpsc::Receiver<WatchEvent>>> + Send;
}
