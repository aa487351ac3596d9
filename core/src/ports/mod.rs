//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the seams to the external capabilities this crate
//! consumes: the Kubernetes API client (list/watch streams and access
//! reviews), the tunnel transport, and the durable forward-config store.
//! Implementations are supplied by the surrounding application; the one
//! adapter shipped here lives in `adapters`.

mod access_review;
mod connection;
mod store;
mod watch;

pub use access_review::AccessReviewClient;
pub use connection::PortForwardConnector;
pub use store::ForwardConfigStore;
pub use watch::{ResourceStreamer, WatchEvent};
