//! The per-context port-forward orchestrator.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{ClusterContext, ForwardRequest, PortMapping, UserForwardConfig};
use crate::error::Result;
use crate::events::{Disposable, EventEmitter, Subscription};
use crate::ports::{ForwardConfigStore, PortForwardConnector};

/// Identity of one live tunnel: which config it belongs to and which
/// mapping it serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SessionKey {
    config_id: Uuid,
    local_port: u16,
    remote_port: u16,
}

impl SessionKey {
    fn new(config_id: Uuid, mapping: PortMapping) -> Self {
        Self {
            config_id,
            local_port: mapping.local_port,
            remote_port: mapping.remote_port,
        }
    }
}

/// Live tunnel handles, keyed by `(config id, local port, remote port)`.
///
/// Disposal always goes through this index, never through handles captured
/// in closures, so partial deletes and service shutdown can always find and
/// release exactly the right tunnels.
type SessionIndex = Arc<Mutex<HashMap<SessionKey, Box<dyn Disposable + Send>>>>;

/// Single point of truth for which forwards exist and which of them are
/// currently tunneling, for one cluster context.
pub struct KubernetesPortForwardService<C: PortForwardConnector, S: ForwardConfigStore> {
    context: ClusterContext,
    connector: C,
    store: S,
    sessions: SessionIndex,
    on_forwards_update: EventEmitter<Vec<UserForwardConfig>>,
}

impl<C: PortForwardConnector, S: ForwardConfigStore> KubernetesPortForwardService<C, S> {
    /// Creates a service for one context.
    pub fn new(context: ClusterContext, connector: C, store: S) -> Self {
        Self {
            context,
            connector,
            store,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            on_forwards_update: EventEmitter::new(),
        }
    }

    /// The context this service is scoped to.
    pub fn context(&self) -> &ClusterContext {
        &self.context
    }

    /// Persists a new forward configuration and returns the stored shape.
    ///
    /// Does not start any tunnel; that is `start_forward`'s job.
    pub async fn create_forward(&self, request: ForwardRequest) -> Result<UserForwardConfig> {
        let config = request.into_config();
        self.store.create_forward(&config).await?;

        debug!(
            context = %self.context,
            id = %config.id(),
            name = %config.config.name,
            "forward configuration created"
        );

        self.emit_forwards_update().await?;
        Ok(config)
    }

    /// Lists all stored forward configurations. Read-through; the store is
    /// assumed cheap and local.
    pub async fn list_forwards(&self) -> Result<Vec<UserForwardConfig>> {
        self.store.list_forwards().await
    }

    /// Opens a tunnel for every mapping of `config` that is not already
    /// active for `(config id, mapping)`.
    ///
    /// Calling this twice with the same mapping never opens two tunnels; a
    /// call that adds a new mapping only opens the new one. A failed open
    /// records nothing for that mapping and propagates, so a later retry is
    /// not blocked. The returned handle tears down exactly the sessions this
    /// call started.
    pub async fn start_forward(&self, config: &UserForwardConfig) -> Result<ForwardSessionHandle> {
        let mut started = Vec::new();

        for &mapping in config.forwards() {
            let key = SessionKey::new(config.id(), mapping);
            if self.sessions.lock().contains_key(&key) {
                debug!(
                    context = %self.context,
                    id = %config.id(),
                    mapping = %mapping,
                    "mapping already active, skipping"
                );
                continue;
            }

            let tunnel = self.connector.start_forward(&config.config, mapping).await?;
            self.sessions.lock().insert(key, tunnel);
            started.push(key);

            debug!(
                context = %self.context,
                id = %config.id(),
                mapping = %mapping,
                "tunnel opened"
            );
        }

        Ok(ForwardSessionHandle {
            keys: started,
            sessions: Arc::clone(&self.sessions),
        })
    }

    /// Deletes a whole forward configuration, or a single mapping of it.
    ///
    /// With `mapping: None`, or when the given mapping is the config's only
    /// one, every active session for the config is disposed and the config
    /// is deleted from the store. Otherwise only that mapping's session is
    /// disposed and the config is re-persisted with the mapping removed.
    pub async fn delete_forward(
        &self,
        config: &UserForwardConfig,
        mapping: Option<PortMapping>,
    ) -> Result<()> {
        match mapping {
            Some(mapping)
                if config.forwards().iter().any(|m| *m != mapping) =>
            {
                self.dispose_session(SessionKey::new(config.id(), mapping));

                let mut updated = config.clone();
                updated.config.forwards.retain(|m| *m != mapping);
                self.store.update_forward(&updated).await?;

                debug!(
                    context = %self.context,
                    id = %config.id(),
                    mapping = %mapping,
                    "mapping removed from forward configuration"
                );
            }
            _ => {
                let keys: Vec<SessionKey> = self
                    .sessions
                    .lock()
                    .keys()
                    .filter(|key| key.config_id == config.id())
                    .copied()
                    .collect();
                for key in keys {
                    self.dispose_session(key);
                }

                self.store.delete_forward(config.id()).await?;

                debug!(
                    context = %self.context,
                    id = %config.id(),
                    "forward configuration deleted"
                );
            }
        }

        self.emit_forwards_update().await
    }

    /// Number of currently active sessions across all configs.
    pub fn active_session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Subscribes to forward-list updates. The payload is the current full
    /// list after every mutating operation.
    pub fn on_forwards_update<F>(&self, listener: F) -> Subscription<Vec<UserForwardConfig>>
    where
        F: Fn(&Vec<UserForwardConfig>) + Send + Sync + 'static,
    {
        self.on_forwards_update.subscribe(listener)
    }

    /// Tears down every active session across every config. Used on
    /// service and provider shutdown.
    pub fn dispose(&self) {
        let mut sessions = self.sessions.lock();
        let count = sessions.len();
        for (_, mut tunnel) in sessions.drain() {
            tunnel.dispose();
        }
        if count > 0 {
            debug!(context = %self.context, count, "disposed all forward sessions");
        }
    }

    fn dispose_session(&self, key: SessionKey) {
        if let Some(mut tunnel) = self.sessions.lock().remove(&key) {
            tunnel.dispose();
        }
    }

    async fn emit_forwards_update(&self) -> Result<()> {
        match self.store.list_forwards().await {
            Ok(forwards) => {
                self.on_forwards_update.emit(&forwards);
                Ok(())
            }
            Err(e) => {
                warn!(context = %self.context, error = %e, "failed to list forwards for update event");
                Err(e)
            }
        }
    }
}

/// Tears down the sessions one `start_forward` call opened - and only
/// those. Sessions from prior calls are untouched.
pub struct ForwardSessionHandle {
    keys: Vec<SessionKey>,
    sessions: SessionIndex,
}

impl ForwardSessionHandle {
    /// Number of sessions this handle owns.
    pub fn session_count(&self) -> usize {
        self.keys.len()
    }
}

impl Disposable for ForwardSessionHandle {
    fn dispose(&mut self) {
        for key in self.keys.drain(..) {
            if let Some(mut tunnel) = self.sessions.lock().remove(&key) {
                tunnel.dispose();
            }
        }
    }
}
