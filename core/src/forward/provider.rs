//! One forward service per cluster context.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::domain::ClusterContext;
use crate::ports::{ForwardConfigStore, PortForwardConnector};

use super::KubernetesPortForwardService;

/// Keyed registry handing out one [`KubernetesPortForwardService`] per
/// distinct context, so forwards in context A cannot be disposed or listed
/// as part of context B.
///
/// Services are constructed lazily through the injected factory and cached
/// by context name. An explicit registry (rather than any ambient
/// singleton) keeps providers isolated from each other in tests and keeps
/// contexts from sharing mutable state.
pub struct KubernetesPortForwardServiceProvider<C, S, F>
where
    C: PortForwardConnector,
    S: ForwardConfigStore,
    F: Fn(&ClusterContext) -> KubernetesPortForwardService<C, S>,
{
    services: RwLock<HashMap<String, Arc<KubernetesPortForwardService<C, S>>>>,
    factory: F,
}

impl<C, S, F> KubernetesPortForwardServiceProvider<C, S, F>
where
    C: PortForwardConnector,
    S: ForwardConfigStore,
    F: Fn(&ClusterContext) -> KubernetesPortForwardService<C, S>,
{
    /// Creates a provider that builds services through `factory`.
    pub fn new(factory: F) -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            factory,
        }
    }

    /// The registry key for a context: its name, never a structural
    /// comparison of cluster or user objects.
    pub fn kube_config_key<'a>(&self, context: &'a ClusterContext) -> &'a str {
        context.name()
    }

    /// Returns the service for `context`, constructing and caching it on
    /// first request.
    pub fn get(&self, context: &ClusterContext) -> Arc<KubernetesPortForwardService<C, S>> {
        let key = self.kube_config_key(context);

        if let Some(service) = self.services.read().get(key) {
            return Arc::clone(service);
        }

        let mut services = self.services.write();
        Arc::clone(services.entry(key.to_string()).or_insert_with(|| {
            debug!(context = %context, "creating port forward service");
            Arc::new((self.factory)(context))
        }))
    }

    /// Number of contexts a service has been constructed for.
    pub fn service_count(&self) -> usize {
        self.services.read().len()
    }

    /// Disposes every cached service and clears the registry. Used on
    /// application shutdown.
    pub fn dispose_all(&self) {
        let services: Vec<_> = self.services.write().drain().collect();
        for (_, service) in services {
            service.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ClusterConfig, ForwardConfig, ForwardKind, ForwardRequest, PortMapping, UserForwardConfig,
    };
    use crate::error::Result;
    use crate::events::Disposable;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    #[derive(Clone, Default)]
    struct CountingConnector {
        opened: Arc<AtomicUsize>,
        disposed: Arc<AtomicUsize>,
    }

    struct CountingTunnel {
        disposed: Arc<AtomicUsize>,
    }

    impl Disposable for CountingTunnel {
        fn dispose(&mut self) {
            self.disposed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl PortForwardConnector for CountingConnector {
        async fn start_forward(
            &self,
            _config: &ForwardConfig,
            _mapping: PortMapping,
        ) -> Result<Box<dyn Disposable + Send>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingTunnel {
                disposed: Arc::clone(&self.disposed),
            }))
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStore {
        configs: Arc<Mutex<Vec<UserForwardConfig>>>,
    }

    impl ForwardConfigStore for MemoryStore {
        async fn create_forward(&self, config: &UserForwardConfig) -> Result<()> {
            self.configs.lock().push(config.clone());
            Ok(())
        }

        async fn update_forward(&self, config: &UserForwardConfig) -> Result<()> {
            let mut configs = self.configs.lock();
            if let Some(existing) = configs.iter_mut().find(|c| c.id() == config.id()) {
                *existing = config.clone();
            }
            Ok(())
        }

        async fn delete_forward(&self, id: Uuid) -> Result<()> {
            self.configs.lock().retain(|c| c.id() != id);
            Ok(())
        }

        async fn list_forwards(&self) -> Result<Vec<UserForwardConfig>> {
            Ok(self.configs.lock().clone())
        }
    }

    fn context(name: &str) -> ClusterContext {
        ClusterContext::new(name, ClusterConfig::new("https://cluster:6443"))
    }

    fn provider(
        connector: CountingConnector,
    ) -> KubernetesPortForwardServiceProvider<
        CountingConnector,
        MemoryStore,
        impl Fn(&ClusterContext) -> KubernetesPortForwardService<CountingConnector, MemoryStore>,
    > {
        KubernetesPortForwardServiceProvider::new(move |ctx: &ClusterContext| {
            KubernetesPortForwardService::new(
                ctx.clone(),
                connector.clone(),
                MemoryStore::default(),
            )
        })
    }

    #[test]
    fn test_same_context_name_returns_same_instance() {
        let provider = provider(CountingConnector::default());

        let a = provider.get(&context("prod"));
        let b = provider.get(&context("prod"));

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(provider.service_count(), 1);
    }

    #[test]
    fn test_distinct_contexts_get_distinct_services() {
        let provider = provider(CountingConnector::default());

        let a = provider.get(&context("prod"));
        let b = provider.get(&context("staging"));

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(provider.service_count(), 2);
    }

    #[test]
    fn test_kube_config_key_is_the_context_name() {
        let provider = provider(CountingConnector::default());
        assert_eq!(provider.kube_config_key(&context("dev")), "dev");
    }

    #[tokio::test]
    async fn test_forward_state_is_isolated_per_context() {
        let connector = CountingConnector::default();
        let provider = provider(connector.clone());

        let prod = provider.get(&context("prod"));
        let staging = provider.get(&context("staging"));

        let config = prod
            .create_forward(ForwardRequest {
                name: "web".to_string(),
                namespace: "default".to_string(),
                kind: ForwardKind::Pod,
                forwards: vec![PortMapping::new(8080, 80)],
                display_name: "web".to_string(),
            })
            .await
            .unwrap();
        prod.start_forward(&config).await.unwrap();

        assert_eq!(prod.active_session_count(), 1);
        assert_eq!(staging.active_session_count(), 0);
        assert!(staging.list_forwards().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispose_all_tears_down_every_service() {
        let connector = CountingConnector::default();
        let provider = provider(connector.clone());

        for name in ["prod", "staging"] {
            let service = provider.get(&context(name));
            let config = service
                .create_forward(ForwardRequest {
                    name: "web".to_string(),
                    namespace: "default".to_string(),
                    kind: ForwardKind::Pod,
                    forwards: vec![PortMapping::new(8080, 80)],
                    display_name: "web".to_string(),
                })
                .await
                .unwrap();
            service.start_forward(&config).await.unwrap();
        }

        provider.dispose_all();

        assert_eq!(provider.service_count(), 0);
        assert_eq!(connector.disposed.load(Ordering::SeqCst), 2);
    }
}
