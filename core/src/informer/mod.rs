//! Per-(context, kind) watch engine.
//!
//! A [`ResourceInformer`] lists one resource kind once, then streams
//! add/update/delete events into a local cache and translates them into
//! cache-update and offline events. Recovery from transport failures is
//! always caller-driven: the informer never reconnects on its own, because
//! blind retry against an unreachable cluster is a resource-exhaustion risk
//! the caller should own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::{
    CacheUpdateEvent, CachedResource, ClusterContext, OfflineEvent, ResourceCache,
};
use crate::error::Result;
use crate::events::{EventEmitter, Subscription};
use crate::ports::{ResourceStreamer, WatchEvent};

/// Live, cached view of one resource kind for one context.
pub struct ResourceInformer<S: ResourceStreamer> {
    inner: Arc<InformerInner<S>>,
}

struct InformerInner<S> {
    context: ClusterContext,
    resource_name: String,
    streamer: S,
    cache: RwLock<ResourceCache>,
    on_cache_updated: EventEmitter<CacheUpdateEvent>,
    on_offline: EventEmitter<OfflineEvent>,
    /// Set when the watch reported an error; cleared by a successful start.
    error_seen: AtomicBool,
    disposed: AtomicBool,
    stream_task: Mutex<Option<JoinHandle<()>>>,
}

impl<S: ResourceStreamer + 'static> ResourceInformer<S> {
    /// Creates an informer for one (context, resource kind) pair.
    ///
    /// `resource_name` is the plural kind name (e.g. "pods") used to label
    /// every event this informer emits.
    pub fn new(context: ClusterContext, resource_name: &str, streamer: S) -> Self {
        Self {
            inner: Arc::new(InformerInner {
                context,
                resource_name: resource_name.to_string(),
                streamer,
                cache: RwLock::new(ResourceCache::new()),
                on_cache_updated: EventEmitter::new(),
                on_offline: EventEmitter::new(),
                error_seen: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                stream_task: Mutex::new(None),
            }),
        }
    }

    /// Performs the initial list and opens the watch stream.
    ///
    /// Exactly one `CacheUpdateEvent { count_changed: true }` fires once the
    /// list completes, even when it is empty, so subscribers always observe
    /// an initial state. Transport failures are never returned; they surface
    /// through `on_offline` only.
    pub async fn start(&self) -> Result<()> {
        let inner = &self.inner;

        if inner.disposed.load(Ordering::SeqCst) {
            return Ok(());
        }

        // Already streaming healthily - don't open a duplicate watch.
        {
            let task = inner.stream_task.lock();
            if let Some(handle) = task.as_ref() {
                if !handle.is_finished() && !inner.error_seen.load(Ordering::SeqCst) {
                    debug!(
                        context = %inner.context,
                        resource = %inner.resource_name,
                        "watch already active, skipping start"
                    );
                    return Ok(());
                }
            }
        }

        let items = match inner.streamer.list().await {
            Ok(items) => items,
            Err(e) => {
                inner.mark_offline(&e.to_string());
                return Ok(());
            }
        };

        debug!(
            context = %inner.context,
            resource = %inner.resource_name,
            count = items.len(),
            "initial list complete"
        );

        inner.cache.write().replace(items);
        inner.emit_cache_updated(true);

        let receiver = match inner.streamer.watch().await {
            Ok(receiver) => receiver,
            Err(e) => {
                inner.mark_offline(&e.to_string());
                return Ok(());
            }
        };

        inner.error_seen.store(false, Ordering::SeqCst);

        let task_inner = Arc::clone(inner);
        let handle = tokio::spawn(consume_stream(task_inner, receiver));
        if let Some(previous) = inner.stream_task.lock().replace(handle) {
            previous.abort();
        }

        Ok(())
    }

    /// Re-invokes `start()` if and only if the watch has reported an error
    /// since the last `start()`/`reconnect()`.
    ///
    /// The guard keeps multiple callers reacting to the same offline signal
    /// from stacking redundant watches onto a healthy stream.
    pub async fn reconnect(&self) -> Result<()> {
        if !self.inner.error_seen.load(Ordering::SeqCst) {
            return Ok(());
        }
        debug!(
            context = %self.inner.context,
            resource = %self.inner.resource_name,
            "reconnecting after watch error"
        );
        self.start().await
    }

    /// Snapshot of the current cache. Empty before `start()` resolves.
    pub fn list(&self) -> Vec<CachedResource> {
        self.inner.cache.read().list()
    }

    /// Whether the watch has reported an error that has not been cleared
    /// by a successful reconnect.
    pub fn is_offline(&self) -> bool {
        self.inner.error_seen.load(Ordering::SeqCst)
    }

    /// Subscribes to cache-update events.
    pub fn on_cache_updated<F>(&self, listener: F) -> Subscription<CacheUpdateEvent>
    where
        F: Fn(&CacheUpdateEvent) + Send + Sync + 'static,
    {
        self.inner.on_cache_updated.subscribe(listener)
    }

    /// Subscribes to offline events.
    pub fn on_offline<F>(&self, listener: F) -> Subscription<OfflineEvent>
    where
        F: Fn(&OfflineEvent) + Send + Sync + 'static,
    {
        self.inner.on_offline.subscribe(listener)
    }

    /// Stops the underlying watch. No further events fire afterward.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        if let Some(handle) = self.inner.stream_task.lock().take() {
            handle.abort();
        }
        debug!(
            context = %self.inner.context,
            resource = %self.inner.resource_name,
            "informer disposed"
        );
    }
}

/// Drains the watch channel into the cache until the stream ends or the
/// informer is disposed.
async fn consume_stream<S: ResourceStreamer>(
    inner: Arc<InformerInner<S>>,
    mut receiver: mpsc::Receiver<WatchEvent>,
) {
    while let Some(event) = receiver.recv().await {
        if inner.disposed.load(Ordering::SeqCst) {
            break;
        }
        inner.apply(event);
    }
}

impl<S> InformerInner<S> {
    /// Applies one stream event to the cache and classifies it.
    ///
    /// Only the initial list and deletions are count-changing; updates emit
    /// `count_changed: false` even when they insert a previously unknown
    /// object. An update carrying the cached resource version is a no-op.
    fn apply(&self, event: WatchEvent) {
        match event {
            WatchEvent::Updated(resource) => {
                let key = resource.key();
                let mut cache = self.cache.write();
                if let Some(existing) = cache.get(&key) {
                    if existing.resource_version.is_some()
                        && existing.resource_version == resource.resource_version
                    {
                        return;
                    }
                }
                cache.upsert(resource);
                drop(cache);
                self.emit_cache_updated(false);
            }
            WatchEvent::Deleted(resource) => {
                let removed = self.cache.write().remove(&resource.key());
                if removed.is_some() {
                    self.emit_cache_updated(true);
                }
            }
            WatchEvent::Error(reason) => {
                self.mark_offline(&reason);
            }
        }
    }

    fn emit_cache_updated(&self, count_changed: bool) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        self.on_cache_updated.emit(&CacheUpdateEvent {
            context: self.context.name().to_string(),
            resource_name: self.resource_name.clone(),
            count_changed,
        });
    }

    fn mark_offline(&self, reason: &str) {
        self.error_seen.store(true, Ordering::SeqCst);
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        warn!(
            context = %self.context,
            resource = %self.resource_name,
            reason = %reason,
            "watch stream reported an error"
        );
        self.on_offline
            .emit(&OfflineEvent::new(self.context.name(), &self.resource_name, reason));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ClusterConfig;
    use crate::error::Error;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Streamer backed by shared state so tests can drive the stream from
    /// outside the informer.
    #[derive(Clone)]
    struct MockStreamer {
        items: Arc<Mutex<Vec<CachedResource>>>,
        list_calls: Arc<AtomicUsize>,
        watch_calls: Arc<AtomicUsize>,
        fail_list: Arc<AtomicBool>,
        sender: Arc<Mutex<Option<mpsc::Sender<WatchEvent>>>>,
    }

    impl MockStreamer {
        fn new(items: Vec<CachedResource>) -> Self {
            Self {
                items: Arc::new(Mutex::new(items)),
                list_calls: Arc::new(AtomicUsize::new(0)),
                watch_calls: Arc::new(AtomicUsize::new(0)),
                fail_list: Arc::new(AtomicBool::new(false)),
                sender: Arc::new(Mutex::new(None)),
            }
        }

        async fn send(&self, event: WatchEvent) {
            let sender = {
                self.sender
                    .lock()
                    .as_ref()
                    .expect("watch not started")
                    .clone()
            };
            sender.send(event).await.expect("stream closed");
        }

        fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        fn watch_calls(&self) -> usize {
            self.watch_calls.load(Ordering::SeqCst)
        }
    }

    impl ResourceStreamer for MockStreamer {
        async fn list(&self) -> Result<Vec<CachedResource>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_list.load(Ordering::SeqCst) {
                return Err(Error::Watch {
                    resource: "pods".to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            Ok(self.items.lock().clone())
        }

        async fn watch(&self) -> Result<mpsc::Receiver<WatchEvent>> {
            self.watch_calls.fetch_add(1, Ordering::SeqCst);
            let (sender, receiver) = mpsc::channel(16);
            *self.sender.lock() = Some(sender);
            Ok(receiver)
        }
    }

    fn test_context() -> ClusterContext {
        ClusterContext::new("test-context", ClusterConfig::new("https://cluster:6443"))
    }

    fn pod(name: &str, version: &str) -> CachedResource {
        CachedResource::new(Some("default"), name).with_resource_version(version)
    }

    /// Lets the spawned stream task catch up.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    struct Recorded {
        updates: Arc<Mutex<Vec<CacheUpdateEvent>>>,
        offline: Arc<Mutex<Vec<OfflineEvent>>>,
        _subs: Vec<Box<dyn crate::events::Disposable>>,
    }

    fn record(informer: &ResourceInformer<MockStreamer>) -> Recorded {
        let updates: Arc<Mutex<Vec<CacheUpdateEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let offline: Arc<Mutex<Vec<OfflineEvent>>> = Arc::new(Mutex::new(Vec::new()));

        let update_sink = Arc::clone(&updates);
        let offline_sink = Arc::clone(&offline);
        let subs: Vec<Box<dyn crate::events::Disposable>> = vec![
            Box::new(informer.on_cache_updated(move |e| update_sink.lock().push(e.clone()))),
            Box::new(informer.on_offline(move |e| offline_sink.lock().push(e.clone()))),
        ];

        Recorded {
            updates,
            offline,
            _subs: subs,
        }
    }

    #[tokio::test]
    async fn test_initial_list_populates_cache_and_fires_count_changed() {
        let streamer = MockStreamer::new(vec![pod("web-1", "1"), pod("web-2", "1")]);
        let informer = ResourceInformer::new(test_context(), "pods", streamer.clone());
        let recorded = record(&informer);

        assert!(informer.list().is_empty());
        informer.start().await.unwrap();

        let mut names: Vec<_> = informer.list().into_iter().map(|r| r.name).collect();
        names.sort();
        assert_eq!(names, vec!["web-1", "web-2"]);

        let updates = recorded.updates.lock();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].count_changed);
        assert_eq!(updates[0].context, "test-context");
        assert_eq!(updates[0].resource_name, "pods");
    }

    #[tokio::test]
    async fn test_empty_initial_list_still_fires_event() {
        let streamer = MockStreamer::new(vec![]);
        let informer = ResourceInformer::new(test_context(), "pods", streamer.clone());
        let recorded = record(&informer);

        informer.start().await.unwrap();

        assert!(informer.list().is_empty());
        assert_eq!(recorded.updates.lock().len(), 1);
        assert!(recorded.updates.lock()[0].count_changed);
    }

    #[tokio::test]
    async fn test_update_of_cached_object_is_not_count_changing() {
        let streamer = MockStreamer::new(vec![pod("web", "1")]);
        let informer = ResourceInformer::new(test_context(), "pods", streamer.clone());
        let recorded = record(&informer);

        informer.start().await.unwrap();
        streamer.send(WatchEvent::Updated(pod("web", "2"))).await;
        settle().await;

        let updates = recorded.updates.lock();
        assert_eq!(updates.len(), 2);
        assert!(!updates[1].count_changed);
        drop(updates);

        let cached = informer.list();
        assert_eq!(cached[0].resource_version.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_update_with_same_resource_version_is_a_noop() {
        let streamer = MockStreamer::new(vec![pod("web", "1")]);
        let informer = ResourceInformer::new(test_context(), "pods", streamer.clone());
        let recorded = record(&informer);

        informer.start().await.unwrap();
        streamer.send(WatchEvent::Updated(pod("web", "1"))).await;
        settle().await;

        // Only the initial list event.
        assert_eq!(recorded.updates.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_update_of_unknown_object_inserts_without_count_change() {
        let streamer = MockStreamer::new(vec![pod("web", "1")]);
        let informer = ResourceInformer::new(test_context(), "pods", streamer.clone());
        let recorded = record(&informer);

        informer.start().await.unwrap();
        streamer.send(WatchEvent::Updated(pod("api", "5"))).await;
        settle().await;

        assert_eq!(informer.list().len(), 2);
        let updates = recorded.updates.lock();
        assert_eq!(updates.len(), 2);
        assert!(!updates[1].count_changed);
    }

    #[tokio::test]
    async fn test_delete_is_count_changing() {
        let streamer = MockStreamer::new(vec![pod("web", "1")]);
        let informer = ResourceInformer::new(test_context(), "pods", streamer.clone());
        let recorded = record(&informer);

        informer.start().await.unwrap();
        streamer.send(WatchEvent::Deleted(pod("web", "1"))).await;
        settle().await;

        assert!(informer.list().is_empty());
        let updates = recorded.updates.lock();
        assert_eq!(updates.len(), 2);
        assert!(updates[1].count_changed);
    }

    #[tokio::test]
    async fn test_delete_of_unknown_object_emits_nothing() {
        let streamer = MockStreamer::new(vec![pod("web", "1")]);
        let informer = ResourceInformer::new(test_context(), "pods", streamer.clone());
        let recorded = record(&informer);

        informer.start().await.unwrap();
        streamer.send(WatchEvent::Deleted(pod("ghost", "9"))).await;
        settle().await;

        assert_eq!(informer.list().len(), 1);
        assert_eq!(recorded.updates.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_stream_error_surfaces_as_offline_event() {
        let streamer = MockStreamer::new(vec![pod("web", "1")]);
        let informer = ResourceInformer::new(test_context(), "pods", streamer.clone());
        let recorded = record(&informer);

        informer.start().await.unwrap();
        streamer
            .send(WatchEvent::Error("connection reset".to_string()))
            .await;
        settle().await;

        assert!(informer.is_offline());
        let offline = recorded.offline.lock();
        assert_eq!(offline.len(), 1);
        assert!(offline[0].offline);
        assert_eq!(offline[0].reason, "connection reset");
    }

    #[tokio::test]
    async fn test_reconnect_noops_without_prior_error() {
        let streamer = MockStreamer::new(vec![pod("web", "1")]);
        let informer = ResourceInformer::new(test_context(), "pods", streamer.clone());

        informer.start().await.unwrap();
        informer.reconnect().await.unwrap();

        assert_eq!(streamer.list_calls(), 1);
        assert_eq!(streamer.watch_calls(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_restarts_after_observed_error() {
        let streamer = MockStreamer::new(vec![pod("web", "1")]);
        let informer = ResourceInformer::new(test_context(), "pods", streamer.clone());

        informer.start().await.unwrap();
        streamer
            .send(WatchEvent::Error("timeout".to_string()))
            .await;
        settle().await;
        assert!(informer.is_offline());

        informer.reconnect().await.unwrap();
        assert!(!informer.is_offline());
        assert_eq!(streamer.list_calls(), 2);
        assert_eq!(streamer.watch_calls(), 2);

        // Healthy again: a further reconnect changes nothing.
        informer.reconnect().await.unwrap();
        assert_eq!(streamer.watch_calls(), 2);
    }

    #[tokio::test]
    async fn test_list_failure_goes_offline_instead_of_erroring() {
        let streamer = MockStreamer::new(vec![]);
        streamer.fail_list.store(true, Ordering::SeqCst);
        let informer = ResourceInformer::new(test_context(), "pods", streamer.clone());
        let recorded = record(&informer);

        informer.start().await.unwrap();

        assert!(informer.is_offline());
        assert_eq!(recorded.offline.lock().len(), 1);
        assert!(recorded.updates.lock().is_empty());

        // Caller-driven recovery once the transport is healthy again.
        streamer.fail_list.store(false, Ordering::SeqCst);
        informer.reconnect().await.unwrap();
        assert!(!informer.is_offline());
        assert_eq!(recorded.updates.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_second_start_on_healthy_watch_is_ignored() {
        let streamer = MockStreamer::new(vec![pod("web", "1")]);
        let informer = ResourceInformer::new(test_context(), "pods", streamer.clone());

        informer.start().await.unwrap();
        informer.start().await.unwrap();

        assert_eq!(streamer.list_calls(), 1);
        assert_eq!(streamer.watch_calls(), 1);
    }

    #[tokio::test]
    async fn test_no_events_after_dispose() {
        let streamer = MockStreamer::new(vec![pod("web", "1")]);
        let informer = ResourceInformer::new(test_context(), "pods", streamer.clone());
        let recorded = record(&informer);

        informer.start().await.unwrap();
        informer.dispose();

        // The channel may already be torn down by the aborted task.
        let events_before = recorded.updates.lock().len();
        let _ = streamer
            .sender
            .lock()
            .as_ref()
            .unwrap()
            .try_send(WatchEvent::Deleted(pod("web", "1")));
        settle().await;

        assert_eq!(recorded.updates.lock().len(), events_before);
        assert!(recorded.offline.lock().is_empty());
    }
}
