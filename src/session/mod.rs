//! Search session
//!
//! Holds the current query, its total count and the ids fetched so far.
//! Query changes are debounced, results are fetched in batches on demand and
//! subscribers are told about both through a broadcast channel.

use crate::backend::SearchBackend;
use crate::config::SessionConfig;
use crate::error::Result;
use crate::query::Query;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};
use tokio::sync::{broadcast, oneshot, Mutex, RwLock};

const EVENT_CAPACITY: usize = 64;

/// Notification published by a [`SearchSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The current query, or its total count, changed
    QueryChanged,
    /// A fetch batch appended ids; `generation` is the session's new generation
    ResultsAdded { generation: u64 },
}

#[derive(Debug, Default)]
struct SessionState {
    query: Option<Query>,
    total: Option<usize>,
    ids: Vec<String>,
    known: HashSet<String>,
    /// Completed fetch batches of the current query
    generation: u64,
    /// Bumped on every query change; completions of an older epoch are dropped
    epoch: u64,
}

impl SessionState {
    fn is_fully_fetched(&self) -> bool {
        self.total == Some(self.ids.len())
    }
}

/// Search state for one user
pub struct SearchSession {
    backend: Arc<dyn SearchBackend>,
    config: SessionConfig,
    state: RwLock<SessionState>,
    fetch_lock: Mutex<()>,
    /// Epoch and wake-up handle of the debounce currently waiting
    pending_debounce: SyncMutex<Option<(u64, oneshot::Sender<()>)>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SearchSession {
    pub fn new(backend: Arc<dyn SearchBackend>, config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            config,
            state: RwLock::new(SessionState::default()),
            fetch_lock: Mutex::new(()),
            pending_debounce: SyncMutex::new(None),
            events,
        }
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn query(&self) -> Option<Query> {
        self.state.read().await.query.clone()
    }

    pub async fn total_count(&self) -> Option<usize> {
        self.state.read().await.total
    }

    pub async fn ids(&self) -> Vec<String> {
        self.state.read().await.ids.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.ids.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.ids.is_empty()
    }

    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// Replace the current query
    ///
    /// A query equal to the current one changes nothing. Otherwise the
    /// session is cleared right away; `None` leaves it idle. With `debounce`
    /// the new query is committed only if no other `set_query` call arrives
    /// within the configured delay. Once committed, the total count and the
    /// first batch of ids are fetched.
    pub async fn set_query(&self, query: Option<Query>, debounce: bool) -> Result<()> {
        self.cancel_pending_debounce();

        let epoch = {
            let mut state = self.state.write().await;
            if state.query == query {
                return Ok(());
            }

            state.query = None;
            state.total = None;
            state.ids.clear();
            state.known.clear();
            state.generation = 0;
            state.epoch += 1;
            state.epoch
        };

        let Some(query) = query else {
            self.emit(SessionEvent::QueryChanged);
            return Ok(());
        };

        if debounce && !self.debounce(epoch).await {
            tracing::debug!("Query '{}' superseded while debouncing", query);
            return Ok(());
        }

        {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                return Ok(());
            }
            state.query = Some(query.clone());
        }
        self.emit(SessionEvent::QueryChanged);

        let total = self.backend.count(&query).await?;
        {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                tracing::debug!("Discarding count of superseded query '{}'", query);
                return Ok(());
            }
            state.total = total;
        }
        self.emit(SessionEvent::QueryChanged);

        self.fetch_data(Some(1)).await
    }

    /// Fetch the next batch of ids
    ///
    /// `generation` is the generation the caller wants to reach; a call whose
    /// generation has already been reached does nothing, so a burst of
    /// callers asking for the same generation performs a single fetch.
    /// Callers that cannot take the fetch lock in time give up.
    ///
    /// Every completed batch advances the generation, but
    /// [`SessionEvent::ResultsAdded`] is only sent when the batch appended
    /// at least one new id.
    pub async fn fetch_data(&self, generation: Option<u64>) -> Result<()> {
        {
            let state = self.state.read().await;
            if state.query.is_none() || state.is_fully_fetched() {
                return Ok(());
            }
        }

        let guard = match tokio::time::timeout(self.config.lock_timeout(), self.fetch_lock.lock()).await {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!(
                    "Gave up waiting {} ms for the fetch lock",
                    self.config.lock_timeout_ms
                );
                return Ok(());
            }
        };

        let (query, start, epoch) = {
            let state = self.state.read().await;
            let Some(query) = state.query.clone() else {
                return Ok(());
            };
            if generation.is_some_and(|g| g <= state.generation) {
                tracing::trace!(
                    "Fetch for generation {:?} is stale, session is at {}",
                    generation,
                    state.generation
                );
                return Ok(());
            }
            if state.is_fully_fetched() {
                return Ok(());
            }
            (query, state.ids.len(), state.epoch)
        };

        tracing::trace!(
            "Requesting results {} to {} for '{}'",
            start,
            start + self.config.api_paging,
            query
        );
        let collection = self
            .backend
            .load_ids(&query, start, self.config.api_paging)
            .await?;

        let (generation, appended) = {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                tracing::debug!("Discarding results of superseded query '{}'", query);
                return Ok(());
            }

            let mut appended = 0;
            for id in collection.ids {
                if state.known.insert(id.clone()) {
                    state.ids.push(id);
                    appended += 1;
                } else {
                    tracing::warn!("Id '{}' was already fetched, skipping it", id);
                }
            }
            state.generation += 1;

            if let Some(total) = state.total {
                if state.ids.len() > total {
                    tracing::warn!(
                        "Fetched {} ids but the backend reported only {}",
                        state.ids.len(),
                        total
                    );
                }
            }
            (state.generation, appended)
        };
        drop(guard);

        if appended > 0 {
            self.emit(SessionEvent::ResultsAdded { generation });
        } else {
            tracing::debug!("Batch {} added no new ids for '{}'", generation, query);
        }
        Ok(())
    }

    /// Wait out the debounce delay; false when another query arrived meanwhile
    ///
    /// A debounce registered by a newer query is never replaced by an older one.
    async fn debounce(&self, epoch: u64) -> bool {
        let (sender, cancelled) = oneshot::channel();
        {
            let mut pending = self
                .pending_debounce
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if matches!(&*pending, Some((newer, _)) if *newer > epoch) {
                return false;
            }
            *pending = Some((epoch, sender));
        }

        tokio::select! {
            _ = tokio::time::sleep(self.config.search_delay()) => true,
            _ = cancelled => false,
        }
    }

    fn cancel_pending_debounce(&self) {
        // Dropping the sender wakes the waiting debounce
        self.pending_debounce
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn emit(&self, event: SessionEvent) {
        // Sending only fails when nobody is subscribed
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ImageIdCollection;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Serves the same page for every window
    struct FixedBackend {
        ids: Vec<String>,
        total: usize,
        counts: AtomicUsize,
        loads: AtomicUsize,
    }

    impl FixedBackend {
        fn new(ids: usize, total: usize) -> Self {
            Self {
                ids: (0..ids).map(|i| format!("id{i}")).collect(),
                total,
                counts: AtomicUsize::new(0),
                loads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SearchBackend for FixedBackend {
        async fn count(&self, _query: &Query) -> Result<Option<usize>> {
            self.counts.fetch_add(1, Ordering::SeqCst);
            Ok(Some(self.total))
        }

        async fn load_ids(
            &self,
            _query: &Query,
            _start: usize,
            _count: usize,
        ) -> Result<ImageIdCollection> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(ImageIdCollection {
                ids: self.ids.clone(),
                pages_queried: 1,
            })
        }
    }

    fn config() -> SessionConfig {
        SessionConfig {
            search_delay_ms: 50,
            api_paging: 25,
            lock_timeout_ms: 1000,
        }
    }

    fn drain(receiver: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_set_query_fetches_first_batch() {
        let backend = Arc::new(FixedBackend::new(5, 50));
        let session = SearchSession::new(backend.clone(), config());
        let mut events = session.subscribe();

        session
            .set_query(Some(Query::from_text("schnee")), false)
            .await
            .unwrap();

        assert_eq!(session.total_count().await, Some(50));
        assert_eq!(session.len().await, 5);
        assert_eq!(session.generation().await, 1);
        assert_eq!(
            drain(&mut events),
            vec![
                SessionEvent::QueryChanged,
                SessionEvent::QueryChanged,
                SessionEvent::ResultsAdded { generation: 1 }
            ]
        );
    }

    #[tokio::test]
    async fn test_equal_query_is_noop() {
        let backend = Arc::new(FixedBackend::new(5, 50));
        let session = SearchSession::new(backend.clone(), config());

        let q1 = Query {
            terms: vec!["Schnee".into(), "post".into()],
            ..Query::default()
        };
        let q2 = Query {
            terms: vec!["post".into(), "schnee".into()],
            ..Query::default()
        };

        session.set_query(Some(q1), false).await.unwrap();
        let mut events = session.subscribe();
        session.set_query(Some(q2), false).await.unwrap();

        assert!(drain(&mut events).is_empty());
        assert_eq!(backend.counts.load(Ordering::SeqCst), 1);
        assert_eq!(backend.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clearing_query() {
        let backend = Arc::new(FixedBackend::new(5, 50));
        let session = SearchSession::new(backend, config());
        session
            .set_query(Some(Query::from_text("schnee")), false)
            .await
            .unwrap();

        let mut events = session.subscribe();
        session.set_query(None, false).await.unwrap();

        assert!(session.query().await.is_none());
        assert!(session.total_count().await.is_none());
        assert!(session.is_empty().await);
        assert_eq!(session.generation().await, 0);
        assert_eq!(drain(&mut events), vec![SessionEvent::QueryChanged]);
    }

    #[tokio::test]
    async fn test_fetch_without_query_is_noop() {
        let backend = Arc::new(FixedBackend::new(5, 50));
        let session = SearchSession::new(backend.clone(), config());

        session.fetch_data(None).await.unwrap();
        assert_eq!(backend.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fully_fetched_stops_fetching() {
        let backend = Arc::new(FixedBackend::new(5, 5));
        let session = SearchSession::new(backend.clone(), config());
        session
            .set_query(Some(Query::from_text("schnee")), false)
            .await
            .unwrap();

        session.fetch_data(None).await.unwrap();
        assert_eq!(backend.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_for_same_generation() {
        let backend = Arc::new(FixedBackend::new(5, 50));
        let session = Arc::new(SearchSession::new(backend.clone(), config()));
        let mut events = session.subscribe();
        session
            .set_query(Some(Query::from_text("schnee")), false)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let session = session.clone();
            handles.push(tokio::spawn(async move { session.fetch_data(Some(2)).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let results_added: Vec<SessionEvent> = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::ResultsAdded { .. }))
            .collect();
        assert_eq!(results_added, vec![SessionEvent::ResultsAdded { generation: 1 }]);
        assert_eq!(session.len().await, 5);
        assert_eq!(session.generation().await, 2);
        assert_eq!(backend.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_batch_of_known_ids_sends_no_event() {
        let backend = Arc::new(FixedBackend::new(5, 50));
        let session = SearchSession::new(backend.clone(), config());
        session
            .set_query(Some(Query::from_text("schnee")), false)
            .await
            .unwrap();
        let mut events = session.subscribe();

        session.fetch_data(Some(2)).await.unwrap();

        assert!(drain(&mut events).is_empty());
        assert_eq!(session.len().await, 5);
        assert_eq!(session.generation().await, 2);
    }

    /// Holds every `load_ids` call until released
    struct GatedBackend {
        release: Notify,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl SearchBackend for GatedBackend {
        async fn count(&self, _query: &Query) -> Result<Option<usize>> {
            Ok(Some(50))
        }

        async fn load_ids(
            &self,
            _query: &Query,
            start: usize,
            count: usize,
        ) -> Result<ImageIdCollection> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok(ImageIdCollection {
                ids: (start..start + count).map(|i| format!("id{i}")).collect(),
                pages_queried: 1,
            })
        }
    }

    #[tokio::test]
    async fn test_fetch_gives_up_when_lock_is_held() {
        let backend = Arc::new(GatedBackend {
            release: Notify::new(),
            loads: AtomicUsize::new(0),
        });
        let config = SessionConfig {
            lock_timeout_ms: 20,
            ..config()
        };
        let session = Arc::new(SearchSession::new(backend.clone(), config));

        let first = {
            let session = session.clone();
            tokio::spawn(async move {
                session
                    .set_query(Some(Query::from_text("schnee")), false)
                    .await
            })
        };
        while backend.loads.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        session.fetch_data(Some(2)).await.unwrap();
        assert_eq!(backend.loads.load(Ordering::SeqCst), 1);
        assert_eq!(session.generation().await, 0);
        assert!(session.is_empty().await);

        backend.release.notify_one();
        first.await.unwrap().unwrap();
        assert_eq!(session.generation().await, 1);
        assert_eq!(session.len().await, 25);
    }

    #[tokio::test]
    async fn test_older_debounce_never_replaces_newer() {
        let backend = Arc::new(FixedBackend::new(5, 50));
        let session = Arc::new(SearchSession::new(backend, config()));

        let newer = {
            let session = session.clone();
            tokio::spawn(async move { session.debounce(2).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(!session.debounce(1).await);
        assert!(newer.await.unwrap());
    }

    #[tokio::test]
    async fn test_debounce_keeps_last_query() {
        let backend = Arc::new(FixedBackend::new(5, 50));
        let session = Arc::new(SearchSession::new(backend.clone(), config()));

        let first = {
            let session = session.clone();
            tokio::spawn(async move {
                session
                    .set_query(Some(Query::from_text("schnee")), true)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        session
            .set_query(Some(Query::from_text("postauto")), true)
            .await
            .unwrap();
        first.await.unwrap().unwrap();

        assert_eq!(session.query().await, Some(Query::from_text("postauto")));
        assert_eq!(backend.counts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clearing_cancels_debounce() {
        let backend = Arc::new(FixedBackend::new(5, 50));
        let session = Arc::new(SearchSession::new(backend.clone(), config()));

        let pending = {
            let session = session.clone();
            tokio::spawn(async move {
                session
                    .set_query(Some(Query::from_text("schnee")), true)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.set_query(None, true).await.unwrap();
        pending.await.unwrap().unwrap();

        assert!(session.query().await.is_none());
        assert_eq!(backend.counts.load(Ordering::SeqCst), 0);
    }
}
