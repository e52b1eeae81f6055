// src/pipeline/poll.rs

//! Forum polling loop with digest-based change detection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::pipeline::ingest::{IngestOutcome, Ingestor};
use crate::services::forum::{ForumClient, ForumEvent, ThreadPayload};

/// Summary of one poll.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub fetched: usize,
    pub new: usize,
    pub updated: usize,
    pub delivered: usize,
    pub submissions: usize,
    pub filtered: usize,
    pub failures: usize,
}

/// Digest of the fields that make a thread worth re-ingesting.
pub fn digest(thread: &ThreadPayload) -> String {
    let (_, body) = thread.body();
    let category = thread.category_name();
    let mut hasher = Sha256::new();
    for part in [thread.title.as_str(), body.as_str(), category.as_str()] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Polls the forum and feeds new or changed threads to an [`Ingestor`].
pub struct Poller {
    forum: ForumClient,
    ingestor: Arc<Ingestor>,
    digests: HashMap<u64, String>,
    concurrency: usize,
    interval: Duration,
}

impl Poller {
    pub fn new(forum: ForumClient, ingestor: Arc<Ingestor>, concurrency: usize) -> Self {
        let interval = Duration::from_secs(forum.config().poll_interval_secs);
        Self {
            forum,
            ingestor,
            digests: HashMap::new(),
            concurrency: concurrency.max(1),
            interval,
        }
    }

    /// Compare threads against the last seen digests.
    ///
    /// Unseen ids become `ThreadNew`, changed ones `ThreadUpdated`, and
    /// unchanged ones are dropped. Threads without an id are passed through
    /// as new so that ingestion rejects them.
    pub fn detect_events(&mut self, threads: Vec<ThreadPayload>) -> Vec<ForumEvent> {
        let mut events = Vec::new();
        for thread in threads {
            let Some(id) = thread.id else {
                events.push(ForumEvent::ThreadNew(thread));
                continue;
            };

            let current = digest(&thread);
            match self.digests.insert(id, current.clone()) {
                None => events.push(ForumEvent::ThreadNew(thread)),
                Some(previous) if previous != current => {
                    events.push(ForumEvent::ThreadUpdated(thread))
                }
                Some(_) => {}
            }
        }
        events
    }

    /// Fetch the listing once and ingest whatever changed.
    pub async fn poll_once(&mut self) -> Result<PollOutcome> {
        let listing = self.forum.fetch_threads().await?;
        let users = listing.user_directory();

        let mut outcome = PollOutcome {
            fetched: listing.threads.len(),
            ..PollOutcome::default()
        };

        let mut threads = Vec::with_capacity(listing.threads.len());
        for (id, decoded) in listing.decode_threads() {
            match decoded {
                Ok(thread) => threads.push(thread),
                Err(error) => {
                    outcome.failures += 1;
                    log::warn!("Skipping malformed thread {:?}: {}", id, error);
                }
            }
        }

        let events = self.detect_events(threads);
        for event in &events {
            match event {
                ForumEvent::ThreadNew(_) => outcome.new += 1,
                ForumEvent::ThreadUpdated(_) => outcome.updated += 1,
                ForumEvent::CommentNew { .. } => {}
            }
        }

        let ingestor = &self.ingestor;
        let users = &users;
        let results: Vec<(Option<u64>, Result<IngestOutcome>)> = stream::iter(events)
            .map(|event| async move {
                let id = match &event {
                    ForumEvent::ThreadNew(t) | ForumEvent::ThreadUpdated(t) => t.id,
                    ForumEvent::CommentNew { thread_id } => *thread_id,
                };
                (id, ingestor.handle(event, users).await)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (id, result) in results {
            match result {
                Ok(IngestOutcome::Delivered { submission }) => {
                    outcome.delivered += 1;
                    if submission {
                        outcome.submissions += 1;
                    }
                }
                Ok(IngestOutcome::Filtered) => outcome.filtered += 1,
                Ok(IngestOutcome::Ignored) => {}
                Err(error) => {
                    outcome.failures += 1;
                    log::warn!("Skipping thread {:?}: {}", id, error);
                    // Retry on the next poll
                    if let Some(id) = id {
                        self.digests.remove(&id);
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// Poll forever. Failed polls are logged and retried after the interval.
    pub async fn run(&mut self) {
        log::info!(
            "Polling course {} every {}s",
            self.forum.config().course_id,
            self.interval.as_secs()
        );

        loop {
            match self.poll_once().await {
                Ok(outcome) if outcome.new + outcome.updated > 0 => log::info!(
                    "Poll: {} fetched, {} new, {} updated, {} delivered, {} submissions, {} filtered, {} failed",
                    outcome.fetched,
                    outcome.new,
                    outcome.updated,
                    outcome.delivered,
                    outcome.submissions,
                    outcome.filtered,
                    outcome.failures
                ),
                Ok(outcome) => log::debug!("Poll: {} fetched, nothing changed", outcome.fetched),
                Err(error) => log::warn!("Forum poll failed: {}", error),
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use axum::{
        Json, Router,
        extract::{Path, Query, State},
        http::{HeaderMap, Method, StatusCode, Uri, header::AUTHORIZATION},
        routing::get,
    };
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    use crate::models::{Config, ForumConfig};
    use crate::pipeline::sink::{ApiSink, PostSink};
    use crate::storage::Store;

    fn thread(json: &str) -> ThreadPayload {
        serde_json::from_str(json).unwrap()
    }

    fn poller() -> Poller {
        poller_for("http://127.0.0.1:9", Arc::new(Store::new()))
    }

    fn poller_for(forum_url: &str, sink: Arc<dyn PostSink>) -> Poller {
        let config = Config {
            forum: ForumConfig {
                api_url: forum_url.to_string(),
                course_id: "42".to_string(),
                api_token: "secret".to_string(),
                thread_limit: 25,
                ..ForumConfig::default()
            },
            ..Config::default()
        };
        let forum = ForumClient::new(reqwest::Client::new(), config.forum.clone());
        let ingestor = Ingestor::new(Arc::new(config), sink).unwrap();
        Poller::new(forum, Arc::new(ingestor), 2)
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Forum API stand-in serving a fixed listing and recording each request.
    #[derive(Default)]
    struct FakeForum {
        listing: Mutex<Value>,
        course: Mutex<Option<String>>,
        auth: Mutex<Option<String>>,
        query: Mutex<HashMap<String, String>>,
    }

    async fn list_threads(
        State(forum): State<Arc<FakeForum>>,
        Path(course_id): Path<String>,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        *forum.course.lock() = Some(course_id);
        *forum.auth.lock() = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        *forum.query.lock() = query;
        Json(forum.listing.lock().clone())
    }

    async fn spawn_forum(listing: Value) -> (Arc<FakeForum>, String) {
        let forum = Arc::new(FakeForum {
            listing: Mutex::new(listing),
            ..FakeForum::default()
        });
        let app = Router::new()
            .route("/courses/:course_id/threads", get(list_threads))
            .with_state(Arc::clone(&forum));
        (forum, spawn(app).await)
    }

    /// Portal API stand-in that records method and path, failing on demand.
    #[derive(Default)]
    struct FakePortal {
        failing: AtomicBool,
        requests: Mutex<Vec<(Method, String)>>,
    }

    async fn record(State(portal): State<Arc<FakePortal>>, method: Method, uri: Uri) -> StatusCode {
        portal.requests.lock().push((method, uri.path().to_string()));
        if portal.failing.load(Ordering::SeqCst) {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::OK
        }
    }

    async fn spawn_portal() -> (Arc<FakePortal>, ApiSink) {
        let portal = Arc::new(FakePortal::default());
        let app = Router::new()
            .fallback(record)
            .with_state(Arc::clone(&portal));
        let base = spawn(app).await;
        let sink = ApiSink::new(reqwest::Client::new(), format!("{base}/api"));
        (portal, sink)
    }

    fn participation_thread(text: &str) -> Value {
        json!({
            "id": 1,
            "title": "Participation A HW2",
            "text": text,
            "user": {"name": "Alice"}
        })
    }

    #[test]
    fn test_digest_tracks_title_body_category() {
        let base = thread(r#"{"id": 1, "title": "Participation A", "text": "body"}"#);
        let same = thread(r#"{"id": 1, "title": "Participation A", "text": "body", "number": 9}"#);
        let edited = thread(r#"{"id": 1, "title": "Participation A", "text": "body!"}"#);
        let moved = thread(r#"{"id": 1, "title": "Participation A", "text": "body", "category": "Other"}"#);

        assert_eq!(digest(&base), digest(&same));
        assert_ne!(digest(&base), digest(&edited));
        assert_ne!(digest(&base), digest(&moved));
    }

    #[test]
    fn test_detect_events_new_updated_unchanged() {
        let mut poller = poller();

        let first = poller.detect_events(vec![
            thread(r#"{"id": 1, "title": "a", "text": "x"}"#),
            thread(r#"{"id": 2, "title": "b", "text": "y"}"#),
        ]);
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|e| matches!(e, ForumEvent::ThreadNew(_))));

        let second = poller.detect_events(vec![
            thread(r#"{"id": 1, "title": "a", "text": "x"}"#),
            thread(r#"{"id": 2, "title": "b", "text": "changed"}"#),
        ]);
        assert_eq!(second.len(), 1);
        assert!(matches!(&second[0], ForumEvent::ThreadUpdated(t) if t.id == Some(2)));
    }

    #[test]
    fn test_detect_events_passes_missing_ids() {
        let mut poller = poller();
        let events = poller.detect_events(vec![thread(r#"{"title": "Participation A"}"#)]);
        assert!(matches!(&events[0], ForumEvent::ThreadNew(t) if t.id.is_none()));
    }

    #[tokio::test]
    async fn test_poll_sends_token_and_query() {
        let (forum, forum_url) = spawn_forum(json!({"threads": [], "users": []})).await;
        let mut poller = poller_for(&forum_url, Arc::new(Store::new()));

        let outcome = poller.poll_once().await.unwrap();

        assert_eq!(outcome, PollOutcome::default());
        assert_eq!(forum.course.lock().as_deref(), Some("42"));
        assert_eq!(forum.auth.lock().as_deref(), Some("Bearer secret"));
        let query = forum.query.lock();
        assert_eq!(query.get("limit").map(String::as_str), Some("25"));
        assert_eq!(query.get("sort").map(String::as_str), Some("new"));
    }

    #[tokio::test]
    async fn test_poll_skips_malformed_thread() {
        let listing = json!({
            "threads": [
                participation_thread("used claude"),
                {"id": 2, "title": "Participation B HW3", "attachments": "x"}
            ],
            "users": null
        });
        let (_forum, forum_url) = spawn_forum(listing).await;
        let store = Arc::new(Store::new());
        let mut poller = poller_for(&forum_url, Arc::clone(&store) as Arc<dyn PostSink>);

        let outcome = poller.poll_once().await.unwrap();

        assert_eq!(outcome.fetched, 2);
        assert_eq!(outcome.failures, 1);
        assert_eq!(outcome.new, 1);
        assert_eq!(outcome.delivered, 1);
        assert_eq!(store.get_post(1).unwrap().author, "Alice");
        assert!(store.get_post(2).is_none());
    }

    #[tokio::test]
    async fn test_failed_delivery_is_retried_next_poll() {
        let (_forum, forum_url) =
            spawn_forum(json!({"threads": [participation_thread("used claude")]})).await;
        let (portal, sink) = spawn_portal().await;
        portal.failing.store(true, Ordering::SeqCst);
        let mut poller = poller_for(&forum_url, Arc::new(sink));

        let first = poller.poll_once().await.unwrap();
        assert_eq!(first.new, 1);
        assert_eq!(first.failures, 1);
        assert_eq!(first.delivered, 0);

        portal.failing.store(false, Ordering::SeqCst);
        let second = poller.poll_once().await.unwrap();
        assert_eq!(second.new, 1);
        assert_eq!(second.failures, 0);
        assert_eq!(second.delivered, 1);
        assert_eq!(second.submissions, 1);
    }

    #[tokio::test]
    async fn test_edited_thread_is_sent_as_put() {
        let (forum, forum_url) =
            spawn_forum(json!({"threads": [participation_thread("used claude")]})).await;
        let (portal, sink) = spawn_portal().await;
        let mut poller = poller_for(&forum_url, Arc::new(sink));

        let first = poller.poll_once().await.unwrap();
        assert_eq!(first.delivered, 1);
        assert_eq!(
            *portal.requests.lock(),
            vec![
                (Method::POST, "/api/posts".to_string()),
                (Method::POST, "/api/submissions".to_string()),
            ]
        );

        let unchanged = poller.poll_once().await.unwrap();
        assert_eq!(unchanged.new + unchanged.updated, 0);
        assert_eq!(portal.requests.lock().len(), 2);

        *forum.listing.lock() = json!({"threads": [participation_thread("used claude, then edited")]});
        portal.requests.lock().clear();
        let edited = poller.poll_once().await.unwrap();

        assert_eq!(edited.updated, 1);
        assert_eq!(edited.delivered, 1);
        assert_eq!(
            portal.requests.lock().first(),
            Some(&(Method::PUT, "/api/posts/1".to_string()))
        );
    }
}
