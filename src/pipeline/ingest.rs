// src/pipeline/ingest.rs

//! Turns forum events into classified posts and delivers them.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{Config, Post};
use crate::pipeline::attachments::extract_pdf_urls;
use crate::pipeline::sink::PostSink;
use crate::services::forum::{ForumEvent, ThreadPayload, UserDirectory};
use crate::services::Classifier;

/// What happened to a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Dropped by the title trigger
    Filtered,
    /// Post delivered, with or without a derived submission
    Delivered { submission: bool },
    /// Event carries nothing to store
    Ignored,
}

/// Classifies forum threads and hands them to a sink.
pub struct Ingestor {
    config: Arc<Config>,
    classifier: Classifier,
    sink: Arc<dyn PostSink>,
}

impl Ingestor {
    pub fn new(config: Arc<Config>, sink: Arc<dyn PostSink>) -> Result<Self> {
        let classifier = Classifier::new(&config.classifier)?;
        Ok(Self {
            config,
            classifier,
            sink,
        })
    }

    /// Build a classified post from a thread.
    ///
    /// Returns `Ok(None)` when the title trigger rejects the thread, and a
    /// validation error when the thread has no identifier.
    pub fn build_post(&self, thread: &ThreadPayload, users: &UserDirectory) -> Result<Option<Post>> {
        let forum = &self.config.forum;
        if !forum.accepts_title(&thread.title) {
            return Ok(None);
        }

        let post_id = thread
            .id
            .ok_or_else(|| AppError::validation(format!("thread '{}' has no id", thread.title)))?;

        let (_, body) = thread.body();
        let category = thread.category_name();
        let annotation = self.classifier.classify(&thread.title, &body, &category);
        let pdf_urls = extract_pdf_urls(thread);

        Ok(Some(Post {
            post_id,
            post_number: thread.number,
            title: thread.title.clone(),
            author: thread.author(users),
            content: body,
            participation_type: annotation.participation,
            homework_number: Some(annotation.homework),
            llm_agent: annotation.assistant,
            timestamp: Utc::now(),
            url: forum.thread_url(post_id),
            category: Some(category).filter(|c| !c.is_empty()),
            pdf_urls: (!pdf_urls.is_empty()).then_some(pdf_urls),
        }))
    }

    /// Process one forum event.
    pub async fn handle(&self, event: ForumEvent, users: &UserDirectory) -> Result<IngestOutcome> {
        let (thread, is_update) = match event {
            ForumEvent::ThreadNew(thread) => (thread, false),
            ForumEvent::ThreadUpdated(thread) => (thread, true),
            ForumEvent::CommentNew { thread_id } => {
                log::debug!("Comment on thread {:?}; nothing to ingest", thread_id);
                return Ok(IngestOutcome::Ignored);
            }
        };

        let Some(post) = self.build_post(&thread, users)? else {
            log::debug!("Skipping thread '{}' (no title trigger)", thread.title);
            return Ok(IngestOutcome::Filtered);
        };

        log::info!(
            "Thread {} '{}' by {}: category={} homework={} assistant={} attachments={}",
            post.post_id,
            post.title,
            post.author,
            post.participation_type
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            post.homework_key().unwrap_or_default(),
            post.assistant().unwrap_or("-"),
            post.pdf_urls.as_ref().map_or(0, Vec::len),
        );

        if is_update {
            self.sink.update_post(&post).await?;
        } else {
            self.sink.upsert_post(&post).await?;
        }
        log::info!("Delivered post {}", post.post_id);

        let submission = match post.submission() {
            Some(submission) => {
                self.sink.upsert_submission(&submission).await?;
                log::info!(
                    "Recorded submission {} / HW{} / {}",
                    submission.name,
                    submission.homework,
                    submission.llm
                );
                true
            }
            None => {
                log::debug!("Post {} does not qualify as a submission", post.post_id);
                false
            }
        };

        Ok(IngestOutcome::Delivered { submission })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HomeworkRef, Participation};
    use crate::storage::Store;

    fn thread(json: &str) -> ThreadPayload {
        serde_json::from_str(json).unwrap()
    }

    fn ingestor(store: Arc<Store>) -> Ingestor {
        let mut config = Config::default();
        config.forum.course_id = "42".into();
        Ingestor::new(Arc::new(config), store).unwrap()
    }

    #[test]
    fn test_build_post_classifies_and_links() {
        let ingestor = ingestor(Arc::new(Store::new()));
        let users: UserDirectory = [(9, "Alice".to_string())].into_iter().collect();
        let t = thread(
            r#"{
                "id": 77,
                "number": 310,
                "title": "Participation A: HW3",
                "text": "I used Claude for the proofs",
                "user_id": 9,
                "category": {"name": "Assignments"},
                "attachments": [{"url": "https://f.example.com/log.pdf"}]
            }"#,
        );

        let post = ingestor.build_post(&t, &users).unwrap().unwrap();
        assert_eq!(post.post_id, 77);
        assert_eq!(post.post_number, Some(310));
        assert_eq!(post.author, "Alice");
        assert_eq!(post.participation_type, Some(Participation::A));
        assert_eq!(post.homework_number, Some(HomeworkRef::Number(3)));
        assert_eq!(post.llm_agent.as_deref(), Some("Claude"));
        assert_eq!(post.url, "https://edstem.org/us/courses/42/discussion/77");
        assert_eq!(post.category.as_deref(), Some("Assignments"));
        assert_eq!(post.pdf_urls, Some(vec!["https://f.example.com/log.pdf".to_string()]));
    }

    #[test]
    fn test_title_trigger_filters_before_id_check() {
        let ingestor = ingestor(Arc::new(Store::new()));
        let t = thread(r#"{"title": "Office hours moved"}"#);
        assert!(ingestor.build_post(&t, &UserDirectory::new()).unwrap().is_none());
    }

    #[test]
    fn test_missing_id_rejected() {
        let ingestor = ingestor(Arc::new(Store::new()));
        let t = thread(r#"{"title": "participation B hw1"}"#);
        let err = ingestor.build_post(&t, &UserDirectory::new()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_handle_delivers_post_and_submission() {
        let store = Arc::new(Store::new());
        let ingestor = ingestor(Arc::clone(&store));
        let t = thread(
            r#"{"id": 1, "title": "Participation B - HW2", "text": "ChatGPT helped", "user": {"name": "Bob"}}"#,
        );

        let outcome = ingestor
            .handle(ForumEvent::ThreadNew(t), &UserDirectory::new())
            .await
            .unwrap();

        assert_eq!(outcome, IngestOutcome::Delivered { submission: true });
        assert_eq!(store.stats().posts, 1);
        assert_eq!(store.stats().submissions, 1);
        assert_eq!(
            store.get_submission("Bob", "2", "ChatGPT").participation,
            Some(Participation::B)
        );
    }

    #[tokio::test]
    async fn test_unknown_author_gets_no_submission() {
        let store = Arc::new(Store::new());
        let ingestor = ingestor(Arc::clone(&store));
        let t = thread(r#"{"id": 2, "title": "Participation C hw4", "text": "used gemini"}"#);

        let outcome = ingestor
            .handle(ForumEvent::ThreadUpdated(t), &UserDirectory::new())
            .await
            .unwrap();

        assert_eq!(outcome, IngestOutcome::Delivered { submission: false });
        assert_eq!(store.get_post(2).unwrap().author, "Unknown");
        assert_eq!(store.stats().submissions, 0);
    }

    #[tokio::test]
    async fn test_filtered_and_comment_events() {
        let store = Arc::new(Store::new());
        let ingestor = ingestor(Arc::clone(&store));
        let users = UserDirectory::new();

        let filtered = ingestor
            .handle(ForumEvent::ThreadNew(thread(r#"{"id": 3, "title": "Exam logistics"}"#)), &users)
            .await
            .unwrap();
        let comment = ingestor
            .handle(ForumEvent::CommentNew { thread_id: Some(3) }, &users)
            .await
            .unwrap();

        assert_eq!(filtered, IngestOutcome::Filtered);
        assert_eq!(comment, IngestOutcome::Ignored);
        assert_eq!(store.stats().posts, 0);
    }
}
