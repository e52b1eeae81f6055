// src/pipeline/sink.rs

//! Delivery targets for ingested posts.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{Post, Submission};
use crate::storage::Store;
use crate::utils::http::endpoint;

/// Destination for classified posts and derived submissions.
#[async_trait]
pub trait PostSink: Send + Sync {
    /// Create or replace a post.
    async fn upsert_post(&self, post: &Post) -> Result<()>;

    /// Replace an existing post. Same as an upsert unless the target
    /// distinguishes the two.
    async fn update_post(&self, post: &Post) -> Result<()> {
        self.upsert_post(post).await
    }

    /// Create or replace a submission.
    async fn upsert_submission(&self, submission: &Submission) -> Result<()>;
}

/// Delivers to a running portal over its HTTP API.
pub struct ApiSink {
    client: Client,
    base_url: String,
}

impl ApiSink {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn check(url: &str, response: Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AppError::upstream(url, status))
        }
    }

    async fn post_json<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<()> {
        let url = endpoint(&self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        Self::check(&url, response)
    }
}

#[async_trait]
impl PostSink for ApiSink {
    async fn upsert_post(&self, post: &Post) -> Result<()> {
        self.post_json("posts", post).await
    }

    async fn update_post(&self, post: &Post) -> Result<()> {
        let url = endpoint(&self.base_url, &format!("posts/{}", post.post_id));
        let response = self.client.put(&url).json(post).send().await?;
        Self::check(&url, response)
    }

    async fn upsert_submission(&self, submission: &Submission) -> Result<()> {
        self.post_json("submissions", submission).await
    }
}

/// Delivers straight into an in-process store.
#[async_trait]
impl PostSink for Store {
    async fn upsert_post(&self, post: &Post) -> Result<()> {
        Store::upsert_post(self, post.clone());
        Ok(())
    }

    async fn upsert_submission(&self, submission: &Submission) -> Result<()> {
        Store::upsert_submission(self, submission.clone());
        Ok(())
    }
}
