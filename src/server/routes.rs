//! API route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::SharedStore;
use crate::error::{AppError, Result};
use crate::models::{
    AssistantInfo, HomeworkInfo, Post, PostView, SentimentReport, StudentInfo, Submission,
    SubmissionView,
};
use crate::services::mock_sentiment;
use crate::storage::PostFilter;
use crate::utils::split_csv;

/// Service name reported by the health check.
pub const SERVICE_NAME: &str = "Course Participation API";

/// Comma-separated post filters.
#[derive(Debug, Default, Deserialize)]
pub struct PostQuery {
    pub participation: Option<String>,
    pub students: Option<String>,
    pub homeworks: Option<String>,
    pub llms: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionQuery {
    pub student: String,
    pub homework: String,
    pub llm: String,
}

/// Only `llms` narrows the report; other dashboard filters are accepted and ignored.
#[derive(Debug, Default, Deserialize)]
pub struct SentimentQuery {
    pub llms: Option<String>,
}

/// GET /
pub async fn health(State(store): State<SharedStore>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "stats": store.stats(),
    }))
}

/// GET /api/students
pub async fn students(State(store): State<SharedStore>) -> Json<Vec<StudentInfo>> {
    Json(
        store
            .list_students()
            .into_iter()
            .map(|name| StudentInfo { name })
            .collect(),
    )
}

/// GET /api/homeworks
pub async fn homeworks(State(store): State<SharedStore>) -> Json<Vec<HomeworkInfo>> {
    Json(store.list_homeworks())
}

/// GET /api/llms
pub async fn llms(State(store): State<SharedStore>) -> Json<Vec<AssistantInfo>> {
    Json(store.list_assistants())
}

/// GET /api/posts
pub async fn posts(
    State(store): State<SharedStore>,
    Query(query): Query<PostQuery>,
) -> Json<Vec<PostView>> {
    let filter = PostFilter::from_csv(
        query.participation.as_deref(),
        query.students.as_deref(),
        query.homeworks.as_deref(),
        query.llms.as_deref(),
    );
    Json(store.get_posts(&filter))
}

/// GET /api/submissions
pub async fn submission(
    State(store): State<SharedStore>,
    Query(query): Query<SubmissionQuery>,
) -> Json<SubmissionView> {
    Json(store.get_submission(&query.student, &query.homework, &query.llm))
}

/// GET /api/sentiment
pub async fn sentiment(
    State(store): State<SharedStore>,
    Query(query): Query<SentimentQuery>,
) -> Json<SentimentReport> {
    let names = split_csv(query.llms.as_deref()).unwrap_or_else(|| store.known_assistants());
    Json(mock_sentiment(names.iter().map(String::as_str)))
}

/// POST /api/posts
pub async fn create_post(State(store): State<SharedStore>, Json(post): Json<Post>) -> Json<Value> {
    let post_id = post.post_id;
    log::debug!("Upserting post {}", post_id);
    store.upsert_post(post);
    Json(json!({ "status": "success", "post_id": post_id }))
}

/// PUT /api/posts/:post_id
pub async fn update_post(
    State(store): State<SharedStore>,
    Path(post_id): Path<u64>,
    Json(post): Json<Post>,
) -> Result<Json<Value>> {
    if post.post_id != post_id {
        return Err(AppError::validation(format!(
            "path post id {} does not match body post id {}",
            post_id, post.post_id
        )));
    }
    store.upsert_post(post);
    Ok(Json(json!({ "status": "success", "post_id": post_id })))
}

/// POST /api/submissions
pub async fn create_submission(
    State(store): State<SharedStore>,
    Json(submission): Json<Submission>,
) -> Json<Value> {
    store.upsert_submission(submission);
    Json(json!({ "status": "success" }))
}
