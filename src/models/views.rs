//! Read-side shapes served to the dashboard.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::Participation;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudentInfo {
    pub name: String,
}

/// A homework with the students and assistants seen on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HomeworkInfo {
    pub number: String,
    pub students: Vec<String>,
    pub llms: Vec<String>,
}

/// An assistant with the students and homeworks seen using it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssistantInfo {
    pub name: String,
    pub students: Vec<String>,
    pub homeworks: Vec<String>,
}

/// Display projection of a stored post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostView {
    pub post_id: u64,
    pub title: String,
    pub author: String,
    pub participation: Participation,
    pub homework: Option<String>,
    pub llm: Option<String>,
    pub content: String,
    pub excerpt: String,
    pub url: String,
}

/// A stored submission, or one synthesized from the matching posts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionView {
    pub student: String,
    pub homework: String,
    pub llm: String,
    pub participation: Option<Participation>,
    pub post_url: Option<String>,
    pub timestamp: Option<String>,
    #[serde(rename = "pdfUrl")]
    pub pdf_url: Option<String>,
    pub summary: String,
    pub post_count: usize,
}

/// Counts reported by the health endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreStats {
    pub posts: usize,
    pub submissions: usize,
    pub students: usize,
    pub homeworks: usize,
    pub llms: usize,
}

/// Placeholder sentiment for one assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentScore {
    pub score: f64,
    pub sentiment: String,
}

pub type SentimentReport = HashMap<String, SentimentScore>;
