// src/models/mod.rs

//! Domain models for the participation portal.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod post;
mod views;

// Re-export all public types
pub use config::{
    AssistantRule, CategoryRule, ClassifierConfig, Config, ForumConfig, IngestConfig, ServerConfig,
};
pub use post::{HomeworkRef, Participation, Post, Submission, SubmissionKey, UNKNOWN_AUTHOR};
pub use views::{
    AssistantInfo, HomeworkInfo, PostView, SentimentReport, SentimentScore, StoreStats,
    StudentInfo, SubmissionView,
};
