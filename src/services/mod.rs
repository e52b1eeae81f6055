//! Service layer for the participation portal.
//!
//! This module contains the business logic for:
//! - Post classification (`Classifier`)
//! - Submission summaries (`generate_summary`)
//! - Placeholder sentiment scores (`mock_sentiment`)
//! - Forum API access (`ForumClient`)

mod classifier;
pub mod forum;
mod sentiment;
mod summary;

pub use classifier::{Annotation, Classifier};
pub use forum::{ForumClient, ForumEvent, ThreadListing, ThreadPayload, UserDirectory};
pub use sentiment::{label as sentiment_label, mock_sentiment};
pub use summary::{NO_POSTS_MESSAGE, generate_summary};
