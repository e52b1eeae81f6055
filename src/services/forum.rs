// src/services/forum.rs

//! Forum API client and upstream payload shapes.
//!
//! The forum sends several shapes for the same concept (a user may be an
//! embedded object or a bare id, a category may be an object or a label, a
//! document may be a JSON string, an object, a list or a plain URL). Each
//! is modelled as an untagged enum so that resolution is a `match` over
//! known shapes rather than field probing.

use std::collections::HashMap;

use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{ForumConfig, UNKNOWN_AUTHOR};
use crate::utils::http::endpoint;
use crate::utils::markup_to_text;

/// Where a post body was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySource {
    PlainText,
    Markup,
    Title,
}

/// Body fields in the order they are tried.
pub const BODY_PRIORITY: [BodySource; 3] =
    [BodySource::PlainText, BodySource::Markup, BodySource::Title];

/// User id to display name, from a thread listing.
pub type UserDirectory = HashMap<u64, String>;

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response of the thread listing endpoint.
///
/// Threads and users stay raw until [`ThreadListing::decode_threads`] and
/// [`ThreadListing::user_directory`], so one odd entry cannot fail the
/// whole listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadListing {
    #[serde(default, deserialize_with = "null_as_default")]
    pub threads: Vec<Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub users: Vec<Value>,
}

impl ThreadListing {
    /// Decode every thread on its own, paired with its id when one is readable.
    pub fn decode_threads(&self) -> Vec<(Option<u64>, Result<ThreadPayload>)> {
        self.threads
            .iter()
            .map(|raw| {
                let id = raw.get("id").and_then(Value::as_u64);
                (id, ThreadPayload::deserialize(raw).map_err(AppError::from))
            })
            .collect()
    }

    /// Named users of the listing. Entries without an id or name are skipped.
    pub fn user_directory(&self) -> UserDirectory {
        self.users
            .iter()
            .filter_map(|raw| ForumUser::deserialize(raw).ok())
            .filter_map(|u| Some((u.id?, u.name)).filter(|(_, name)| !name.is_empty()))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForumUser {
    #[serde(default)]
    pub id: Option<u64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// A thread as sent by the forum.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadPayload {
    #[serde(default)]
    pub id: Option<u64>,

    /// Course-local display number
    #[serde(default)]
    pub number: Option<u64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    /// Plain-text body
    #[serde(default)]
    pub text: Option<String>,

    /// Markup body
    #[serde(default)]
    pub content: Option<String>,

    /// Plain-text or markup document, or an attachment descriptor
    #[serde(default)]
    pub document: Option<DocumentField>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<AttachmentRef>,

    #[serde(default)]
    pub user: Option<UserRef>,

    #[serde(default)]
    pub user_id: Option<u64>,

    #[serde(default)]
    pub category: Option<CategoryRef>,
}

impl ThreadPayload {
    /// Resolve the body following [`BODY_PRIORITY`]. Never empty unless the
    /// title is.
    pub fn body(&self) -> (BodySource, String) {
        for source in BODY_PRIORITY {
            let candidate = match source {
                BodySource::PlainText => self
                    .text
                    .clone()
                    .or_else(|| self.document.as_ref().and_then(|d| d.plain_text()).map(str::to_string)),
                BodySource::Markup => self
                    .content
                    .as_deref()
                    .or_else(|| self.document.as_ref().and_then(|d| d.markup()))
                    .map(markup_to_text),
                BodySource::Title => Some(self.title.clone()),
            };
            if let Some(body) = candidate.filter(|b| !b.trim().is_empty()) {
                return (source, body);
            }
        }
        (BodySource::Title, self.title.clone())
    }

    /// Resolve the author's display name.
    pub fn author(&self, users: &UserDirectory) -> String {
        let by_id = |id: u64| users.get(&id).cloned();
        let resolved = match &self.user {
            Some(UserRef::Profile { name: Some(name), .. }) if !name.is_empty() => {
                Some(name.clone())
            }
            Some(UserRef::Profile { id: Some(id), .. }) => by_id(*id),
            Some(UserRef::Name(name)) if !name.is_empty() => Some(name.clone()),
            Some(UserRef::Id(id)) => by_id(*id),
            _ => None,
        };

        resolved
            .or_else(|| self.user_id.and_then(by_id))
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
    }

    /// Category label, empty when absent.
    pub fn category_name(&self) -> String {
        match &self.category {
            Some(CategoryRef::Named { name }) => name.clone(),
            Some(CategoryRef::Label(label)) => label.clone(),
            None => String::new(),
        }
    }
}

/// Author reference shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(u64),
    Name(String),
    Profile {
        #[serde(default)]
        id: Option<u64>,
        #[serde(default)]
        name: Option<String>,
    },
}

/// Category reference shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Label(String),
    Named {
        #[serde(default, deserialize_with = "null_as_default")]
        name: String,
    },
}

/// Document field shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DocumentField {
    Text(String),
    List(Vec<AttachmentRef>),
    /// Bare file links
    Links(Vec<String>),
    Attachment(AttachmentRef),
    /// Any other shape; carries neither body text nor attachments.
    Other(Value),
}

impl DocumentField {
    /// The text, when this is a string that is not JSON, markup or a URL.
    pub fn plain_text(&self) -> Option<&str> {
        match self {
            DocumentField::Text(text) => {
                let trimmed = text.trim();
                let structured = trimmed.starts_with('{') || trimmed.starts_with('[');
                let markup = trimmed.starts_with('<');
                (!structured && !markup && !trimmed.starts_with("http")).then_some(text.as_str())
            }
            _ => None,
        }
    }

    /// The text, when this is a markup string.
    pub fn markup(&self) -> Option<&str> {
        match self {
            DocumentField::Text(text) if text.trim_start().starts_with('<') => Some(text.as_str()),
            _ => None,
        }
    }
}

/// A file reference attached to a thread.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AttachmentRef {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub file: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default, alias = "mime_type")]
    pub mime: Option<String>,
}

impl AttachmentRef {
    /// Link to the file, preferring `url` over `file`.
    pub fn link(&self) -> Option<&str> {
        self.url
            .as_deref()
            .or(self.file.as_deref())
            .filter(|l| !l.is_empty())
    }
}

/// Events the ingestion pipeline reacts to.
#[derive(Debug, Clone)]
pub enum ForumEvent {
    ThreadNew(ThreadPayload),
    ThreadUpdated(ThreadPayload),
    CommentNew { thread_id: Option<u64> },
}

/// Client for the forum REST API.
pub struct ForumClient {
    client: Client,
    config: ForumConfig,
}

impl ForumClient {
    pub fn new(client: Client, config: ForumConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ForumConfig {
        &self.config
    }

    /// Fetch the most recent threads of the configured course.
    pub async fn fetch_threads(&self) -> Result<ThreadListing> {
        let url = endpoint(
            &self.config.api_url,
            &format!("courses/{}/threads", self.config.course_id),
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_token)
            .query(&[
                ("limit", self.config.thread_limit.to_string()),
                ("sort", "new".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(url, status));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(json: &str) -> ThreadPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_body_prefers_plain_text() {
        let t = thread(r#"{"id": 1, "title": "T", "text": "plain", "content": "<p>markup</p>"}"#);
        assert_eq!(t.body(), (BodySource::PlainText, "plain".to_string()));
    }

    #[test]
    fn test_body_uses_plain_document() {
        let t = thread(r#"{"id": 1, "title": "T", "document": "doc text", "content": "<p>markup</p>"}"#);
        assert_eq!(t.body(), (BodySource::PlainText, "doc text".to_string()));
    }

    #[test]
    fn test_body_falls_back_to_markup() {
        let t = thread(r#"{"id": 1, "title": "T", "text": "  ", "content": "<p>Used <b>Claude</b></p>"}"#);
        assert_eq!(t.body(), (BodySource::Markup, "Used Claude".to_string()));
    }

    #[test]
    fn test_body_reads_markup_document() {
        let t = thread(r#"{"id": 1, "title": "T", "document": "<document><paragraph>Gemini notes</paragraph></document>"}"#);
        assert_eq!(t.body(), (BodySource::Markup, "Gemini notes".to_string()));
    }

    #[test]
    fn test_body_falls_back_to_title() {
        let t = thread(r#"{"id": 1, "title": "Participation A HW1", "document": "https://x/a.pdf"}"#);
        assert_eq!(t.body(), (BodySource::Title, "Participation A HW1".to_string()));
    }

    #[test]
    fn test_author_shapes() {
        let users: UserDirectory = [(7, "Dana".to_string())].into_iter().collect();

        assert_eq!(thread(r#"{"user": {"name": "Alice"}}"#).author(&users), "Alice");
        assert_eq!(thread(r#"{"user": {"id": 7}}"#).author(&users), "Dana");
        assert_eq!(thread(r#"{"user": "Bob"}"#).author(&users), "Bob");
        assert_eq!(thread(r#"{"user": 7}"#).author(&users), "Dana");
        assert_eq!(thread(r#"{"user_id": 7}"#).author(&users), "Dana");
        assert_eq!(thread(r#"{"user_id": 8}"#).author(&users), UNKNOWN_AUTHOR);
        assert_eq!(thread(r#"{}"#).author(&users), UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_category_shapes() {
        assert_eq!(thread(r#"{"category": {"name": "Special"}}"#).category_name(), "Special");
        assert_eq!(thread(r#"{"category": "General"}"#).category_name(), "General");
        assert_eq!(thread(r#"{}"#).category_name(), "");
    }

    #[test]
    fn test_listing_user_directory() {
        let listing: ThreadListing = serde_json::from_str(
            r#"{
                "threads": [{"id": 1, "title": "x"}],
                "users": [{"id": 3, "name": "Eve"}, {"id": 4}, {"name": "No Id"}, {"id": 5, "name": null}, "junk"]
            }"#,
        )
        .unwrap();
        let users = listing.user_directory();
        assert_eq!(users.len(), 1);
        assert_eq!(users.get(&3).map(String::as_str), Some("Eve"));
    }

    #[test]
    fn test_listing_tolerates_nulls_and_odd_shapes() {
        let listing: ThreadListing = serde_json::from_str(
            r#"{
                "threads": [
                    {"id": 1, "title": "Participation A", "attachments": null},
                    {"id": 2, "title": "Participation B", "category": {"id": 7}},
                    {"id": 3, "title": null, "document": ["a.pdf", "b.pdf"]},
                    {"id": 4, "title": "Participation C", "document": 42}
                ],
                "users": null
            }"#,
        )
        .unwrap();

        let decoded = listing.decode_threads();
        assert_eq!(decoded.len(), 4);
        for (id, thread) in &decoded {
            let thread = thread.as_ref().unwrap();
            assert_eq!(thread.id, *id);
        }

        let second = decoded[1].1.as_ref().unwrap();
        assert_eq!(second.category_name(), "");
        let third = decoded[2].1.as_ref().unwrap();
        assert!(third.title.is_empty());
        assert!(matches!(third.document, Some(DocumentField::Links(_))));
        let fourth = decoded[3].1.as_ref().unwrap();
        assert!(matches!(fourth.document, Some(DocumentField::Other(_))));
        assert_eq!(fourth.body().1, "Participation C");
        assert!(listing.user_directory().is_empty());
    }

    #[test]
    fn test_malformed_thread_fails_alone() {
        let listing: ThreadListing = serde_json::from_str(
            r#"{"threads": [
                {"id": 1, "title": "Participation A"},
                {"id": 2, "title": "Participation B", "attachments": "not-a-list"},
                "not-a-thread"
            ]}"#,
        )
        .unwrap();

        let decoded = listing.decode_threads();
        assert!(decoded[0].1.is_ok());
        assert_eq!(decoded[1].0, Some(2));
        assert!(matches!(decoded[1].1, Err(AppError::Json(_))));
        assert_eq!(decoded[2].0, None);
        assert!(decoded[2].1.is_err());
    }
}
