//! Application configuration structures.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Participation;
use crate::services::Classifier;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP API settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream forum settings
    #[serde(default)]
    pub forum: ForumConfig,

    /// Delivery of ingested posts
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Classification vocabulary
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Overlay deployment values from the environment.
    pub fn apply_env(&mut self) {
        if let Ok(token) = env::var("ED_API_TOKEN") {
            self.forum.api_token = token;
        }
        if let Ok(course_id) = env::var("ED_COURSE_ID") {
            self.forum.course_id = course_id;
        }
        if let Ok(api_base_url) = env::var("API_BASE_URL") {
            self.ingest.api_base_url = api_base_url;
        }
        if let Ok(port) = env::var("PORTAL_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => log::warn!("Invalid PORTAL_PORT value '{}': {}", port, e),
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::validation("server.port must be > 0"));
        }
        if self.forum.poll_interval_secs == 0 {
            return Err(AppError::validation("forum.poll_interval_secs must be > 0"));
        }
        if self.forum.thread_limit == 0 {
            return Err(AppError::validation("forum.thread_limit must be > 0"));
        }
        if self.ingest.user_agent.trim().is_empty() {
            return Err(AppError::validation("ingest.user_agent is empty"));
        }
        if self.ingest.timeout_secs == 0 {
            return Err(AppError::validation("ingest.timeout_secs must be > 0"));
        }
        if self.ingest.max_concurrent == 0 {
            return Err(AppError::validation("ingest.max_concurrent must be > 0"));
        }
        if self.classifier.categories.is_empty() {
            return Err(AppError::validation("No participation categories defined"));
        }
        if self.classifier.assistants.is_empty() {
            return Err(AppError::validation("No assistants defined"));
        }
        Classifier::new(&self.classifier)?;
        Ok(())
    }

    /// Validate the values the forum poller needs on top of [`Config::validate`].
    pub fn validate_for_ingest(&self) -> Result<()> {
        self.validate()?;
        if self.forum.course_id.trim().is_empty() {
            return Err(AppError::config(
                "forum.course_id is empty (set ED_COURSE_ID)",
            ));
        }
        if self.forum.api_token.trim().is_empty() {
            return Err(AppError::config("forum.api_token is empty (set ED_API_TOKEN)"));
        }
        Ok(())
    }
}

/// HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::host")]
    pub host: String,

    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Load the fixed demo posts at startup
    #[serde(default = "defaults::seed_demo")]
    pub seed_demo: bool,

    /// CORS preflight cache lifetime
    #[serde(default = "defaults::cors_max_age")]
    pub cors_max_age_secs: u64,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            seed_demo: defaults::seed_demo(),
            cors_max_age_secs: defaults::cors_max_age(),
        }
    }
}

/// Upstream forum settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumConfig {
    /// Base URL of the forum REST API
    #[serde(default = "defaults::forum_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub course_id: String,

    /// Bearer token, normally supplied through `ED_API_TOKEN`
    #[serde(default, skip_serializing)]
    pub api_token: String,

    /// Public thread URL template with `{course_id}` and `{thread_id}`
    #[serde(default = "defaults::discussion_url")]
    pub discussion_url: String,

    /// Only threads whose title contains this text are ingested
    #[serde(default = "defaults::title_trigger")]
    pub title_trigger: String,

    /// Threads requested per poll
    #[serde(default = "defaults::thread_limit")]
    pub thread_limit: usize,

    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_secs: u64,
}

impl ForumConfig {
    /// Public URL of a thread.
    pub fn thread_url(&self, thread_id: u64) -> String {
        self.discussion_url
            .replace("{course_id}", &self.course_id)
            .replace("{thread_id}", &thread_id.to_string())
    }

    /// Whether a thread title passes the ingestion trigger.
    pub fn accepts_title(&self, title: &str) -> bool {
        let trigger = self.title_trigger.trim();
        trigger.is_empty() || title.to_lowercase().contains(&trigger.to_lowercase())
    }
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::forum_api_url(),
            course_id: String::new(),
            api_token: String::new(),
            discussion_url: defaults::discussion_url(),
            title_trigger: defaults::title_trigger(),
            thread_limit: defaults::thread_limit(),
            poll_interval_secs: defaults::poll_interval(),
        }
    }
}

/// Delivery of ingested posts to the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Base URL of the portal API, e.g. `http://localhost:8320/api`
    #[serde(default = "defaults::api_base_url")]
    pub api_base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent deliveries
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_base_url: defaults::api_base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Classification vocabulary. List order is match priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "defaults::categories")]
    pub categories: Vec<CategoryRule>,

    #[serde(default = "defaults::homework_pattern")]
    pub homework_pattern: String,

    /// Case-sensitive pattern tried on the raw text when the primary fails
    #[serde(default = "defaults::homework_fallback_pattern")]
    pub homework_fallback_pattern: String,

    /// Categories that never reference a homework
    #[serde(default = "defaults::no_homework_categories")]
    pub no_homework_categories: Vec<Participation>,

    #[serde(default = "defaults::assistants")]
    pub assistants: Vec<AssistantRule>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            categories: defaults::categories(),
            homework_pattern: defaults::homework_pattern(),
            homework_fallback_pattern: defaults::homework_fallback_pattern(),
            no_homework_categories: defaults::no_homework_categories(),
            assistants: defaults::assistants(),
        }
    }
}

/// Trigger pattern for a participation category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub label: Participation,
    pub pattern: String,
}

/// Recognition pattern for an assistant name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantRule {
    pub name: String,
    pub pattern: String,
}

mod defaults {
    use super::{AssistantRule, CategoryRule};
    use crate::models::Participation;

    // Server defaults
    pub fn host() -> String {
        "0.0.0.0".into()
    }
    pub fn port() -> u16 {
        8320
    }
    pub fn seed_demo() -> bool {
        true
    }
    pub fn cors_max_age() -> u64 {
        60 * 60
    }

    // Forum defaults
    pub fn forum_api_url() -> String {
        "https://us.edstem.org/api".into()
    }
    pub fn discussion_url() -> String {
        "https://edstem.org/us/courses/{course_id}/discussion/{thread_id}".into()
    }
    pub fn title_trigger() -> String {
        "Participation".into()
    }
    pub fn thread_limit() -> usize {
        100
    }
    pub fn poll_interval() -> u64 {
        30
    }

    // Ingest defaults
    pub fn api_base_url() -> String {
        "http://localhost:8320/api".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; participation-portal/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_concurrent() -> usize {
        4
    }

    // Classifier defaults
    fn category(label: Participation, letter: &str) -> CategoryRule {
        CategoryRule {
            label,
            pattern: format!(
                r"\bparticipation\s*{letter}\b|\bpart\s*{letter}\b|\bp{letter}\b"
            ),
        }
    }

    pub fn categories() -> Vec<CategoryRule> {
        vec![
            category(Participation::A, "a"),
            category(Participation::B, "b"),
            category(Participation::C, "c"),
            category(Participation::D, "d"),
            CategoryRule {
                label: Participation::E,
                pattern: r"\bparticipation\s*e\b|\bpart\s*e\b|\bpe\b|\bnon-homework\s+participation\b"
                    .into(),
            },
        ]
    }

    pub fn homework_pattern() -> String {
        r"\bhw\s*(\d+)\b|\bhomework\s*(\d+)\b".into()
    }
    pub fn homework_fallback_pattern() -> String {
        r"HW(\d+)".into()
    }
    pub fn no_homework_categories() -> Vec<Participation> {
        vec![Participation::E]
    }

    fn assistant(name: &str, pattern: &str) -> AssistantRule {
        AssistantRule {
            name: name.into(),
            pattern: pattern.into(),
        }
    }

    pub fn assistants() -> Vec<AssistantRule> {
        vec![
            assistant("Claude", r"\bclaude\b"),
            assistant("GPT-3.5", r"\bgpt-3\.5\b|\bgpt\s*3\.5\b"),
            assistant("ChatGPT", r"\bchatgpt\b|\bgpt-4o?\b|\bgpt\s*4\b"),
            assistant("Gemini", r"\bgemini\b"),
            assistant("LLaMA", r"\bllama\b"),
            assistant("Mistral", r"\bmistral\b"),
            assistant("Copilot", r"\bcopilot\b"),
        ]
    }
}
