//! Post and submission records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;

/// Display name used when the upstream author cannot be resolved.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Participation category a post satisfies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Participation {
    A,
    B,
    C,
    D,
    E,
}

impl Participation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Participation::A => "A",
            Participation::B => "B",
            Participation::C => "C",
            Participation::D => "D",
            Participation::E => "E",
        }
    }
}

impl fmt::Display for Participation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Participation {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Participation::A),
            "B" => Ok(Participation::B),
            "C" => Ok(Participation::C),
            "D" => Ok(Participation::D),
            "E" => Ok(Participation::E),
            other => Err(AppError::validation(format!(
                "unknown participation category '{other}'"
            ))),
        }
    }
}

/// Homework a post refers to.
///
/// Serialized as a bare integer, or as the strings `"N/A"` and `"unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HomeworkRef {
    Number(u32),
    /// The category is not tied to a homework.
    NotApplicable,
    /// No homework number could be detected.
    Unknown,
}

impl HomeworkRef {
    pub const NOT_APPLICABLE: &'static str = "N/A";
    pub const UNKNOWN: &'static str = "unknown";

    /// Parse a textual reference. Anything that is neither a sentinel nor a
    /// non-negative integer becomes `Unknown`.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.eq_ignore_ascii_case(Self::NOT_APPLICABLE) || s.eq_ignore_ascii_case("not applicable")
        {
            return HomeworkRef::NotApplicable;
        }
        s.parse::<u32>()
            .map(HomeworkRef::Number)
            .unwrap_or(HomeworkRef::Unknown)
    }

    pub fn number(&self) -> Option<u32> {
        match self {
            HomeworkRef::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for HomeworkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomeworkRef::Number(n) => write!(f, "{n}"),
            HomeworkRef::NotApplicable => f.write_str(Self::NOT_APPLICABLE),
            HomeworkRef::Unknown => f.write_str(Self::UNKNOWN),
        }
    }
}

impl Serialize for HomeworkRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HomeworkRef::Number(n) => serializer.serialize_u32(*n),
            HomeworkRef::NotApplicable => serializer.serialize_str(Self::NOT_APPLICABLE),
            HomeworkRef::Unknown => serializer.serialize_str(Self::UNKNOWN),
        }
    }
}

impl<'de> Deserialize<'de> for HomeworkRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HomeworkVisitor;

        impl Visitor<'_> for HomeworkVisitor {
            type Value = HomeworkRef;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a homework number or a homework sentinel string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(u32::try_from(v)
                    .map(HomeworkRef::Number)
                    .unwrap_or(HomeworkRef::Unknown))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(u32::try_from(v)
                    .map(HomeworkRef::Number)
                    .unwrap_or(HomeworkRef::Unknown))
            }

            fn visit_f64<E: de::Error>(self, _v: f64) -> Result<Self::Value, E> {
                Ok(HomeworkRef::Unknown)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(HomeworkRef::parse(v))
            }
        }

        deserializer.deserialize_any(HomeworkVisitor)
    }
}

/// A forum post with its classification attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// Upstream thread identifier
    pub post_id: u64,

    /// Upstream display number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_number: Option<u64>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub participation_type: Option<Participation>,

    #[serde(default)]
    pub homework_number: Option<HomeworkRef>,

    /// Name of the AI assistant the author reports using
    #[serde(default)]
    pub llm_agent: Option<String>,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub url: String,

    /// Upstream category label
    #[serde(default)]
    pub category: Option<String>,

    /// PDF-like attachment URLs
    #[serde(default)]
    pub pdf_urls: Option<Vec<String>>,
}

impl Post {
    /// Author name, if one is set.
    pub fn author_name(&self) -> Option<&str> {
        Some(self.author.as_str()).filter(|a| !a.is_empty())
    }

    /// Homework reference in its stored text form.
    pub fn homework_key(&self) -> Option<String> {
        self.homework_number.map(|hw| hw.to_string())
    }

    /// Assistant name, if one is set.
    pub fn assistant(&self) -> Option<&str> {
        self.llm_agent.as_deref().filter(|a| !a.is_empty())
    }

    /// Derive the submission this post evidences.
    ///
    /// Requires a category, a numeric homework, an assistant and a resolved
    /// author.
    pub fn submission(&self) -> Option<Submission> {
        let participation = self.participation_type?;
        let homework = self.homework_number?.number()?;
        let llm = self.assistant()?;
        let name = self.author_name().filter(|a| *a != UNKNOWN_AUTHOR)?;

        Some(Submission {
            name: name.to_string(),
            participation,
            homework,
            llm: llm.to_string(),
            post_url: self.url.clone(),
            timestamp: self.timestamp,
            summary: None,
            pdf_url: self
                .pdf_urls
                .as_ref()
                .and_then(|urls| urls.first().cloned()),
        })
    }
}

/// Evidence that a student used an assistant on a homework.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    /// Author display name
    pub name: String,
    pub participation: Participation,
    pub homework: u32,
    pub llm: String,
    pub post_url: String,
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub pdf_url: Option<String>,
}

impl Submission {
    pub fn key(&self) -> SubmissionKey {
        SubmissionKey::new(&self.name, &self.homework.to_string(), &self.llm)
    }
}

/// Composite identity of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubmissionKey {
    pub student: String,
    pub homework: String,
    pub llm: String,
}

impl SubmissionKey {
    pub fn new(student: &str, homework: &str, llm: &str) -> Self {
        Self {
            student: student.to_string(),
            homework: homework.to_string(),
            llm: llm.to_string(),
        }
    }
}
