//! Post classifier.
//!
//! Extracts the participation category, the homework reference and the
//! assistant name from a post's title, body and category label. Each pass
//! walks an ordered rule list and stops at the first match, so list order is
//! the only tie-break.

use regex::{Captures, Regex, RegexBuilder};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{ClassifierConfig, HomeworkRef, Participation};

/// Classification result for one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub participation: Option<Participation>,
    pub homework: HomeworkRef,
    pub assistant: Option<String>,
}

/// Compiled classification rules.
#[derive(Debug, Clone)]
pub struct Classifier {
    categories: Vec<(Participation, Regex)>,
    homework: Regex,
    homework_fallback: Regex,
    no_homework: Vec<Participation>,
    assistants: Vec<(String, Regex)>,
}

impl Classifier {
    /// Compile the configured rules.
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let categories = config
            .categories
            .iter()
            .map(|rule| Ok((rule.label, Self::compile(&rule.pattern, true)?)))
            .collect::<Result<Vec<_>>>()?;

        let assistants = config
            .assistants
            .iter()
            .map(|rule| Ok((rule.name.clone(), Self::compile(&rule.pattern, true)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            categories,
            homework: Self::compile(&config.homework_pattern, true)?,
            homework_fallback: Self::compile(&config.homework_fallback_pattern, false)?,
            no_homework: config.no_homework_categories.clone(),
            assistants,
        })
    }

    /// Classify a post from its title, body and category label.
    pub fn classify(&self, title: &str, body: &str, category: &str) -> Annotation {
        let raw = format!("{title} {body} {category}");
        let text = raw.to_lowercase();

        let participation = self
            .categories
            .iter()
            .find(|(_, re)| re.is_match(&text))
            .map(|(label, _)| *label);

        let homework = match participation {
            Some(label) if self.no_homework.contains(&label) => HomeworkRef::NotApplicable,
            _ => self.homework_number(&text, &raw),
        };

        let assistant = self
            .assistants
            .iter()
            .find(|(_, re)| re.is_match(&text))
            .map(|(name, _)| name.clone());

        Annotation {
            participation,
            homework,
            assistant,
        }
    }

    fn homework_number(&self, text: &str, raw: &str) -> HomeworkRef {
        self.homework
            .captures(text)
            .and_then(|caps| Self::first_number(&caps))
            .or_else(|| {
                self.homework_fallback
                    .captures(raw)
                    .and_then(|caps| Self::first_number(&caps))
            })
            .map(HomeworkRef::Number)
            .unwrap_or(HomeworkRef::Unknown)
    }

    /// First participating capture group, parsed as a homework number.
    fn first_number(caps: &Captures<'_>) -> Option<u32> {
        caps.iter()
            .skip(1)
            .flatten()
            .find(|m| !m.as_str().is_empty())
            .and_then(|m| m.as_str().parse().ok())
    }

    fn compile(pattern: &str, case_insensitive: bool) -> Result<Regex> {
        RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| AppError::pattern(pattern, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(&ClassifierConfig::default()).unwrap()
    }

    #[test]
    fn test_category_trigger_phrases() {
        let c = classifier();
        for text in ["Participation A", "part a", "PA: my writeup", "participationA"] {
            assert_eq!(
                c.classify(text, "", "").participation,
                Some(Participation::A),
                "{text}"
            );
        }
        assert_eq!(
            c.classify("Part D", "", "").participation,
            Some(Participation::D)
        );
    }

    #[test]
    fn test_category_requires_token_boundary() {
        let c = classifier();
        assert_eq!(c.classify("Panda papers", "", "").participation, None);
        assert_eq!(c.classify("partial answers", "", "").participation, None);
    }

    #[test]
    fn test_category_priority_first_wins() {
        let c = classifier();
        let annotation = c.classify("Participation C", "also counts as part b", "");
        assert_eq!(annotation.participation, Some(Participation::B));
    }

    #[test]
    fn test_category_from_label() {
        let c = classifier();
        let annotation = c.classify("My write-up", "", "Participation D");
        assert_eq!(annotation.participation, Some(Participation::D));
    }

    #[test]
    fn test_homework_phrasings() {
        let c = classifier();
        assert_eq!(c.classify("hw 3", "", "").homework, HomeworkRef::Number(3));
        assert_eq!(c.classify("Homework 12", "", "").homework, HomeworkRef::Number(12));
        assert_eq!(c.classify("HW7 notes", "", "").homework, HomeworkRef::Number(7));
    }

    #[test]
    fn test_homework_zero_is_a_number() {
        let c = classifier();
        assert_eq!(c.classify("Participation A HW0", "", "").homework, HomeworkRef::Number(0));
    }

    #[test]
    fn test_homework_fallback_pattern() {
        let c = classifier();
        // `_` is a word character, so the primary pattern's boundary fails.
        let annotation = c.classify("PartA_HW4_writeup", "", "");
        assert_eq!(annotation.homework, HomeworkRef::Number(4));
    }

    #[test]
    fn test_homework_unknown_when_absent() {
        let c = classifier();
        assert_eq!(c.classify("Participation A", "no number", "").homework, HomeworkRef::Unknown);
    }

    #[test]
    fn test_category_e_has_no_homework() {
        let c = classifier();
        let annotation = c.classify("Participation E", "follow-up to HW5", "");
        assert_eq!(annotation.participation, Some(Participation::E));
        assert_eq!(annotation.homework, HomeworkRef::NotApplicable);
    }

    #[test]
    fn test_assistant_detection() {
        let c = classifier();
        assert_eq!(c.classify("used Claude", "", "").assistant.as_deref(), Some("Claude"));
        assert_eq!(c.classify("", "gpt 4 helped", "").assistant.as_deref(), Some("ChatGPT"));
        assert_eq!(c.classify("", "GPT-3.5 run", "").assistant.as_deref(), Some("GPT-3.5"));
        assert_eq!(c.classify("", "Llama 3 locally", "").assistant.as_deref(), Some("LLaMA"));
    }

    #[test]
    fn test_assistant_list_order_breaks_ties() {
        let c = classifier();
        let annotation = c.classify("Gemini vs Claude", "", "");
        assert_eq!(annotation.assistant.as_deref(), Some("Claude"));
    }

    #[test]
    fn test_no_assistant() {
        let c = classifier();
        assert_eq!(c.classify("Participation A HW1", "did it by hand", "").assistant, None);
    }

    #[test]
    fn test_deterministic() {
        let c = classifier();
        let first = c.classify("Participation B - HW2 with ChatGPT", "body", "cat");
        let second = c.classify("Participation B - HW2 with ChatGPT", "body", "cat");
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut config = ClassifierConfig::default();
        config.homework_pattern = "hw(".into();
        assert!(matches!(Classifier::new(&config), Err(AppError::Pattern { .. })));
    }
}
