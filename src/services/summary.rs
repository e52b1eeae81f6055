//! Plain-text summary over a set of posts.

use std::collections::BTreeSet;

use crate::models::{Post, UNKNOWN_AUTHOR};
use crate::utils::truncate;

/// Returned when there is nothing to summarize.
pub const NO_POSTS_MESSAGE: &str = "No posts available for this submission.";

const KEY_POINTS: usize = 5;
const DETAILED_POSTS: usize = 3;
const PREVIEW_CHARS: usize = 100;

/// Build a deterministic text report over the given posts.
pub fn generate_summary(posts: &[&Post]) -> String {
    if posts.is_empty() {
        return NO_POSTS_MESSAGE.to_string();
    }

    let content = posts
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let word_count = content.split_whitespace().count();
    let char_count = content.chars().count();

    let authors = distinct(posts.iter().filter_map(|p| p.author_name().map(str::to_string)));
    let homeworks = distinct(posts.iter().filter_map(|p| p.homework_key()));
    let assistants = distinct(posts.iter().filter_map(|p| p.assistant().map(str::to_string)));
    let categories = distinct(
        posts
            .iter()
            .filter_map(|p| p.participation_type.map(|c| c.to_string())),
    );

    let mut lines = vec![
        format!("Summary of {} post(s)", posts.len()),
        String::new(),
        format!("Students: {}", listing(&authors)),
        format!("Homeworks: {}", listing(&homeworks)),
        format!("Assistants: {}", listing(&assistants)),
        format!("Participation: {}", listing(&categories)),
        format!("Word count: {word_count}"),
        format!("Character count: {char_count}"),
    ];

    let points: Vec<&str> = content
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(KEY_POINTS)
        .collect();
    if !points.is_empty() {
        lines.push(String::new());
        lines.push("Key points:".to_string());
        lines.extend(points.iter().map(|point| format!("- {point}.")));
    }

    lines.push(String::new());
    lines.push("Posts:".to_string());
    for (i, post) in posts.iter().take(DETAILED_POSTS).enumerate() {
        lines.push(format!(
            "{}. {} ({})",
            i + 1,
            post.title,
            post.author_name().unwrap_or(UNKNOWN_AUTHOR)
        ));
        lines.push(format!("   {}", truncate(&post.content, PREVIEW_CHARS)));
    }
    if posts.len() > DETAILED_POSTS {
        lines.push(format!("...and {} more", posts.len() - DETAILED_POSTS));
    }

    lines.join("\n").trim_end().to_string()
}

fn distinct(values: impl Iterator<Item = String>) -> BTreeSet<String> {
    values.collect()
}

fn listing(values: &BTreeSet<String>) -> String {
    if values.is_empty() {
        return "none".to_string();
    }
    values.iter().cloned().collect::<Vec<_>>().join(", ")
}
