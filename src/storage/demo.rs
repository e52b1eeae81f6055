//! Fixed demo records loaded at startup.

use chrono::Utc;

use crate::models::{HomeworkRef, Participation, Post};

fn demo_post(
    id: u64,
    title: &str,
    author: &str,
    content: &str,
    participation: Participation,
    homework: u32,
    llm: &str,
) -> Post {
    Post {
        post_id: id,
        post_number: None,
        title: title.to_string(),
        author: author.to_string(),
        content: content.to_string(),
        participation_type: Some(participation),
        homework_number: Some(HomeworkRef::Number(homework)),
        llm_agent: Some(llm.to_string()),
        timestamp: Utc::now(),
        url: format!("https://edstem.org/us/courses/12345/discussion/{id}"),
        category: Some("Participation".to_string()),
        pdf_urls: None,
    }
}

/// Demo posts shown before any real ingestion has happened.
pub fn demo_posts() -> Vec<Post> {
    vec![
        demo_post(
            1,
            "Participation A - HW1 using Claude",
            "Alice Johnson",
            "I used Claude to help debug my implementation...",
            Participation::A,
            1,
            "Claude",
        ),
        demo_post(
            2,
            "Participation B - HW1 with ChatGPT",
            "Bob Smith",
            "ChatGPT helped me understand the algorithm...",
            Participation::B,
            1,
            "ChatGPT",
        ),
        demo_post(
            3,
            "Participation C - HW2 Gemini assistance",
            "Carol Williams",
            "Gemini provided insights into optimization...",
            Participation::C,
            2,
            "Gemini",
        ),
    ]
}
