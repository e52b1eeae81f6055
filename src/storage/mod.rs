//! In-memory post and submission store.
//!
//! Holds the authoritative posts and submissions for the lifetime of the
//! process and answers the dashboard's read queries.
//!
//! ## Semantics
//!
//! - Posts are keyed by `post_id`. An upsert removes the previous record and
//!   appends the new one, so a replaced post moves to the end of the listing
//!   and no field of the old record survives.
//! - Submissions are keyed by `(student, homework, llm)`; last write wins.
//! - The student, homework and assistant indexes only grow. A value stays
//!   listed after the last post referencing it has been replaced.
//! - Every operation runs under one `RwLock`: mutations hold the write lock
//!   for the whole lookup-then-replace, reads build owned results under the
//!   read lock.

mod demo;

use std::collections::{BTreeSet, HashMap};

use parking_lot::RwLock;

pub use demo::demo_posts;

use crate::models::{
    AssistantInfo, HomeworkInfo, Participation, Post, PostView, StoreStats, Submission,
    SubmissionKey, SubmissionView, UNKNOWN_AUTHOR,
};
use crate::services::generate_summary;
use crate::utils::{split_csv, truncate};

/// Maximum excerpt length in the post listing.
pub const EXCERPT_CHARS: usize = 150;

/// Post listing filter. Present constraints are ANDed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub participation: Option<Vec<String>>,
    pub students: Option<Vec<String>>,
    pub homeworks: Option<Vec<String>>,
    pub llms: Option<Vec<String>>,
}

impl PostFilter {
    /// Build a filter from comma-separated query values.
    pub fn from_csv(
        participation: Option<&str>,
        students: Option<&str>,
        homeworks: Option<&str>,
        llms: Option<&str>,
    ) -> Self {
        Self {
            participation: split_csv(participation)
                .map(|values| values.into_iter().map(|v| v.to_uppercase()).collect()),
            students: split_csv(students),
            homeworks: split_csv(homeworks),
            llms: split_csv(llms),
        }
    }

    pub fn matches(&self, post: &Post) -> bool {
        Self::allows(
            &self.participation,
            post.participation_type.map(|p| p.to_string()).as_deref(),
        ) && Self::allows(&self.students, Some(post.author.as_str()))
            && Self::allows(&self.homeworks, post.homework_key().as_deref())
            && Self::allows(&self.llms, post.llm_agent.as_deref())
    }

    fn allows(constraint: &Option<Vec<String>>, value: Option<&str>) -> bool {
        match constraint {
            None => true,
            Some(allowed) => value.is_some_and(|v| allowed.iter().any(|a| a == v)),
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    posts: Vec<Post>,
    submissions: HashMap<SubmissionKey, Submission>,
    students: BTreeSet<String>,
    homeworks: BTreeSet<String>,
    assistants: BTreeSet<String>,
}

impl StoreState {
    fn observe(&mut self, author: Option<&str>, homework: Option<String>, assistant: Option<&str>) {
        if let Some(author) = author {
            self.students.insert(author.to_string());
        }
        if let Some(homework) = homework {
            self.homeworks.insert(homework);
        }
        if let Some(assistant) = assistant {
            self.assistants.insert(assistant.to_string());
        }
    }
}

/// Process-lifetime store shared by the API and the ingestion sink.
#[derive(Debug, Default)]
pub struct Store {
    state: RwLock<StoreState>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a post, replacing any post with the same identifier.
    pub fn upsert_post(&self, post: Post) {
        let mut state = self.state.write();
        state.posts.retain(|p| p.post_id != post.post_id);
        state.observe(post.author_name(), post.homework_key(), post.assistant());
        state.posts.push(post);
    }

    /// Insert a submission, replacing any with the same composite key.
    pub fn upsert_submission(&self, submission: Submission) {
        let mut state = self.state.write();
        state.observe(
            Some(submission.name.as_str()).filter(|n| !n.is_empty()),
            Some(submission.homework.to_string()),
            Some(submission.llm.as_str()).filter(|l| !l.is_empty()),
        );
        state.submissions.insert(submission.key(), submission);
    }

    /// Load the fixed demo posts. Returns how many were loaded.
    pub fn seed_demo(&self) -> usize {
        let posts = demo_posts();
        let count = posts.len();
        for post in posts {
            self.upsert_post(post);
        }
        count
    }

    /// Known student names, sorted.
    pub fn list_students(&self) -> Vec<String> {
        self.state.read().students.iter().cloned().collect()
    }

    /// Known homeworks in numeric order, with the students and assistants
    /// seen on posts carrying each one. Sentinels sort as zero.
    pub fn list_homeworks(&self) -> Vec<HomeworkInfo> {
        let state = self.state.read();

        let mut numbers: Vec<&String> = state.homeworks.iter().collect();
        numbers.sort_by(|a, b| {
            let rank = |hw: &str| hw.parse::<i64>().unwrap_or(0);
            rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
        });

        numbers
            .into_iter()
            .map(|number| {
                let mut students = BTreeSet::new();
                let mut llms = BTreeSet::new();
                for post in state
                    .posts
                    .iter()
                    .filter(|p| p.homework_key().as_ref() == Some(number))
                {
                    if let Some(author) = post.author_name() {
                        students.insert(author.to_string());
                    }
                    if let Some(llm) = post.assistant() {
                        llms.insert(llm.to_string());
                    }
                }
                HomeworkInfo {
                    number: number.clone(),
                    students: students.into_iter().collect(),
                    llms: llms.into_iter().collect(),
                }
            })
            .collect()
    }

    /// Known assistants in alphabetical order, with the students and
    /// homeworks seen on posts naming each one.
    pub fn list_assistants(&self) -> Vec<AssistantInfo> {
        let state = self.state.read();

        state
            .assistants
            .iter()
            .map(|name| {
                let mut students = BTreeSet::new();
                let mut homeworks = BTreeSet::new();
                for post in state
                    .posts
                    .iter()
                    .filter(|p| p.assistant() == Some(name.as_str()))
                {
                    if let Some(author) = post.author_name() {
                        students.insert(author.to_string());
                    }
                    if let Some(homework) = post.homework_key() {
                        homeworks.insert(homework);
                    }
                }
                AssistantInfo {
                    name: name.clone(),
                    students: students.into_iter().collect(),
                    homeworks: homeworks.into_iter().collect(),
                }
            })
            .collect()
    }

    /// Known assistant names, sorted.
    pub fn known_assistants(&self) -> Vec<String> {
        self.state.read().assistants.iter().cloned().collect()
    }

    /// Filtered post listing in display shape.
    pub fn get_posts(&self, filter: &PostFilter) -> Vec<PostView> {
        self.state
            .read()
            .posts
            .iter()
            .filter(|p| filter.matches(p))
            .map(Self::view)
            .collect()
    }

    /// Look up one post by identifier.
    pub fn get_post(&self, post_id: u64) -> Option<Post> {
        self.state
            .read()
            .posts
            .iter()
            .find(|p| p.post_id == post_id)
            .cloned()
    }

    /// Stored submission with a fresh summary, or a synthesized one when
    /// nothing is stored under the key.
    pub fn get_submission(&self, student: &str, homework: &str, llm: &str) -> SubmissionView {
        let state = self.state.read();

        let candidates: Vec<&Post> = state
            .posts
            .iter()
            .filter(|p| {
                p.author == student
                    && p.homework_key().as_deref() == Some(homework)
                    && p.assistant() == Some(llm)
            })
            .collect();
        let generated = generate_summary(&candidates);

        match state.submissions.get(&SubmissionKey::new(student, homework, llm)) {
            Some(stored) => SubmissionView {
                student: stored.name.clone(),
                homework: stored.homework.to_string(),
                llm: stored.llm.clone(),
                participation: Some(stored.participation),
                post_url: Some(stored.post_url.clone()),
                timestamp: Some(stored.timestamp.to_rfc3339()),
                pdf_url: stored.pdf_url.clone(),
                summary: stored
                    .summary
                    .clone()
                    .filter(|s| !s.is_empty())
                    .unwrap_or(generated),
                post_count: candidates.len(),
            },
            None => SubmissionView {
                student: student.to_string(),
                homework: homework.to_string(),
                llm: llm.to_string(),
                participation: None,
                post_url: None,
                timestamp: None,
                pdf_url: None,
                summary: generated,
                post_count: 0,
            },
        }
    }

    /// Counts for the health endpoint.
    pub fn stats(&self) -> StoreStats {
        let state = self.state.read();
        StoreStats {
            posts: state.posts.len(),
            submissions: state.submissions.len(),
            students: state.students.len(),
            homeworks: state.homeworks.len(),
            llms: state.assistants.len(),
        }
    }

    fn view(post: &Post) -> PostView {
        PostView {
            post_id: post.post_id,
            title: if post.title.is_empty() {
                "Untitled".to_string()
            } else {
                post.title.clone()
            },
            author: post.author_name().unwrap_or(UNKNOWN_AUTHOR).to_string(),
            participation: post.participation_type.unwrap_or(Participation::A),
            homework: post.homework_key(),
            llm: post.llm_agent.clone(),
            content: post.content.clone(),
            excerpt: truncate(&post.content, EXCERPT_CHARS),
            url: if post.url.is_empty() {
                "#".to_string()
            } else {
                post.url.clone()
            },
        }
    }
}
