//! Forum ingestion pipeline.
//!
//! - `Poller`: fetches the thread listing and detects new or edited threads
//! - `Ingestor`: classifies a thread and delivers the post and its submission
//! - `PostSink`: delivery target, either a remote portal or a local store

pub mod attachments;
pub mod ingest;
pub mod poll;
pub mod sink;

pub use attachments::extract_pdf_urls;
pub use ingest::{IngestOutcome, Ingestor};
pub use poll::{PollOutcome, Poller};
pub use sink::{ApiSink, PostSink};
