//! PDF attachment extraction from thread payloads.

use std::collections::HashSet;

use url::Url;

use crate::services::forum::{AttachmentRef, DocumentField, ThreadPayload};

/// Whether a link points at a PDF by its path extension.
fn has_pdf_extension(link: &str) -> bool {
    let path = Url::parse(link)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| link.to_lowercase());
    path.ends_with(".pdf")
}

/// Whether an attachment is PDF-like by type, MIME, name or extension.
pub fn is_pdf_like(attachment: &AttachmentRef) -> bool {
    let mentions_pdf = |field: &Option<String>| {
        field
            .as_deref()
            .is_some_and(|v| v.to_lowercase().contains("pdf"))
    };

    mentions_pdf(&attachment.kind)
        || mentions_pdf(&attachment.mime)
        || attachment
            .name
            .as_deref()
            .is_some_and(|n| n.to_lowercase().ends_with(".pdf"))
        || attachment.link().is_some_and(has_pdf_extension)
}

fn collect_attachment(attachment: &AttachmentRef, out: &mut Vec<String>) {
    if is_pdf_like(attachment) {
        if let Some(link) = attachment.link() {
            out.push(link.to_string());
        }
    }
}

fn collect_document(document: &DocumentField, out: &mut Vec<String>) {
    match document {
        DocumentField::Attachment(attachment) => collect_attachment(attachment, out),
        DocumentField::List(attachments) => {
            for attachment in attachments {
                collect_attachment(attachment, out);
            }
        }
        DocumentField::Links(links) => {
            out.extend(links.iter().filter(|l| has_pdf_extension(l)).cloned());
        }
        DocumentField::Other(_) => {}
        DocumentField::Text(text) => {
            let text = text.trim();
            if text.starts_with('{') || text.starts_with('[') {
                // Structured document serialized as a string
                if let Ok(inner) = serde_json::from_str::<DocumentField>(text) {
                    if !matches!(inner, DocumentField::Text(_)) {
                        collect_document(&inner, out);
                    }
                }
            } else if text.starts_with("http") && has_pdf_extension(text) {
                out.push(text.to_string());
            }
        }
    }
}

/// PDF-like attachment URLs of a thread, deduplicated in first-seen order.
pub fn extract_pdf_urls(thread: &ThreadPayload) -> Vec<String> {
    let mut urls = Vec::new();

    if let Some(document) = &thread.document {
        collect_document(document, &mut urls);
    }
    for attachment in &thread.attachments {
        collect_attachment(attachment, &mut urls);
    }

    let mut seen = HashSet::new();
    urls.retain(|url| seen.insert(url.clone()));
    urls
}
