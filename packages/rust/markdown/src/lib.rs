//! Markdown text passes for the publishing toolkit.
//!
//! - [`zones`]: classify a byte offset as code, link, URL, heading, or plain
//! - [`annotate`]: link catalog terms in plain text under per-term and
//!   per-document budgets, and undo those links
//! - [`catalog`]: the ordered term dictionary and its markdown source
//! - [`links`]: cross-article link and EIP mirror rewrites
//!
//! Everything here is a pure `&str -> String` transformation; file I/O stays
//! with the callers.

pub mod annotate;
pub mod catalog;
pub mod links;
pub mod zones;

pub use annotate::{
    AnnotateOptions, Annotation, Replacement, annotate, is_heavily_annotated, remove_term_link,
    remove_term_links,
};
pub use catalog::{TermDictionary, load_catalog, parse_catalog};
pub use links::{LinkChange, article_url_map, rewrite_article_links, rewrite_eip_mirrors};
pub use zones::{Zone, classify, is_plain};

/// Title taken from the first non-blank line, without heading markers.
///
/// Returns an empty string for a blank document.
pub fn title_from_document(content: &str) -> String {
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches('#').trim().to_string())
        .unwrap_or_default()
}

/// Cut `summary` to at most `max_chars` characters, ending in `...` when cut.
pub fn trim_summary(summary: &str, max_chars: usize) -> String {
    if summary.chars().count() <= max_chars {
        return summary.to_string();
    }
    let kept: String = summary.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
