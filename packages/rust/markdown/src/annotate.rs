//! Term annotation: turn plain-text terminology into markdown links.
//!
//! One pass walks the dictionary in order. For each term the matches are
//! recomputed on the current text and spliced from the highest offset down,
//! so earlier offsets stay valid. A match is accepted only when it lies in a
//! [`Zone::Plain`](crate::zones::Zone::Plain) position, its line has not yet
//! received this term, and both the per-term and per-document budgets allow
//! it.
//!
//! The pass is not idempotent. Running it again over its own output links
//! leftover plain occurrences of the same terms elsewhere in the document,
//! up to the budget, unless the document already carries enough tag links to
//! trip the "already annotated" guard. This throttling behavior is kept as
//! is; use [`remove_term_links`] to undo a pass.

use std::collections::HashSet;

use regex::Regex;
use tracing::{debug, warn};

use blockdocs_shared::TermsConfig;

use crate::catalog::TermDictionary;
use crate::zones;

/// Budgets and guard for one annotation pass.
#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    /// Maximum links per term per document.
    pub max_per_term: usize,
    /// Maximum links per document; reaching it ends the pass.
    pub max_per_document: usize,
    /// URL substring counted by the guard.
    pub tag_url: String,
    /// Guard trips when `tag_url` occurs at least this many times.
    pub tag_guard_threshold: usize,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self::from(&TermsConfig::default())
    }
}

impl From<&TermsConfig> for AnnotateOptions {
    fn from(config: &TermsConfig) -> Self {
        Self {
            max_per_term: config.max_links_per_term,
            max_per_document: config.max_links_per_file,
            tag_url: config.tag_url.clone(),
            tag_guard_threshold: config.tag_guard_threshold,
        }
    }
}

/// One accepted replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub term: String,
    pub url: String,
    /// 1-based line number.
    pub line: usize,
}

/// Output of [`annotate`].
#[derive(Debug, Clone)]
pub struct Annotation {
    pub content: String,
    pub replacements: Vec<Replacement>,
}

impl Annotation {
    pub fn count(&self) -> usize {
        self.replacements.len()
    }
}

/// Whether `doc` already carries enough tag links to be left alone.
pub fn is_heavily_annotated(doc: &str, opts: &AnnotateOptions) -> bool {
    !opts.tag_url.is_empty() && doc.matches(opts.tag_url.as_str()).count() >= opts.tag_guard_threshold
}

/// Link terms from `dict` in `doc`.
pub fn annotate(doc: &str, dict: &TermDictionary, opts: &AnnotateOptions) -> Annotation {
    if is_heavily_annotated(doc, opts) {
        debug!(tag_url = %opts.tag_url, "document already annotated, skipping");
        return Annotation {
            content: doc.to_string(),
            replacements: Vec::new(),
        };
    }

    let mut result = doc.to_string();
    let mut replacements: Vec<Replacement> = Vec::new();

    'terms: for (term, url) in dict.iter() {
        if replacements.len() >= opts.max_per_document {
            break;
        }

        let Some(pattern) = term_pattern(term) else {
            continue;
        };

        let starts: Vec<usize> = pattern.find_iter(&result).map(|m| m.start()).collect();
        let link = format!("[{term}]({url})");
        let mut term_count = 0;
        let mut used_lines: HashSet<usize> = HashSet::new();

        for pos in starts.into_iter().rev() {
            if replacements.len() >= opts.max_per_document {
                break 'terms;
            }
            if term_count >= opts.max_per_term {
                continue;
            }

            let line = line_index(&result, pos);
            if used_lines.contains(&line) {
                continue;
            }
            if !zones::is_plain(&result, pos) {
                continue;
            }

            result.replace_range(pos..pos + term.len(), &link);
            term_count += 1;
            used_lines.insert(line);
            replacements.push(Replacement {
                term: term.to_string(),
                url: url.to_string(),
                line: line + 1,
            });
        }
    }

    debug!(replacements = replacements.len(), "annotation pass complete");

    Annotation {
        content: result,
        replacements,
    }
}

/// Replace every `[term](url)` with the bare `term`.
pub fn remove_term_link(doc: &str, term: &str, url: &str) -> String {
    doc.replace(&format!("[{term}]({url})"), term)
}

/// Undo the links of every dictionary entry. Returns the text and the number
/// of links removed.
pub fn remove_term_links(doc: &str, dict: &TermDictionary) -> (String, usize) {
    let mut result = doc.to_string();
    let mut removed = 0;
    for (term, url) in dict.iter() {
        let link = format!("[{term}]({url})");
        let hits = result.matches(link.as_str()).count();
        if hits > 0 {
            removed += hits;
            result = result.replace(&link, term);
        }
    }
    (result, removed)
}

/// Whole-word pattern for terms with ASCII letters, literal otherwise (CJK
/// text has no word boundaries).
fn term_pattern(term: &str) -> Option<Regex> {
    let escaped = regex::escape(term);
    let source = if term.chars().any(|c| c.is_ascii_alphabetic()) {
        format!(r"\b{escaped}\b")
    } else {
        escaped
    };
    match Regex::new(&source) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(term, error = %e, "skipping term with invalid pattern");
            None
        }
    }
}

/// 0-based line of `pos`.
fn line_index(doc: &str, pos: usize) -> usize {
    doc.as_bytes()[..pos].iter().filter(|&&b| b == b'\n').count()
}
