//! Term catalog: the ordered term → URL dictionary used by the annotator.
//!
//! The catalog source is a markdown file whose `[term](url)` links define the
//! dictionary. Order of first appearance is scan priority.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use blockdocs_shared::{BlockdocsError, Result};

/// Matches `[term](url)` on a single line.
static CATALOG_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]\((.*?)\)").expect("catalog link regex"));

/// Insertion-ordered mapping from term to target URL.
#[derive(Debug, Clone, Default)]
pub struct TermDictionary {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl TermDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a term.
    ///
    /// Re-inserting an existing term replaces its URL but keeps its position.
    /// Empty terms are ignored. Returns `true` when the term was new.
    pub fn insert(&mut self, term: impl Into<String>, url: impl Into<String>) -> bool {
        let term = term.into();
        if term.is_empty() {
            return false;
        }
        let url = url.into();
        match self.index.get(&term) {
            Some(&i) => {
                self.entries[i].1 = url;
                false
            }
            None => {
                self.index.insert(term.clone(), self.entries.len());
                self.entries.push((term, url));
                true
            }
        }
    }

    pub fn get(&self, term: &str) -> Option<&str> {
        self.index.get(term).map(|&i| self.entries[i].1.as_str())
    }

    /// Terms and URLs in scan order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, u)| (t.as_str(), u.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Into<String>, U: Into<String>> FromIterator<(T, U)> for TermDictionary {
    fn from_iter<I: IntoIterator<Item = (T, U)>>(iter: I) -> Self {
        let mut dict = Self::new();
        for (term, url) in iter {
            dict.insert(term, url);
        }
        dict
    }
}

/// Parse every `[term](url)` link in `content` into a dictionary.
pub fn parse_catalog(content: &str) -> TermDictionary {
    CATALOG_LINK_RE
        .captures_iter(content)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

/// Read and parse a catalog file.
pub fn load_catalog(path: &Path) -> Result<TermDictionary> {
    let content = std::fs::read_to_string(path).map_err(|e| BlockdocsError::io(path, e))?;
    let dict = parse_catalog(&content);
    debug!(path = %path.display(), terms = dict.len(), "term catalog loaded");
    Ok(dict)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_links_in_order() {
        let content = "\
# Terms

- [以太坊](https://learnblockchain.cn/tags/以太坊)
- [Solidity](https://learnblockchain.cn/tags/Solidity) and [EVM](https://learnblockchain.cn/tags/EVM)
";
        let dict = parse_catalog(content);
        let terms: Vec<&str> = dict.iter().map(|(t, _)| t).collect();
        assert_eq!(terms, vec!["以太坊", "Solidity", "EVM"]);
        assert_eq!(dict.get("EVM"), Some("https://learnblockchain.cn/tags/EVM"));
    }

    #[test]
    fn duplicate_term_keeps_first_position_last_url() {
        let dict = parse_catalog("[a](1) [b](2) [a](3)");
        let entries: Vec<(&str, &str)> = dict.iter().collect();
        assert_eq!(entries, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn empty_terms_are_skipped() {
        let dict = parse_catalog("[](https://x) [ok](https://y)");
        assert_eq!(dict.len(), 1);
        assert!(dict.get("").is_none());
    }

    #[test]
    fn catalog_fixture_loads() {
        let dict = load_catalog(Path::new("../../../fixtures/terms/termlink.md"))
            .expect("load catalog fixture");
        assert_eq!(dict.len(), 5);
        assert_eq!(dict.iter().next().map(|(t, _)| t), Some("web3.js"));
        assert_eq!(dict.get("节点"), Some("https://learnblockchain.cn/tags/节点"));
    }

    #[test]
    fn missing_catalog_is_io_error() {
        let err = load_catalog(Path::new("/definitely/not/here.md")).unwrap_err();
        assert!(matches!(err, BlockdocsError::Io { .. }));
    }
}
