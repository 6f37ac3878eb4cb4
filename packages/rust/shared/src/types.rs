//! Core domain types shared by the blockdocs crates.

use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize};

/// Maximum number of keywords kept from an analysis.
pub const MAX_KEYWORDS: usize = 6;

// ---------------------------------------------------------------------------
// ArticleId
// ---------------------------------------------------------------------------

/// Identifier assigned to an article by the publishing API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub u64);

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ArticleId {
    /// Public URL of the article under `site_url`.
    pub fn url(&self, site_url: &str) -> String {
        format!("{}/article/{}", site_url.trim_end_matches('/'), self.0)
    }
}

// ---------------------------------------------------------------------------
// LedgerEntry
// ---------------------------------------------------------------------------

/// One record of the publication ledger (`published_articles.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Remote article id.
    #[serde(rename = "lbc_article_id")]
    pub article_id: ArticleId,
    /// Local ISO-8601 timestamp of the publish.
    pub published_at: String,
}

impl LedgerEntry {
    /// Entry stamped with the current local time.
    pub fn now(article_id: ArticleId) -> Self {
        Self {
            article_id,
            published_at: Local::now()
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// ArticleAnalysis
// ---------------------------------------------------------------------------

/// Title, summary and keywords extracted by the summarization model.
///
/// Every field is optional on the wire; callers fill gaps from the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub keywords: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ArticleAnalysis {
    /// Drop blank keywords and anything past [`MAX_KEYWORDS`].
    pub fn normalized(mut self) -> Self {
        self.keywords.retain(|k| !k.trim().is_empty());
        self.keywords.truncate(MAX_KEYWORDS);
        self
    }
}
