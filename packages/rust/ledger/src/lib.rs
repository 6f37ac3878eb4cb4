//! Publication ledger: `published_articles.json`.
//!
//! The [`Ledger`] maps a source file path, exactly as the caller spelled it,
//! to the remote article id and publish time.
//!
//! **Access rules:**
//! - Reads never fail: a missing file is an empty ledger, an unreadable or
//!   malformed one is an empty ledger plus a warning.
//! - [`Ledger::record`] re-reads the whole file as untyped JSON, changes one
//!   entry, and writes the whole mapping back. Entries it cannot interpret are
//!   written back untouched. A file that exists but is not a JSON object is
//!   never overwritten; `record` returns an error instead.
//! - There is no lock; two concurrent writers lose each other's entries (last
//!   writer wins).
//! - Keys are not canonicalized: `docs/a.md` and `./docs/a.md` are different
//!   entries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use blockdocs_shared::{ArticleId, BlockdocsError, LedgerEntry, Result};

/// Ledger contents keyed by file path.
pub type LedgerMap = BTreeMap<String, LedgerEntry>;

/// Handle to a ledger file and its last loaded contents.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    entries: LedgerMap,
}

impl Ledger {
    /// Open the ledger at `path`, loading whatever is readable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load(&path);
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or overwrite the entry for `key`, stamped now, and persist.
    pub fn record(&mut self, key: &str, article_id: ArticleId) -> Result<LedgerEntry> {
        let entry = LedgerEntry::now(article_id);

        let value = serde_json::to_value(&entry)
            .map_err(|e| BlockdocsError::parse(format!("failed to serialize ledger entry: {e}")))?;

        let mut current = load_raw(&self.path)?;
        current.insert(key.to_string(), value);
        save(&self.path, &current)?;
        self.entries = load(&self.path);

        info!(key, %article_id, path = %self.path.display(), "ledger entry recorded");
        Ok(entry)
    }

    pub fn is_published(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&LedgerEntry> {
        self.entries.get(key)
    }

    /// Entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &LedgerEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read the ledger file. Never fails; see the module docs.
pub fn load(path: &Path) -> LedgerMap {
    if !path.exists() {
        debug!(path = %path.display(), "ledger not found, starting empty");
        return LedgerMap::new();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read ledger, treating as empty");
            return LedgerMap::new();
        }
    };

    match serde_json::from_str::<LedgerMap>(&content) {
        Ok(entries) => {
            debug!(path = %path.display(), entries = entries.len(), "ledger loaded");
            entries
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed ledger, treating as empty");
            LedgerMap::new()
        }
    }
}

/// Untyped view of the file used by the write path.
type RawLedger = BTreeMap<String, serde_json::Value>;

/// Read the file for rewriting. Missing is empty; anything unreadable is an error.
fn load_raw(path: &Path) -> Result<RawLedger> {
    if !path.exists() {
        return Ok(RawLedger::new());
    }

    let content = std::fs::read_to_string(path).map_err(|e| BlockdocsError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        BlockdocsError::parse(format!(
            "refusing to overwrite unparseable ledger {}: {e}",
            path.display()
        ))
    })
}

/// Write the full mapping with two-space indentation.
fn save(path: &Path, entries: &RawLedger) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| BlockdocsError::io(parent, e))?;
    }

    let mut json = serde_json::to_string_pretty(entries)
        .map_err(|e| BlockdocsError::parse(format!("failed to serialize ledger: {e}")))?;
    json.push('\n');

    std::fs::write(path, json).map_err(|e| BlockdocsError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Fresh ledger path in the temp dir.
    fn temp_ledger() -> PathBuf {
        std::env::temp_dir().join(format!("bd_ledger_{}.json", Uuid::now_v7()))
    }

    #[test]
    fn missing_file_is_empty() {
        let ledger = Ledger::open(temp_ledger());
        assert!(ledger.is_empty());
        assert!(!ledger.is_published("docs/a.md"));
    }

    #[test]
    fn record_then_load_roundtrip() {
        let path = temp_ledger();
        let mut ledger = Ledger::open(&path);
        let entry = ledger.record("docs/a.md", ArticleId(42)).expect("record");

        assert!(ledger.is_published("docs/a.md"));
        assert_eq!(ledger.get("docs/a.md"), Some(&entry));

        let loaded = load(&path);
        assert_eq!(loaded.get("docs/a.md").map(|e| e.article_id), Some(ArticleId(42)));

        let raw = std::fs::read_to_string(&path).expect("read ledger");
        assert!(raw.contains("\"lbc_article_id\": 42"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn forced_republish_overwrites() {
        let path = temp_ledger();
        let mut ledger = Ledger::open(&path);
        ledger.record("docs/a.md", ArticleId(1)).expect("first");
        ledger.record("docs/a.md", ArticleId(2)).expect("second");

        let reopened = Ledger::open(&path);
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get("docs/a.md").map(|e| e.article_id), Some(ArticleId(2)));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn invalid_json_degrades_to_empty() {
        let path = temp_ledger();
        std::fs::write(&path, "{ not json").expect("write");
        assert!(load(&path).is_empty());
        assert!(Ledger::open(&path).is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn wrong_shape_degrades_to_empty() {
        let path = temp_ledger();
        std::fs::write(&path, r#"{"docs/a.md": {"published_at": "x"}}"#).expect("write");
        assert!(load(&path).is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn record_keeps_entries_it_cannot_interpret() {
        let path = temp_ledger();
        std::fs::write(
            &path,
            r#"{
  "docs/a.md": {"lbc_article_id": 1, "published_at": "2025-12-16T10:00:00.000000"},
  "docs/b.md": {"lbc_article_id": 2, "published_at": "2025-12-16T10:05:00.000000"},
  "docs/c.md": {"lbc_article_id": "3", "published_at": "2025-12-16T10:10:00.000000"}
}"#,
        )
        .expect("write");

        let mut ledger = Ledger::open(&path);
        ledger.record("docs/d.md", ArticleId(4)).expect("record");

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(raw["docs/a.md"]["lbc_article_id"], 1);
        assert_eq!(raw["docs/b.md"]["lbc_article_id"], 2);
        assert_eq!(raw["docs/c.md"]["lbc_article_id"], "3");
        assert_eq!(raw["docs/d.md"]["lbc_article_id"], 4);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn record_refuses_to_overwrite_unparseable_file() {
        let path = temp_ledger();
        std::fs::write(&path, "{ not json").expect("write");

        let mut ledger = Ledger::open(&path);
        let err = ledger.record("docs/a.md", ArticleId(1)).unwrap_err();
        assert!(matches!(err, BlockdocsError::Parse { .. }));
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "{ not json");

        std::fs::write(&path, "[1, 2]").expect("write");
        assert!(ledger.record("docs/a.md", ArticleId(1)).is_err());
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "[1, 2]");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn keys_are_not_canonicalized() {
        let path = temp_ledger();
        let mut ledger = Ledger::open(&path);
        ledger.record("docs/a.md", ArticleId(7)).expect("record");
        assert!(!ledger.is_published("./docs/a.md"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn record_merges_entries_written_by_another_handle() {
        let path = temp_ledger();
        let mut first = Ledger::open(&path);
        let mut second = Ledger::open(&path);

        first.record("docs/a.md", ArticleId(1)).expect("first");
        second.record("docs/b.md", ArticleId(2)).expect("second");

        let loaded = load(&path);
        assert_eq!(loaded.len(), 2);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn fixture_ledger_loads() {
        let ledger = Ledger::open("../../../fixtures/ledger/published_articles.json");
        assert_eq!(ledger.len(), 2);
        assert_eq!(
            ledger.get("docs/solidity-basic/3_types.md").map(|e| e.article_id),
            Some(ArticleId(22531))
        );
    }
}
