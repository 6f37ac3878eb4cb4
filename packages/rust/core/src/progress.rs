//! Per-file outcomes, batch summaries, and progress reporting.

use std::fmt;

use blockdocs_shared::ArticleId;

/// Result of processing one file (or upload source) in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// New article created.
    Published(ArticleId),
    /// Existing article body replaced.
    Updated(ArticleId),
    /// File rewritten with `changes` edits.
    Rewritten { changes: usize },
    /// Dry run: the file would be rewritten with `changes` edits.
    WouldRewrite { changes: usize },
    /// Object stored (or already present) at `url`.
    Uploaded { url: String },
    /// Nothing to change.
    Unchanged,
    Skipped { reason: String },
    Failed { error: String },
}

/// Bucket a [`FileOutcome`] is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Succeeded,
    Skipped,
    Failed,
}

impl FileOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Published(_)
            | Self::Updated(_)
            | Self::Rewritten { .. }
            | Self::WouldRewrite { .. }
            | Self::Uploaded { .. } => OutcomeKind::Succeeded,
            Self::Unchanged | Self::Skipped { .. } => OutcomeKind::Skipped,
            Self::Failed { .. } => OutcomeKind::Failed,
        }
    }

    /// Number of edits for rewrite outcomes, zero otherwise.
    pub fn changes(&self) -> usize {
        match self {
            Self::Rewritten { changes } | Self::WouldRewrite { changes } => *changes,
            _ => 0,
        }
    }
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Published(id) => write!(f, "published as article {id}"),
            Self::Updated(id) => write!(f, "updated article {id}"),
            Self::Rewritten { changes } => write!(f, "rewritten ({changes} change(s))"),
            Self::WouldRewrite { changes } => write!(f, "would rewrite ({changes} change(s))"),
            Self::Uploaded { url } => write!(f, "{url}"),
            Self::Unchanged => write!(f, "unchanged"),
            Self::Skipped { reason } => write!(f, "skipped: {reason}"),
            Self::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

/// Aggregate counts for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Sum of rewrite edits across the batch.
    pub changes: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &FileOutcome) {
        match outcome.kind() {
            OutcomeKind::Succeeded => self.succeeded += 1,
            OutcomeKind::Skipped => self.skipped += 1,
            OutcomeKind::Failed => self.failed += 1,
        }
        self.changes += outcome.changes();
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Outcomes of a batch, in processing order, plus their summary.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(String, FileOutcome)>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn push(&mut self, item: impl Into<String>, outcome: FileOutcome) {
        self.summary.record(&outcome);
        self.outcomes.push((item.into(), outcome));
    }
}

/// Progress callback for reporting batch status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before an item is processed.
    fn item_started(&self, item: &str, current: usize, total: usize);
    /// Called after an item is processed.
    fn item_finished(&self, item: &str, outcome: &FileOutcome);
    /// Called when the batch completes.
    fn done(&self, summary: &BatchSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item_started(&self, _item: &str, _current: usize, _total: usize) {}
    fn item_finished(&self, _item: &str, _outcome: &FileOutcome) {}
    fn done(&self, _summary: &BatchSummary) {}
}
