//! Batch workflows for blockdocs.
//!
//! Each workflow takes explicit collaborators and settings, processes its
//! inputs one at a time, and returns a [`BatchReport`]. Per-item errors are
//! logged and counted; only argument validation returns `Err`.

pub mod files;
pub mod progress;
pub mod publish;
pub mod rewrite;
pub mod settings;
pub mod update;
pub mod upload;

pub use files::collect_markdown_files;
pub use progress::{
    BatchReport, BatchSummary, FileOutcome, OutcomeKind, ProgressReporter, SilentProgress,
};
pub use publish::{ArticleDraft, PublishSettings, prepare_draft, publish_batch};
pub use rewrite::{annotate_files, relink_files, rewrite_file, unlink_files};
pub use settings::{Overrides, Settings};
pub use update::{UpdateTarget, ledger_key, update_batch, update_targets};
pub use upload::{is_remote, upload_sources};
