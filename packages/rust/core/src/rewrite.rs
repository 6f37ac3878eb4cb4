//! In-place markdown rewrites: term annotation, de-annotation, and
//! cross-article relinking.
//!
//! Every pass reads a file, applies a pure text transform from
//! `blockdocs-markdown`, and writes the result back only when it differs.
//! With `dry_run` nothing is written.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use blockdocs_ledger::Ledger;
use blockdocs_markdown::{
    AnnotateOptions, TermDictionary, annotate, article_url_map, remove_term_links,
    rewrite_article_links, rewrite_eip_mirrors,
};
use blockdocs_shared::{BlockdocsError, Result};

use crate::progress::{BatchReport, FileOutcome, ProgressReporter};

/// Rewrite one file with `transform`, which returns the new text and its edit count.
pub fn rewrite_file<F>(path: &Path, dry_run: bool, transform: F) -> Result<FileOutcome>
where
    F: Fn(&str) -> (String, usize),
{
    let original = std::fs::read_to_string(path).map_err(|e| BlockdocsError::io(path, e))?;
    let (updated, changes) = transform(&original);

    if updated == original {
        return Ok(FileOutcome::Unchanged);
    }
    if dry_run {
        return Ok(FileOutcome::WouldRewrite { changes });
    }

    std::fs::write(path, updated).map_err(|e| BlockdocsError::io(path, e))?;
    Ok(FileOutcome::Rewritten { changes })
}

fn rewrite_batch<F>(
    phase: &str,
    files: &[PathBuf],
    dry_run: bool,
    progress: &dyn ProgressReporter,
    transform: F,
) -> BatchReport
where
    F: Fn(&str) -> (String, usize),
{
    let mut report = BatchReport::default();
    let total = files.len();
    progress.phase(phase);

    for (i, path) in files.iter().enumerate() {
        let item = path.display().to_string();
        progress.item_started(&item, i + 1, total);

        let outcome = rewrite_file(path, dry_run, &transform).unwrap_or_else(|e| {
            warn!(file = %item, error = %e, "rewrite failed");
            FileOutcome::Failed { error: e.to_string() }
        });

        progress.item_finished(&item, &outcome);
        report.push(item, outcome);
    }

    progress.done(&report.summary);
    report
}

/// Mirror EIP links, then link catalog terms in each file.
#[instrument(skip_all, fields(files = files.len(), terms = dict.len(), dry_run = dry_run))]
pub fn annotate_files(
    files: &[PathBuf],
    dict: &TermDictionary,
    opts: &AnnotateOptions,
    dry_run: bool,
    progress: &dyn ProgressReporter,
) -> BatchReport {
    rewrite_batch("Linking terms", files, dry_run, progress, |content| {
        let mirrored = rewrite_eip_mirrors(content);
        let annotation = annotate(&mirrored, dict, opts);
        for r in &annotation.replacements {
            debug!(term = %r.term, line = r.line, "linked term");
        }
        let count = annotation.count();
        (annotation.content, count)
    })
}

/// Strip every catalog term link from each file.
#[instrument(skip_all, fields(files = files.len(), terms = dict.len(), dry_run = dry_run))]
pub fn unlink_files(
    files: &[PathBuf],
    dict: &TermDictionary,
    dry_run: bool,
    progress: &dyn ProgressReporter,
) -> BatchReport {
    rewrite_batch("Removing term links", files, dry_run, progress, |content| {
        remove_term_links(content, dict)
    })
}

/// Point `.md` links at the published article URLs recorded in the ledger.
#[instrument(skip_all, fields(files = files.len(), dry_run = dry_run))]
pub fn relink_files(
    files: &[PathBuf],
    ledger: &Ledger,
    site_url: &str,
    dry_run: bool,
    progress: &dyn ProgressReporter,
) -> BatchReport {
    let urls = article_url_map(
        ledger.entries().map(|(key, entry)| (key, entry.article_id)),
        site_url,
    );
    info!(articles = urls.len(), "built article URL map");

    rewrite_batch("Rewriting article links", files, dry_run, progress, |content| {
        let (updated, changes) = rewrite_article_links(content, &urls);
        for change in &changes {
            debug!(from = %change.from, to = %change.to, "link rewritten");
        }
        (updated, changes.len())
    })
}
