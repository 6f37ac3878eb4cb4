//! Update workflow: push current file contents to already-published articles.

use std::path::{Path, PathBuf};

use tracing::{instrument, warn};

use blockdocs_lbc::LbcClient;
use blockdocs_ledger::Ledger;
use blockdocs_shared::{BlockdocsError, Result};

use crate::progress::{BatchReport, FileOutcome, ProgressReporter};

/// A file to update and the ledger key it is recorded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTarget {
    pub path: PathBuf,
    pub key: String,
}

/// Ledger key for `path`: relative to `cwd` when it lies below it, else as given.
pub fn ledger_key(path: &Path, cwd: &Path) -> String {
    path.strip_prefix(cwd)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Resolve the command-line selection into update targets.
///
/// Exactly one of `file` and `all` must be given. With `all`, ledger keys are
/// resolved against `cwd` and missing files are dropped with a warning.
pub fn update_targets(file: Option<&Path>, all: bool, ledger: &Ledger, cwd: &Path) -> Result<Vec<UpdateTarget>> {
    match (file, all) {
        (Some(_), true) => Err(BlockdocsError::validation(
            "use either a file path or --all, not both",
        )),
        (None, false) => Err(BlockdocsError::validation(
            "specify a file to update or pass --all",
        )),
        (Some(file), false) => {
            if !file.is_file() {
                return Err(BlockdocsError::validation(format!(
                    "file does not exist: {}",
                    file.display()
                )));
            }
            Ok(vec![UpdateTarget {
                path: file.to_path_buf(),
                key: ledger_key(file, cwd),
            }])
        }
        (None, true) => {
            if ledger.is_empty() {
                return Err(BlockdocsError::validation(format!(
                    "no published articles recorded in {}",
                    ledger.path().display()
                )));
            }
            let targets: Vec<UpdateTarget> = ledger
                .entries()
                .filter_map(|(key, _)| {
                    let path = cwd.join(key);
                    if path.is_file() {
                        Some(UpdateTarget {
                            path,
                            key: key.to_string(),
                        })
                    } else {
                        warn!(key, "recorded file no longer exists, skipping");
                        None
                    }
                })
                .collect();
            if targets.is_empty() {
                return Err(BlockdocsError::validation("none of the recorded files exist"));
            }
            Ok(targets)
        }
    }
}

/// Replace each target's remote body with the local file contents.
#[instrument(skip_all, fields(targets = targets.len()))]
pub async fn update_batch(
    targets: &[UpdateTarget],
    lbc: &LbcClient,
    ledger: &Ledger,
    progress: &dyn ProgressReporter,
) -> BatchReport {
    let mut report = BatchReport::default();
    let total = targets.len();
    progress.phase("Updating articles");

    for (i, target) in targets.iter().enumerate() {
        progress.item_started(&target.key, i + 1, total);

        let outcome = match ledger.get(&target.key) {
            None => FileOutcome::Skipped {
                reason: "not found in the ledger".into(),
            },
            Some(entry) => {
                let article_id = entry.article_id;
                let result = match std::fs::read_to_string(&target.path) {
                    Ok(content) => lbc.update(article_id, &content).await,
                    Err(e) => Err(BlockdocsError::io(&target.path, e)),
                };
                match result {
                    Ok(()) => FileOutcome::Updated(article_id),
                    Err(e) => {
                        warn!(key = %target.key, %article_id, error = %e, "update failed");
                        FileOutcome::Failed { error: e.to_string() }
                    }
                }
            }
        };

        progress.item_finished(&target.key, &outcome);
        report.push(target.key.clone(), outcome);
    }

    progress.done(&report.summary);
    report
}
