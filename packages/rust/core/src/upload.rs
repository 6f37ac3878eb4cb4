//! Upload workflow: push remote or local media to object storage.

use std::path::Path;

use tracing::{instrument, warn};

use blockdocs_media::MediaUploader;

use crate::progress::{BatchReport, FileOutcome, ProgressReporter};

/// Whether `source` should be fetched over HTTP rather than read from disk.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Upload each source in order; the outcome carries the public URL.
#[instrument(skip_all, fields(sources = sources.len()))]
pub async fn upload_sources(
    sources: &[String],
    uploader: &MediaUploader,
    progress: &dyn ProgressReporter,
) -> BatchReport {
    let mut report = BatchReport::default();
    let total = sources.len();
    progress.phase("Uploading media");

    for (i, source) in sources.iter().enumerate() {
        progress.item_started(source, i + 1, total);

        let result = if is_remote(source) {
            uploader.upload_url(source).await
        } else {
            uploader.upload_file(Path::new(source)).await
        };
        let outcome = match result {
            Ok(url) => FileOutcome::Uploaded { url },
            Err(e) => {
                warn!(%source, error = %e, "upload failed");
                FileOutcome::Failed { error: e.to_string() }
            }
        };

        progress.item_finished(source, &outcome);
        report.push(source.clone(), outcome);
    }

    progress.done(&report.summary);
    report
}
