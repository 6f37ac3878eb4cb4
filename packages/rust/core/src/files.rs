//! Markdown file discovery.

use std::path::{Path, PathBuf};

use tracing::debug;

use blockdocs_shared::{BlockdocsError, Result};

/// Resolve `target` to the markdown files it names.
///
/// A `.md` file yields itself; a directory yields every `*.md` below it,
/// recursively, in sorted path order. Anything else is a validation error.
pub fn collect_markdown_files(target: &Path) -> Result<Vec<PathBuf>> {
    if target.is_file() {
        if !is_markdown(target) {
            return Err(BlockdocsError::validation(format!(
                "not a .md file: {}",
                target.display()
            )));
        }
        return Ok(vec![target.to_path_buf()]);
    }

    if !target.is_dir() {
        return Err(BlockdocsError::validation(format!(
            "path does not exist: {}",
            target.display()
        )));
    }

    let mut files = Vec::new();
    walk(target, &mut files)?;
    files.sort();
    debug!(dir = %target.display(), count = files.len(), "collected markdown files");
    Ok(files)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| BlockdocsError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| BlockdocsError::io(dir, e))?.path();
        if path.is_dir() {
            walk(&path, out)?;
        } else if is_markdown(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "md")
}
