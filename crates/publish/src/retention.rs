//! Pruning of publication directories that fell out of retention.

use crate::error::Result;
use crate::writer::PUBLISHED_SYMLINK;
use rayon::ThreadPool;
use rayon::prelude::*;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

/// Names of directories the writer creates: finished publications and
/// temporary directories left behind by interrupted writes.
pub static PUBLICATION_DIRECTORY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(tmp|published)-\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d+(-\d+)?$")
        .expect("publication directory pattern is valid")
});

/// Delete publication directories below `base` whose mtime is before
/// `cutoff`, keeping the `keep_copies` most recent ones and whatever the
/// `published` symlink points at.
///
/// Deletion failures are logged and skipped. Returns the directories that
/// were selected for deletion.
#[instrument(skip_all, fields(base = %base.display(), keep_copies))]
pub fn cleanup_old_target_directories(
    base: &Path,
    cutoff: OffsetDateTime,
    keep_copies: usize,
    pool: &ThreadPool,
) -> Result<Vec<PathBuf>> {
    let cutoff = SystemTime::from(cutoff);
    let current = fs::canonicalize(base.join(PUBLISHED_SYMLINK)).ok();

    let mut candidates = Vec::new();
    for entry in fs::read_dir(base)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !PUBLICATION_DIRECTORY_PATTERN.is_match(name) {
            continue;
        }
        let meta = entry.metadata()?;
        if !meta.is_dir() {
            continue;
        }
        candidates.push((entry.path(), meta.modified()?));
    }
    candidates.sort_by(|a, b| b.1.cmp(&a.1));

    let expired: Vec<PathBuf> = candidates
        .into_iter()
        .skip(keep_copies)
        .filter(|(_, modified)| *modified < cutoff)
        .map(|(path, _)| path)
        .filter(|path| match (&current, fs::canonicalize(path)) {
            (Some(current), Ok(resolved)) => *current != resolved,
            _ => true,
        })
        .collect();

    pool.install(|| {
        expired.par_iter().for_each(|dir| {
            info!(directory = %dir.display(), "Removing old publication directory");
            if let Err(e) = fs::remove_dir_all(dir) {
                warn!(directory = %dir.display(), error = %e, "Removing old publication directory failed");
            }
        })
    });
    Ok(expired)
}
