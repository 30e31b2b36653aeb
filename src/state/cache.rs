use chrono::{NaiveDateTime, TimeDelta};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::data::{CacheEntry, EvictionReport, IMAGE_EXTENSION};

/// List the cached stills, oldest first
///
/// Only `*.jpg` files directly inside `dir` are returned; partial
/// downloads (`*.part`) and anything in subdirectories are ignored.
/// Because every name starts with its capture timestamp, sorting by
/// file name is sorting by capture time. A missing directory is an
/// empty cache.
pub fn scan(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(IMAGE_EXTENSION))
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files
}

/// Delete the oldest stills until at most `max_count` remain
///
/// Deletion order is strictly by file name. The age threshold only
/// decides how each deleted file is logged.
pub fn enforce_capacity(
    dir: &Path,
    max_count: usize,
    age_threshold: TimeDelta,
    now: NaiveDateTime,
) -> EvictionReport {
    let files = scan(dir);
    let mut count = files.len();

    if count <= max_count {
        tracing::debug!(count, max_count, "cache within capacity, skipping deletions");
        return EvictionReport {
            removed: Vec::new(),
            remaining: count,
        };
    }

    tracing::info!(count, max_count, "cache over capacity, cleaning the oldest");

    let cutoff = now - age_threshold;
    let mut removed = Vec::new();

    for file in files {
        if count <= max_count {
            break;
        }

        match CacheEntry::from_path(&file) {
            Ok(entry) => {
                tracing::debug!(
                    captured_at = %entry.captured_at,
                    channel = %entry.channel,
                    resolution = %entry.resolution,
                    file = %entry.path.display(),
                    "{}",
                    if entry.captured_at < cutoff { "old" } else { "not old" }
                );
            }
            Err(err) => {
                tracing::warn!(file = %file.display(), error = %err, "cannot date cached file");
            }
        }

        match std::fs::remove_file(&file) {
            Ok(()) => {
                tracing::info!(file = %file.display(), "deleted");
                count -= 1;
                removed.push(file);
            }
            Err(err) => {
                tracing::warn!(file = %file.display(), error = %err, "failed to delete cached file");
            }
        }
    }

    EvictionReport {
        removed,
        remaining: count,
    }
}

/// Delete every still captured before `now - age_threshold`
///
/// Files whose names cannot be dated are kept.
pub fn evict_expired(dir: &Path, age_threshold: TimeDelta, now: NaiveDateTime) -> EvictionReport {
    let cutoff = now - age_threshold;
    let mut removed = Vec::new();
    let mut remaining = 0;

    for file in scan(dir) {
        let expired = match CacheEntry::from_path(&file) {
            Ok(entry) => entry.captured_at < cutoff,
            Err(err) => {
                tracing::warn!(file = %file.display(), error = %err, "cannot date cached file");
                false
            }
        };

        if !expired {
            remaining += 1;
            continue;
        }

        match std::fs::remove_file(&file) {
            Ok(()) => {
                tracing::info!(file = %file.display(), "deleted expired");
                removed.push(file);
            }
            Err(err) => {
                tracing::warn!(file = %file.display(), error = %err, "failed to delete cached file");
                remaining += 1;
            }
        }
    }

    EvictionReport { removed, remaining }
}
