/// Shared data structures for the image lifecycle
///
/// These structs represent the data model that flows between
/// the archive client, the cache directory and the display.

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Format of the timestamp prefix of every archive file name, `YYYYMMDD_HHMMSS`
pub const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Extension of cached stills
pub const IMAGE_EXTENSION: &str = "jpg";

/// Parse the capture time from an archive file name
///
/// The first two underscore-delimited tokens of the stem are concatenated
/// and parsed as `%Y%m%d%H%M%S`, e.g. `20231217_170741_512_0193.jpg`
/// gives 2023-12-17 17:07:41. Times are UTC, as published by the archive.
pub fn parse_capture_time(file_name: &str) -> Result<NaiveDateTime> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::FileName(file_name.to_string()))?;

    let mut tokens = stem.split('_');
    let (Some(date), Some(time)) = (tokens.next(), tokens.next()) else {
        return Err(Error::FileName(file_name.to_string()));
    };

    let stamp = format!("{date}{time}");
    NaiveDateTime::parse_from_str(&stamp, "%Y%m%d%H%M%S").map_err(|source| Error::Timestamp {
        value: stamp,
        source,
    })
}

/// Build the local file name of a still captured at `captured_at`
pub fn image_file_name(captured_at: NaiveDateTime, resolution: &str, channel: &str) -> String {
    format!(
        "{}_{}_{}.{}",
        captured_at.format(FILE_STAMP_FORMAT),
        resolution,
        channel,
        IMAGE_EXTENSION
    )
}

/// The `<resolution>_<channel>` token that identifies a feed inside a file name
pub fn feed_token(resolution: &str, channel: &str) -> String {
    format!("{}_{}", resolution, channel)
}

/// One image published in the remote archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteImageRef {
    /// Imaging band, e.g. "0193"
    pub channel: String,
    /// Pixel size, e.g. "512"
    pub resolution: String,
    /// Capture time (UTC) from the file name
    pub captured_at: NaiveDateTime,
    /// Absolute URL of the JPEG
    pub url: String,
}

impl RemoteImageRef {
    /// File name component of the URL (what the cache stores it as)
    pub fn file_name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }
}

/// One file in the local cache directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub captured_at: NaiveDateTime,
    pub resolution: String,
    pub channel: String,
}

impl CacheEntry {
    /// Parse a cache path following `<YYYYMMDD>_<HHMMSS>_<resolution>_<channel>.jpg`
    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::FileName(path.display().to_string()))?;

        let captured_at = parse_capture_time(file_name)?;

        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let tokens: Vec<&str> = stem.split('_').collect();
        if tokens.len() != 4 {
            return Err(Error::FileName(file_name.to_string()));
        }

        Ok(CacheEntry {
            path: path.to_path_buf(),
            captured_at,
            resolution: tokens[2].to_string(),
            channel: tokens[3].to_string(),
        })
    }
}

/// Outcome of fetching the most recent still
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestImage {
    /// Where the still lives (or would live) in the cache
    pub path: PathBuf,
    /// Capture time reported by the archive (or wall-clock on fallback)
    pub captured_at: NaiveDateTime,
    /// False when the file already existed or the download failed
    pub downloaded: bool,
}

/// Outcome of fetching the most recent movie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestVideo {
    pub path: PathBuf,
    /// Wall-clock time of the fetch; movies have no single capture instant
    pub fetched_at: NaiveDateTime,
    pub downloaded: bool,
}

/// Summary of a `download_range` pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeReport {
    /// Day directories that were listed successfully
    pub listed_days: usize,
    /// New files written to the cache
    pub fetched: usize,
    /// Files skipped because they were already cached
    pub existing: usize,
    /// Files whose download failed
    pub failed: usize,
}

/// Summary of an eviction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub removed: Vec<PathBuf>,
    pub remaining: usize,
}
