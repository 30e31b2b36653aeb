use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::transport::Transport;
use crate::error::{Error, Result};
use crate::picture::watermark;

/// Downloads archive files into the cache directory
///
/// Bodies are written to a `.part` sibling first and renamed into place,
/// so the display never lists a half-written still.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    remove_watermark: bool,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("remove_watermark", &self.remove_watermark)
            .finish_non_exhaustive()
    }
}

/// What `fetch_if_missing` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded,
    AlreadyCached,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, remove_watermark: bool) -> Self {
        Self {
            transport,
            remove_watermark,
        }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Download `url` to `dest` unless `dest` already exists
    pub async fn fetch_if_missing(&self, url: &str, dest: &Path) -> Result<FetchOutcome> {
        if dest.is_file() {
            tracing::debug!(%url, dest = %dest.display(), "exists");
            return Ok(FetchOutcome::AlreadyCached);
        }
        self.fetch(url, dest).await?;
        Ok(FetchOutcome::Downloaded)
    }

    /// Download `url` to `dest`, replacing any existing file
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        tracing::info!(%url, dest = %dest.display(), "download");

        let mut body = self.transport.get_bytes(url).await?;

        if self.remove_watermark && is_still(dest) {
            let original = body.clone();
            body = match tokio::task::spawn_blocking(move || watermark::scrub_jpeg(&original)).await? {
                Ok(clean) => clean,
                Err(err) => {
                    tracing::warn!(%url, error = %err, "watermark removal failed, keeping original");
                    body
                }
            };
        }

        write_atomically(dest, &body).await
    }
}

fn is_still(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

async fn write_atomically(dest: &Path, body: &[u8]) -> Result<()> {
    let part = part_path(dest);
    tokio::fs::write(&part, body)
        .await
        .map_err(|e| Error::io(&part, e))?;

    if let Err(e) = tokio::fs::rename(&part, dest).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(Error::io(dest, e));
    }
    Ok(())
}
