use chrono::{Datelike, NaiveDate, NaiveDateTime};
use reqwest::Url;
use std::path::Path;
use std::sync::Arc;

use super::fetch::{FetchOutcome, Fetcher};
use super::listing;
use super::transport::Transport;
use crate::error::{Error, Result};
use crate::state::data::{feed_token, parse_capture_time, RangeReport, RemoteImageRef};

/// Path of the daily browse directories under the archive root
const BROWSE_PATH: &str = "assets/img/browse";

/// Client for the SDO browse archive
///
/// Holds the archive root (e.g. `https://sdo.gsfc.nasa.gov`) and the
/// fetcher used to populate the cache. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Archive {
    base: Url,
    fetcher: Fetcher,
}

impl Archive {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>, remove_watermark: bool) -> Result<Self> {
        // A trailing slash makes every relative join land below the root
        let root = format!("{}/", base_url.trim_end_matches('/'));
        let base = Url::parse(&root).map_err(|source| Error::Url {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self {
            base,
            fetcher: Fetcher::new(transport, remove_watermark),
        })
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub(crate) fn url(&self, path: &str) -> String {
        self.base
            .join(path)
            .map(String::from)
            .unwrap_or_else(|_| format!("{}{}", self.base, path))
    }

    fn day_url(&self, date: NaiveDate) -> Result<Url> {
        let path = format!(
            "{}/{:04}/{:02}/{:02}/",
            BROWSE_PATH,
            date.year(),
            date.month(),
            date.day()
        );
        self.base.join(&path).map_err(|source| Error::Url { url: path, source })
    }

    /// List the stills published on `date` for one channel and resolution
    ///
    /// Names that carry the feed token but cannot be dated are logged and
    /// skipped. A day without matching stills yields an empty list.
    pub async fn list_images_for_day(
        &self,
        date: NaiveDate,
        channel: &str,
        resolution: &str,
    ) -> Result<Vec<RemoteImageRef>> {
        let day_url = self.day_url(date)?;
        let html = self.fetcher.transport().get_text(day_url.as_str()).await?;

        let needle = format!("{}.jpg", feed_token(resolution, channel));
        let mut images = Vec::new();

        for url in listing::file_links(&html, &day_url, ".jpg") {
            let file_name = url.rsplit('/').next().unwrap_or_default();
            if !file_name.contains(&needle) {
                continue;
            }
            match parse_capture_time(file_name) {
                Ok(captured_at) => images.push(RemoteImageRef {
                    channel: channel.to_string(),
                    resolution: resolution.to_string(),
                    captured_at,
                    url,
                }),
                Err(err) => {
                    tracing::warn!(%url, error = %err, "skipping malformed archive entry");
                }
            }
        }

        Ok(images)
    }

    /// Fetch every still captured since `start`, day by day up to `end`
    ///
    /// Stills already present in `dest_dir` are not downloaded again, so
    /// overlapping ranges are safe to repeat. Listing and download
    /// failures are logged and counted, never propagated.
    pub async fn download_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        channel: &str,
        resolution: &str,
        dest_dir: &Path,
    ) -> RangeReport {
        let mut report = RangeReport::default();

        for date in start.date().iter_days().take_while(|d| *d <= end.date()) {
            tracing::info!(day = %date, "downloading");

            let images = match self.list_images_for_day(date, channel, resolution).await {
                Ok(images) => images,
                Err(err) => {
                    tracing::warn!(day = %date, error = %err, "failed to list archive day");
                    continue;
                }
            };
            report.listed_days += 1;

            for image in images.iter().filter(|i| i.captured_at >= start) {
                let dest = dest_dir.join(image.file_name());
                match self.fetcher.fetch_if_missing(&image.url, &dest).await {
                    Ok(FetchOutcome::Downloaded) => report.fetched += 1,
                    Ok(FetchOutcome::AlreadyCached) => report.existing += 1,
                    Err(err) => {
                        tracing::warn!(
                            channel = %image.channel,
                            resolution = %image.resolution,
                            url = %image.url,
                            dest = %dest.display(),
                            error = %err,
                            "download failed"
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::transport::mock::MockTransport;

    const DAY: &str = "https://sdo.gsfc.nasa.gov/assets/img/browse/2024/01/01/";
    const EARLY: &str = "https://sdo.gsfc.nasa.gov/assets/img/browse/2024/01/01/20240101_000000_512_0193.jpg";
    const LATE: &str = "https://sdo.gsfc.nasa.gov/assets/img/browse/2024/01/01/20240101_001500_512_0193.jpg";

    fn listing() -> String {
        [
            "20240101_000000_512_0193.jpg",
            "20240101_001500_512_0193.jpg",
            "20240101_001500_1024_0193.jpg",
            "20240101_001500_512_0171.jpg",
            "bogus_512_0193.jpg",
        ]
        .iter()
        .map(|n| format!("<a href=\"{n}\">{n}</a>\n"))
        .collect()
    }

    fn at(text: &str) -> NaiveDateTime {
        parse_capture_time(text).unwrap()
    }

    fn transport() -> Arc<MockTransport> {
        Arc::new(
            MockTransport::new()
                .route(DAY, listing())
                .route(EARLY, b"early".to_vec())
                .route(LATE, b"late".to_vec()),
        )
    }

    fn archive(transport: Arc<MockTransport>) -> Archive {
        Archive::new("https://sdo.gsfc.nasa.gov/", transport, false).unwrap()
    }

    #[test]
    fn test_invalid_archive_root() {
        let err = Archive::new("sdo.gsfc.nasa.gov", transport(), false).unwrap_err();
        assert!(matches!(err, Error::Url { ref url, .. } if url == "sdo.gsfc.nasa.gov"));
    }

    #[tokio::test]
    async fn test_list_images_for_day_filters_feed() {
        let archive = archive(transport());
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let images = archive.list_images_for_day(date, "0193", "512").await.unwrap();
        let urls: Vec<&str> = images.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec![EARLY, LATE]);
        assert_eq!(images[1].captured_at, at("20240101_001500"));
        assert_eq!(images[1].channel, "0193");
    }

    #[tokio::test]
    async fn test_list_images_for_day_without_matches() {
        let archive = archive(transport());
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(archive.list_images_for_day(date, "0304", "512").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_range_respects_start() {
        let dir = tempfile::tempdir().unwrap();
        let transport = transport();
        let archive = archive(transport.clone());

        let report = archive
            .download_range(at("20240101_001000"), at("20240101_120000"), "0193", "512", dir.path())
            .await;

        assert_eq!(report.fetched, 1);
        assert_eq!(transport.hits(EARLY), 0);
        assert_eq!(transport.hits(LATE), 1);
        assert!(dir.path().join("20240101_001500_512_0193.jpg").is_file());
        assert!(!dir.path().join("20240101_000000_512_0193.jpg").exists());
    }

    #[tokio::test]
    async fn test_download_range_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let transport = transport();
        let archive = archive(transport.clone());
        let (start, end) = (at("20240101_000000"), at("20240101_235959"));

        let first = archive.download_range(start, end, "0193", "512", dir.path()).await;
        assert_eq!(first.fetched, 2);

        let second = archive.download_range(start, end, "0193", "512", dir.path()).await;
        assert_eq!(second.fetched, 0);
        assert_eq!(second.existing, 2);
        assert_eq!(transport.hits(EARLY), 1);
        assert_eq!(transport.hits(LATE), 1);
    }

    #[tokio::test]
    async fn test_download_range_survives_missing_days() {
        let dir = tempfile::tempdir().unwrap();
        let transport = transport();
        let archive = archive(transport.clone());

        // 2023-12-31 is not routed and answers 404
        let report = archive
            .download_range(at("20231231_230000"), at("20240101_010000"), "0193", "512", dir.path())
            .await;

        assert_eq!(report.listed_days, 1);
        assert_eq!(report.fetched, 2);
        assert_eq!(
            transport.requests()[0],
            "https://sdo.gsfc.nasa.gov/assets/img/browse/2023/12/31/"
        );
    }

    #[tokio::test]
    async fn test_download_range_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new().route(DAY, listing()).route(LATE, b"late".to_vec()));
        let archive = archive(transport);

        let report = archive
            .download_range(at("20240101_000000"), at("20240101_000000"), "0193", "512", dir.path())
            .await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.fetched, 1);
    }
}
