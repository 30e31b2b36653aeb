/// Latest still, latest movie and the freshness check built on them
///
/// The archive publishes, per channel, the most recent still under a fixed
/// name plus a `times<channel>.txt` file naming its capture time:
///
/// ```text
/// 0193: 20231217_170741
/// ```

use chrono::{NaiveDateTime, TimeDelta, Utc};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use super::client::Archive;
use super::fetch::FetchOutcome;
use crate::state::data::{image_file_name, LatestImage, LatestVideo, FILE_STAMP_FORMAT};

const LATEST_PATH: &str = "assets/img/latest";
const LATEST_MOVIE_PATH: &str = "assets/img/latest/mpeg";

fn times_pattern() -> &'static Regex {
    static TIMES: OnceLock<Regex> = OnceLock::new();
    TIMES.get_or_init(|| Regex::new(r"(?m)^[^:]*:\s*(.*)$").expect("valid times pattern"))
}

/// Extract the capture time from a `times<channel>.txt` body
pub fn parse_times(body: &str) -> Option<NaiveDateTime> {
    let value = times_pattern().captures(body)?.get(1)?.as_str().trim();
    NaiveDateTime::parse_from_str(value, FILE_STAMP_FORMAT).ok()
}

/// Current UTC wall-clock time, the reference clock of the archive
pub fn utc_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

impl Archive {
    /// Capture time of the newest still of `channel`
    ///
    /// Best effort: when the archive cannot be reached or the answer does
    /// not parse, the current wall-clock time is returned instead, so the
    /// caller sees "fresh" and simply tries again on the next poll.
    pub async fn latest_timestamp(&self, channel: &str) -> NaiveDateTime {
        let url = self.url(&format!("{}/times{}.txt", LATEST_PATH, channel));

        match self.fetcher().transport().get_text(&url).await {
            Ok(body) => match parse_times(&body) {
                Some(when) => return when,
                None => tracing::warn!(%url, body = %body.trim(), "unparsable latest timestamp"),
            },
            Err(err) => tracing::warn!(%url, error = %err, "failed to fetch latest timestamp"),
        }

        utc_now()
    }

    /// Make sure the newest still of the feed is cached
    ///
    /// The local name is derived from the latest capture time, so an
    /// existing file means there is nothing to do. The path and timestamp
    /// are returned whether or not a download took place.
    pub async fn fetch_latest_image(&self, channel: &str, resolution: &str, dest_dir: &Path) -> LatestImage {
        let captured_at = self.latest_timestamp(channel).await;
        let url = self.url(&format!("{}/latest_{}_{}.jpg", LATEST_PATH, resolution, channel));
        let path = dest_dir.join(image_file_name(captured_at, resolution, channel));

        let downloaded = match self.fetcher().fetch_if_missing(&url, &path).await {
            Ok(FetchOutcome::Downloaded) => true,
            Ok(FetchOutcome::AlreadyCached) => false,
            Err(err) => {
                tracing::warn!(%url, dest = %path.display(), error = %err, "download failed");
                false
            }
        };

        LatestImage {
            path,
            captured_at,
            downloaded,
        }
    }

    /// Download the rolling movie of the feed
    ///
    /// Movies are always downloaded again and named after the wall-clock
    /// time of the fetch.
    pub async fn fetch_latest_video(&self, channel: &str, resolution: &str, dest_dir: &Path) -> LatestVideo {
        let fetched_at = utc_now();
        let file_name = format!("latest_{}_{}.mp4", resolution, channel);
        let url = self.url(&format!("{}/{}", LATEST_MOVIE_PATH, file_name));
        let path = dest_dir.join(format!("{}-{}", fetched_at.format(FILE_STAMP_FORMAT), file_name));

        let downloaded = match self.fetcher().fetch(&url, &path).await {
            Ok(()) => {
                tracing::info!(dest = %path.display(), "movie downloaded");
                true
            }
            Err(err) => {
                tracing::warn!(%url, dest = %path.display(), error = %err, "download failed");
                false
            }
        };

        LatestVideo {
            path,
            fetched_at,
            downloaded,
        }
    }

    /// Fetch the latest still once the archive's newest capture is older than `stale_threshold`
    ///
    /// Returns `None` when the feed is considered fresh. A missed still
    /// is picked up by a later poll.
    pub async fn refresh_if_stale(
        &self,
        channel: &str,
        resolution: &str,
        dest_dir: &Path,
        stale_threshold: TimeDelta,
        now: NaiveDateTime,
    ) -> Option<LatestImage> {
        let latest = self.latest_timestamp(channel).await;
        tracing::info!(%latest, "latest capture");

        if latest >= now - stale_threshold {
            return None;
        }

        tracing::info!("downloading new image");
        Some(self.fetch_latest_image(channel, resolution, dest_dir).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::transport::mock::MockTransport;
    use crate::state::data::parse_capture_time;
    use std::sync::Arc;

    const TIMES: &str = "https://sdo.gsfc.nasa.gov/assets/img/latest/times0193.txt";
    const LATEST: &str = "https://sdo.gsfc.nasa.gov/assets/img/latest/latest_512_0193.jpg";
    const MOVIE: &str = "https://sdo.gsfc.nasa.gov/assets/img/latest/mpeg/latest_512_0193.mp4";

    fn at(text: &str) -> NaiveDateTime {
        parse_capture_time(text).unwrap()
    }

    fn archive(transport: Arc<MockTransport>) -> Archive {
        Archive::new("https://sdo.gsfc.nasa.gov", transport, false).unwrap()
    }

    fn published() -> Arc<MockTransport> {
        Arc::new(
            MockTransport::new()
                .route(TIMES, "0193: 20231217_170741\n")
                .route(LATEST, b"sun".to_vec())
                .route(MOVIE, b"movie".to_vec()),
        )
    }

    #[test]
    fn test_parse_times() {
        assert_eq!(parse_times("0193: 20231217_170741\n"), Some(at("20231217_170741")));
        assert_eq!(parse_times("label:20231217_170741"), Some(at("20231217_170741")));
        assert_eq!(parse_times("no colon here"), None);
        assert_eq!(parse_times("0193: soon"), None);
    }

    #[tokio::test]
    async fn test_latest_timestamp() {
        let archive = archive(published());
        assert_eq!(archive.latest_timestamp("0193").await, at("20231217_170741"));
    }

    #[tokio::test]
    async fn test_latest_timestamp_falls_back_to_now() {
        let archive = archive(Arc::new(MockTransport::new()));

        let before = utc_now();
        let latest = archive.latest_timestamp("0193").await;
        let after = utc_now();
        assert!(latest >= before && latest <= after);

        let garbled = Archive::new(
            "https://sdo.gsfc.nasa.gov",
            Arc::new(MockTransport::new().route(TIMES, "<html>maintenance</html>")),
            false,
        )
        .unwrap();
        let latest = garbled.latest_timestamp("0193").await;
        assert!((utc_now() - latest).num_seconds().abs() < 5);
    }

    #[tokio::test]
    async fn test_fetch_latest_image_is_read_through() {
        let dir = tempfile::tempdir().unwrap();
        let transport = published();
        let archive = archive(transport.clone());

        let first = archive.fetch_latest_image("0193", "512", dir.path()).await;
        assert!(first.downloaded);
        assert_eq!(first.captured_at, at("20231217_170741"));
        assert_eq!(first.path, dir.path().join("20231217_170741_512_0193.jpg"));
        assert_eq!(std::fs::read(&first.path).unwrap(), b"sun");

        let second = archive.fetch_latest_image("0193", "512", dir.path()).await;
        assert!(!second.downloaded);
        assert_eq!(second.path, first.path);
        assert_eq!(transport.hits(LATEST), 1);
    }

    #[tokio::test]
    async fn test_fetch_latest_video_always_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let transport = published();
        let archive = archive(transport.clone());

        let video = archive.fetch_latest_video("0193", "512", dir.path()).await;
        assert!(video.downloaded);
        assert!(video
            .path
            .to_string_lossy()
            .ends_with("-latest_512_0193.mp4"));

        archive.fetch_latest_video("0193", "512", dir.path()).await;
        assert_eq!(transport.hits(MOVIE), 2);
        assert_eq!(transport.hits(TIMES), 0);
    }

    #[tokio::test]
    async fn test_refresh_if_stale() {
        let dir = tempfile::tempdir().unwrap();
        let transport = published();
        let archive = archive(transport.clone());
        let threshold = TimeDelta::minutes(15);

        // Ten minutes after the capture: fresh, nothing to fetch
        let fresh = archive
            .refresh_if_stale("0193", "512", dir.path(), threshold, at("20231217_171741"))
            .await;
        assert!(fresh.is_none());
        assert_eq!(transport.hits(LATEST), 0);

        // An hour later: stale, the latest still gets cached
        let stale = archive
            .refresh_if_stale("0193", "512", dir.path(), threshold, at("20231217_180741"))
            .await
            .unwrap();
        assert!(stale.downloaded);
        assert!(stale.path.is_file());
    }

    #[tokio::test]
    async fn test_refresh_when_offline_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let archive = archive(transport.clone());

        let result = archive
            .refresh_if_stale("0193", "512", dir.path(), TimeDelta::minutes(15), utc_now())
            .await;
        assert!(result.is_none());
        assert_eq!(transport.requests(), vec![TIMES.to_string()]);
    }
}
