/// Background synchronisation of the cache with the archive
///
/// The startup backfill and the periodic poll run as async jobs on the
/// iced runtime and report back with a summary. They never run on the
/// display tick, so a slow archive only delays new stills, not frames.

use chrono::{NaiveDateTime, TimeDelta};
use std::path::Path;
use std::sync::Arc;

use crate::archive::{Archive, HttpTransport, Transport};
use crate::error::Result;
use crate::picture::watermark;
use crate::state::cache;
use crate::state::data::{EvictionReport, LatestImage, LatestVideo, RangeReport};
use crate::state::marker::LastCheck;
use crate::state::settings::Settings;

/// Everything the sync jobs need, built once at startup
#[derive(Debug, Clone)]
pub struct Context {
    pub settings: Arc<Settings>,
    pub archive: Archive,
}

impl Context {
    /// Build the context with the real HTTP transport
    pub fn new(settings: Settings) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(settings.request_timeout())?);
        Self::with_transport(settings, transport)
    }

    pub fn with_transport(settings: Settings, transport: Arc<dyn Transport>) -> Result<Self> {
        let archive = Archive::new(&settings.archive_url, transport, settings.remove_watermark)?;
        Ok(Self {
            settings: Arc::new(settings),
            archive,
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.settings.cache_dir
    }
}

/// Decides when the periodic poll runs
///
/// At most one sync job runs at a time. Starting a poll records its time
/// in the last-check marker, so a restart keeps the cadence.
#[derive(Debug)]
pub struct PollSchedule {
    marker: LastCheck,
    last_check: NaiveDateTime,
    syncing: bool,
}

impl PollSchedule {
    /// Resume from the marker, or from `fallback` when it is missing or corrupt
    pub fn new(marker: LastCheck, fallback: NaiveDateTime) -> Self {
        let last_check = marker.read_or(fallback);
        Self {
            marker,
            last_check,
            syncing: false,
        }
    }

    #[cfg(test)]
    pub fn last_check(&self) -> NaiveDateTime {
        self.last_check
    }

    #[cfg(test)]
    pub fn syncing(&self) -> bool {
        self.syncing
    }

    /// A sync job started outside the schedule (the startup backfill)
    pub fn begin_sync(&mut self) {
        self.syncing = true;
    }

    pub fn finish_sync(&mut self) {
        self.syncing = false;
    }

    /// Poll interval for a cache holding `cached_count` stills
    ///
    /// An empty cache is polled on the shorter offline interval.
    pub fn interval(settings: &Settings, cached_count: usize) -> TimeDelta {
        if cached_count == 0 {
            settings.offline_check_interval()
        } else {
            settings.check_interval()
        }
    }

    /// Start a poll if none is running and the interval has passed since the last one
    pub fn start_if_due(&mut self, settings: &Settings, cached_count: usize, now: NaiveDateTime) -> bool {
        if self.syncing {
            return false;
        }

        let interval = Self::interval(settings, cached_count);
        match now.checked_sub_signed(interval) {
            Some(cutoff) if self.last_check < cutoff => {}
            _ => return false,
        }

        tracing::info!(%now, "checking for new images");
        self.last_check = now;
        if let Err(err) = self.marker.write(now) {
            tracing::warn!(error = %err, "cannot persist last check");
        }
        self.syncing = true;
        true
    }
}

/// Result of the startup backfill
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Cached stills cleaned by the startup batch scrub
    pub scrubbed: usize,
    pub range: RangeReport,
    pub eviction: EvictionReport,
}

/// Result of one poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Set when the feed was stale and the latest still was requested
    pub latest: Option<LatestImage>,
    /// Set when a movie directory is configured and a new still arrived
    pub movie: Option<LatestVideo>,
    pub eviction: EvictionReport,
}

/// Fill the cache with everything published in the backfill window, then trim it
pub async fn startup_sync(ctx: Context, now: NaiveDateTime) -> SyncReport {
    let settings = &ctx.settings;
    ensure_cache_dir(ctx.cache_dir());

    let scrubbed = if settings.scrub_cache_on_startup {
        scrub_cache(ctx.cache_dir()).await
    } else {
        0
    };

    let range = ctx
        .archive
        .download_range(
            now.checked_sub_signed(settings.startup_backfill()).unwrap_or(now),
            now,
            &settings.channel,
            &settings.resolution,
            ctx.cache_dir(),
        )
        .await;
    tracing::info!(
        days = range.listed_days,
        fetched = range.fetched,
        existing = range.existing,
        failed = range.failed,
        "startup backfill finished"
    );

    let eviction = trim(&ctx, now).await;
    SyncReport {
        scrubbed,
        range,
        eviction,
    }
}

/// Check the archive for a newer still, then trim the cache
pub async fn poll(ctx: Context, now: NaiveDateTime) -> PollReport {
    let settings = &ctx.settings;
    ensure_cache_dir(ctx.cache_dir());

    let latest = ctx
        .archive
        .refresh_if_stale(
            &settings.channel,
            &settings.resolution,
            ctx.cache_dir(),
            settings.stale_threshold(),
            now,
        )
        .await;

    let movie = match (&settings.movie_dir, &latest) {
        (Some(dir), Some(still)) if still.downloaded => {
            ensure_cache_dir(dir);
            Some(
                ctx.archive
                    .fetch_latest_video(&settings.channel, &settings.resolution, dir)
                    .await,
            )
        }
        _ => None,
    };

    let eviction = trim(&ctx, now).await;
    PollReport {
        latest,
        movie,
        eviction,
    }
}

async fn scrub_cache(dir: &Path) -> usize {
    let dir = dir.to_path_buf();
    match tokio::task::spawn_blocking(move || watermark::scrub_directory(&dir)).await {
        Ok(scrubbed) => {
            tracing::info!(scrubbed, "cache watermarks removed");
            scrubbed
        }
        Err(err) => {
            tracing::error!(error = %err, "watermark scrub task failed");
            0
        }
    }
}

async fn trim(ctx: &Context, now: NaiveDateTime) -> EvictionReport {
    let dir = ctx.cache_dir().to_path_buf();
    let settings = ctx.settings.clone();

    let job = tokio::task::spawn_blocking(move || {
        let mut report = cache::enforce_capacity(&dir, settings.image_count, settings.age_threshold(), now);
        if settings.evict_by_age {
            let expired = cache::evict_expired(&dir, settings.age_threshold(), now);
            report.removed.extend(expired.removed);
            report.remaining = expired.remaining;
        }
        report
    });

    match job.await {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(error = %err, "cache eviction task failed");
            EvictionReport::default()
        }
    }
}

fn ensure_cache_dir(dir: &Path) {
    if let Err(err) = std::fs::create_dir_all(dir) {
        tracing::warn!(dir = %dir.display(), error = %err, "cannot create cache directory");
    }
}
