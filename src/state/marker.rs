use chrono::NaiveDateTime;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// On-disk format, e.g. `17-Dec-2023 (17:07:41.123456)`
pub const MARKER_FORMAT: &str = "%d-%b-%Y (%H:%M:%S%.6f)";

/// Records when the archive was last polled, so a restart does not
/// immediately hit the network again. This is the only persisted state.
#[derive(Debug, Clone)]
pub struct LastCheck {
    path: PathBuf,
}

impl LastCheck {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Read the stored timestamp
    pub fn read(&self) -> Result<NaiveDateTime> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| Error::io(&self.path, e))?;
        let text = text.trim();
        NaiveDateTime::parse_from_str(text, MARKER_FORMAT).map_err(|source| Error::Timestamp {
            value: text.to_string(),
            source,
        })
    }

    /// Read the stored timestamp, or `fallback` when the file is missing or corrupt
    pub fn read_or(&self, fallback: NaiveDateTime) -> NaiveDateTime {
        match self.read() {
            Ok(when) => {
                tracing::info!(last_check = %when, "last check from file");
                when
            }
            Err(err) => {
                tracing::debug!(error = %err, "no usable last-check marker");
                fallback
            }
        }
    }

    /// Overwrite the marker with `when`
    pub fn write(&self, when: NaiveDateTime) -> Result<()> {
        std::fs::write(&self.path, when.format(MARKER_FORMAT).to_string())
            .map_err(|e| Error::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 12, 17)
            .unwrap()
            .and_hms_micro_opt(17, 7, 41, 123456)
            .unwrap()
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let marker = LastCheck::new(dir.path().join("lastCheck"));

        marker.write(stamp()).unwrap();
        assert_eq!(
            std::fs::read_to_string(marker.path()).unwrap(),
            "17-Dec-2023 (17:07:41.123456)"
        );
        assert_eq!(marker.read().unwrap(), stamp());
    }

    #[test]
    fn test_missing_or_corrupt_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let marker = LastCheck::new(dir.path().join("lastCheck"));
        let fallback = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        assert_eq!(marker.read_or(fallback), fallback);

        std::fs::write(marker.path(), "yesterday-ish").unwrap();
        assert_eq!(marker.read_or(fallback), fallback);
    }
}
