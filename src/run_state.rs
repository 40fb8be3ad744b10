//! Last-run bookkeeping for scheduled transfers
//!
//! The stamp file holds a single RFC 3339 timestamp. It is only written after
//! a transfer succeeds, so a failed run is retried on the next invocation.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local};

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone)]
pub struct RunState {
    path: PathBuf,
}

impl RunState {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_error(&self, error: String) -> ConfigError {
        ConfigError::FileError {
            path: self.path.display().to_string(),
            error,
        }
    }

    /// Time of the last recorded run; `None` if there has been none
    pub fn last_run(&self) -> ConfigResult<Option<DateTime<Local>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let stamp = fs::read_to_string(&self.path).map_err(|e| self.file_error(e.to_string()))?;
        let last = DateTime::parse_from_rfc3339(stamp.trim())
            .map_err(|e| self.file_error(format!("malformed timestamp {:?}: {e}", stamp.trim())))?;
        Ok(Some(last.with_timezone(&Local)))
    }

    /// Whether at least `min_gap` has passed since the last run
    pub fn is_due(&self, now: DateTime<Local>, min_gap: Duration) -> ConfigResult<bool> {
        Ok(match self.last_run()? {
            Some(last) => now >= last + min_gap,
            None => true,
        })
    }

    pub fn record(&self, now: DateTime<Local>) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| self.file_error(e.to_string()))?;
            }
        }
        fs::write(&self.path, format!("{}\n", now.to_rfc3339()))
            .map_err(|e| self.file_error(e.to_string()))?;
        log::debug!("Recorded run at {now} in {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn at(day: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, day, 9, 30, 0)
            .single()
            .expect("unambiguous local time")
    }

    #[test]
    fn test_no_previous_run_is_due() {
        let dir = tempdir().expect("tempdir");
        let state = RunState::new(dir.path().join("send_credit.data"));

        assert_eq!(state.last_run().expect("read"), None);
        assert!(state.is_due(at(1), Duration::days(10)).expect("due"));
    }

    #[test]
    fn test_gap_is_honoured() {
        let dir = tempdir().expect("tempdir");
        let state = RunState::new(dir.path().join("nested").join("send_credit.data"));
        state.record(at(1)).expect("record");

        assert_eq!(state.last_run().expect("read"), Some(at(1)));
        assert!(!state.is_due(at(10), Duration::days(10)).expect("not due"));
        assert!(state.is_due(at(11), Duration::days(10)).expect("due"));
        assert!(state.is_due(at(20), Duration::days(10)).expect("due"));
    }

    #[test]
    fn test_malformed_stamp_is_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("send_credit.data");
        fs::write(&path, "last tuesday").expect("write");

        let state = RunState::new(&path);
        assert!(matches!(state.last_run(), Err(ConfigError::FileError { .. })));
    }
}
