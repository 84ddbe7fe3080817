//! Execution ledger
//!
//! A small TOML file recording when the advisor last ran and when the next
//! run is due. A missing file means the advisor has never run.

use chrono::{DateTime, Duration, Utc};
use scanwatch_core::{Result, ScanwatchError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionLedger {
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub run_count: u64,
}

impl ExecutionLedger {
    /// Load the ledger at `path`; a missing file yields an empty ledger
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(source) => Ok(toml::from_str(&source)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no execution ledger yet");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Write the ledger through a temporary file so a crash never truncates it
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let source = toml::to_string_pretty(self)
            .map_err(|err| ScanwatchError::Configuration(format!("cannot encode ledger: {}", err)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let partial = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&partial, source)?;
        if let Err(err) = fs::rename(&partial, path) {
            let _ = fs::remove_file(&partial);
            return Err(err.into());
        }
        Ok(())
    }

    pub fn is_first_run(&self) -> bool {
        self.last_run.is_none()
    }

    /// Record a completed run at `now` and schedule the next one
    pub fn record_run(&mut self, now: DateTime<Utc>, interval_hours: u32) {
        self.last_run = Some(now);
        self.next_run = Some(now + Duration::hours(i64::from(interval_hours)));
        self.run_count = self.run_count.saturating_add(1);
    }

    /// True when no run is scheduled or the scheduled time has passed
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_run.is_none_or(|next| next <= now)
    }
}

#[cfg(test)]
mod tests;
