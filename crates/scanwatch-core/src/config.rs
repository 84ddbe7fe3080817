//! Advisor configuration
//!
//! One explicit struct handed to every component constructor. It can be
//! built in code with the builder methods or loaded from a TOML file:
//!
//! ```toml
//! [analysis]
//! size_threshold_mb = 10.0
//! schema_low_queries = 10
//! schema_regular_queries = 100
//!
//! [lookup]
//! timeout_ms = 5000
//! max_concurrency = 4
//!
//! [scripts]
//! output_dir = "output/generated_scripts"
//! default_index_column = "ID"
//!
//! [schedule]
//! interval_hours = 6
//! ```

use crate::{Result, ScanwatchError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default tier boundary in megabytes
pub const DEFAULT_SIZE_THRESHOLD_MB: f64 = 10.0;

/// Table classification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Tables strictly below this size are tier 1, the rest tier 2
    pub size_threshold_mb: f64,
    /// Schemas with fewer full-scan statements are LOW
    pub schema_low_queries: u64,
    /// Schemas with fewer full-scan statements are at most REGULAR
    pub schema_regular_queries: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            size_threshold_mb: DEFAULT_SIZE_THRESHOLD_MB,
            schema_low_queries: 10,
            schema_regular_queries: 100,
        }
    }
}

/// Metadata lookup settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Upper bound for a single metadata lookup
    pub timeout_ms: u64,
    /// Number of tables looked up concurrently
    pub max_concurrency: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_concurrency: 4,
        }
    }
}

impl LookupConfig {
    /// Lookup timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Script and report output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Directory generated `.sql` files are written to
    pub output_dir: PathBuf,
    /// Directory HTML reports are written to
    pub report_dir: PathBuf,
    /// Column used in `CREATE INDEX` when no predicate column is known
    pub default_index_column: String,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output/generated_scripts"),
            report_dir: PathBuf::from("output/reports"),
            default_index_column: "ID".to_string(),
        }
    }
}

/// Execution schedule settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Hours between two runs
    pub interval_hours: u32,
    /// File holding the first-run flag and run timestamps
    pub ledger_path: PathBuf,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_hours: 6,
            ledger_path: PathBuf::from("config/execution.toml"),
        }
    }
}

/// Complete advisor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub analysis: AnalysisConfig,
    pub lookup: LookupConfig,
    pub scripts: ScriptsConfig,
    pub schedule: ScheduleConfig,
}

impl AdvisorConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|err| {
            ScanwatchError::Configuration(format!("cannot read {}: {}", path.display(), err))
        })?;
        tracing::debug!(path = %path.display(), "loaded advisor configuration");
        Self::from_toml_str(&source)
    }

    /// Sets the tier boundary
    pub fn with_size_threshold_mb(mut self, threshold: f64) -> Self {
        self.analysis.size_threshold_mb = threshold;
        self
    }

    /// Sets the per-lookup timeout
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Sets the number of concurrent metadata lookups
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.lookup.max_concurrency = max_concurrency;
        self
    }

    /// Sets the script output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scripts.output_dir = dir.into();
        self
    }

    /// Sets the hours between runs
    pub fn with_interval_hours(mut self, hours: u32) -> Self {
        self.schedule.interval_hours = hours;
        self
    }

    /// Rejects values no component can work with
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.analysis.size_threshold_mb)?;
        if self.analysis.schema_low_queries > self.analysis.schema_regular_queries {
            return Err(ScanwatchError::InvalidArgument(format!(
                "analysis.schema_low_queries ({}) must not exceed analysis.schema_regular_queries ({})",
                self.analysis.schema_low_queries, self.analysis.schema_regular_queries
            )));
        }
        if self.lookup.max_concurrency == 0 {
            return Err(ScanwatchError::InvalidArgument(
                "lookup.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.lookup.timeout_ms == 0 {
            return Err(ScanwatchError::InvalidArgument(
                "lookup.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.scripts.default_index_column.trim().is_empty() {
            return Err(ScanwatchError::InvalidArgument(
                "scripts.default_index_column must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Checks a size threshold is a finite, non-negative number of megabytes
pub fn validate_threshold(threshold_mb: f64) -> Result<()> {
    if !threshold_mb.is_finite() || threshold_mb < 0.0 {
        return Err(ScanwatchError::InvalidArgument(format!(
            "size threshold must be a finite non-negative number, got {}",
            threshold_mb
        )));
    }
    Ok(())
}
