//! Analyzer configuration
//!
//! Every option has a default, so an empty TOML document (or no file at all)
//! yields the stock behaviour: overflow and cell checks on, link checks off.
//!
//! ```toml
//! check_cells = true
//! cell_tolerance = 3.0
//! check_links = true
//! check_external_links = false
//! link_timeout = 5
//! run_context = "ci"
//! ```

use crate::error::{AnalyzerError, Result};
use crate::policy::RunContext;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Options recognised by the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Run the per-cell overflow check
    pub check_cells: bool,
    /// Slack allowed past a cell's right edge, in page units
    pub cell_tolerance: f64,
    /// Inspect link annotations at all
    pub check_links: bool,
    /// Probe http(s) targets over the network (only with `check_links`)
    pub check_external_links: bool,
    /// Per-request timeout for external probes, in seconds
    #[serde(with = "duration_secs")]
    pub link_timeout: Duration,
    /// Extra attempts after a timeout or transport failure
    pub link_retries: u32,
    /// Invocation mode, only consulted by the run policy
    pub run_context: RunContext,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            check_cells: true,
            cell_tolerance: 3.0,
            check_links: false,
            check_external_links: true,
            link_timeout: Duration::from_secs(5),
            link_retries: 0,
            run_context: RunContext::Hook,
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| match e {
            AnalyzerError::Config(msg) => {
                AnalyzerError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| AnalyzerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.cell_tolerance.is_finite() || self.cell_tolerance < 0.0 {
            return Err(AnalyzerError::Config(format!(
                "cell_tolerance must be a non-negative number, got {}",
                self.cell_tolerance
            )));
        }
        if self.link_timeout.is_zero() {
            return Err(AnalyzerError::Config(
                "link_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// External probes run only when both link switches are on
    pub fn probes_external_links(&self) -> bool {
        self.check_links && self.check_external_links
    }
}

/// Serde module for Duration as (possibly fractional) seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
