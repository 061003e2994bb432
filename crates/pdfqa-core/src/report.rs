//! Analysis report and output formatting
//!
//! The report keeps issues in discovery order and maintains the severity
//! totals as issues are pushed, so `summary()` never rescans.
//!
//! # Example
//!
//! ```no_run
//! use pdfqa_core::{Analyzer, AnalyzerConfig, OutputFormat, Reporter};
//!
//! # fn example() -> pdfqa_core::Result<()> {
//! let report = Analyzer::new(AnalyzerConfig::default()).analyze("manual.pdf")?;
//! Reporter::new(OutputFormat::JsonPretty).write_to_file(&report, "qa/manual.json")?;
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::issue::{Issue, Severity};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

/// Issue counts by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.errors + self.warnings
    }
}

/// All issues found in one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    file: String,
    summary: Summary,
    issues: Vec<Issue>,
}

impl AnalysisReport {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            summary: Summary::default(),
            issues: Vec::new(),
        }
    }

    pub fn push(&mut self, issue: Issue) {
        match issue.severity() {
            Severity::Error => self.summary.errors += 1,
            Severity::Warning => self.summary.warnings += 1,
        }
        self.issues.push(issue);
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// True iff any issue is blocking
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "PDF QA: {}", self.file);
        if self.is_clean() {
            let _ = writeln!(out, "  No issues found");
            return out;
        }
        let _ = writeln!(
            out,
            "  {} {}, {} {}",
            self.summary.errors,
            plural(self.summary.errors, "error", "errors"),
            self.summary.warnings,
            plural(self.summary.warnings, "warning", "warnings"),
        );
        for issue in &self.issues {
            let _ = writeln!(out, "  {}", issue);
        }
        out
    }
}

impl Extend<Issue> for AnalysisReport {
    fn extend<T: IntoIterator<Item = Issue>>(&mut self, iter: T) {
        for issue in iter {
            self.push(issue);
        }
    }
}

fn plural(n: usize, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 {
        one
    } else {
        many
    }
}

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single-line JSON for machine parsing
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Human-readable summary
    #[default]
    Text,
}

pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, report: &AnalysisReport) -> Result<String> {
        let output = match self.format {
            OutputFormat::Json => serde_json::to_string(report).map_err(io::Error::from)?,
            OutputFormat::JsonPretty => {
                serde_json::to_string_pretty(report).map_err(io::Error::from)?
            }
            OutputFormat::Text => report.to_text(),
        };
        Ok(output)
    }

    /// Write the formatted report, creating parent directories as needed
    pub fn write_to_file<P: AsRef<Path>>(&self, report: &AnalysisReport, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.format(report)?)?;
        Ok(())
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(OutputFormat::default())
    }
}
