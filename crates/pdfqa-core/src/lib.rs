//! Static QA for generated PDFs
//!
//! Finds layout overflow (content past the page edge, tables past the page
//! edge, text spilling out of table cells) and broken hyperlinks (named
//! destinations that do not exist, unreachable web links). Findings are
//! collected into an [`AnalysisReport`]; [`RunPolicy`] maps a report to a
//! pass/fail outcome for the calling context.
//!
//! ```no_run
//! use pdfqa_core::{Analyzer, AnalyzerConfig, RunContext, RunPolicy};
//!
//! # fn example() -> pdfqa_core::Result<()> {
//! let config = AnalyzerConfig {
//!     check_links: true,
//!     ..AnalyzerConfig::default()
//! };
//! let report = Analyzer::new(config).analyze("out/guide.pdf")?;
//! let outcome = RunPolicy::decide(RunContext::Ci, report.has_errors());
//! std::process::exit(outcome.exit_code());
//! # }
//! ```

pub mod analyzer;
pub mod config;
pub mod destinations;
pub mod document;
pub mod error;
pub mod geometry;
pub mod issue;
pub mod links;
pub mod overflow;
pub mod policy;
pub mod report;

pub use analyzer::Analyzer;
pub use config::AnalyzerConfig;
pub use destinations::DestinationIndex;
pub use document::{DocumentSource, LopdfSource};
pub use error::{AnalyzerError, Result};
pub use issue::{Issue, IssueType, Severity};
pub use links::{HttpProbe, LinkChecker, LinkProbe, ProbeOutcome};
pub use overflow::OverflowDetector;
pub use policy::{Outcome, RunContext, RunPolicy};
pub use report::{AnalysisReport, OutputFormat, Reporter, Summary};
