//! Analysis driver
//!
//! One pass over the document: build the destination index, then visit
//! pages in order running the overflow checks and, when enabled, the cell
//! and link checks. Findings accumulate in an [`AnalysisReport`]; only
//! faults reading the document come back as `Err`.

use crate::config::AnalyzerConfig;
use crate::destinations::DestinationIndex;
use crate::document::{DocumentSource, LopdfSource};
use crate::error::Result;
use crate::links::{HttpProbe, LinkChecker, LinkProbe};
use crate::overflow::OverflowDetector;
use crate::report::AnalysisReport;
use std::path::Path;
use tracing::{debug, info, warn};

pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze the PDF at `path`
    ///
    /// A missing file yields an empty report rather than an error.
    pub fn analyze<P: AsRef<Path>>(&self, path: P) -> Result<AnalysisReport> {
        let path = path.as_ref();
        self.config.validate()?;

        let file = display_name(path);
        if !path.exists() {
            warn!("PDF not found, skipping analysis: {}", path.display());
            return Ok(AnalysisReport::new(file));
        }

        let source = LopdfSource::open(path)?;
        self.analyze_document(&source, file)
    }

    /// Analyze an already opened document
    pub fn analyze_document(
        &self,
        source: &dyn DocumentSource,
        file: impl Into<String>,
    ) -> Result<AnalysisReport> {
        if self.config.probes_external_links() {
            let probe = HttpProbe::new(self.config.link_timeout)?;
            self.analyze_with_probe(source, file, Some(&probe))
        } else {
            self.analyze_with_probe(source, file, None)
        }
    }

    /// Analyze with a caller-supplied probe for external links
    ///
    /// The probe is used only when external link checking is enabled.
    pub fn analyze_with_probe(
        &self,
        source: &dyn DocumentSource,
        file: impl Into<String>,
        probe: Option<&dyn LinkProbe>,
    ) -> Result<AnalysisReport> {
        self.config.validate()?;
        let mut report = AnalysisReport::new(file);
        let page_count = source.page_count();
        info!("Analyzing {} ({} pages)", report.file(), page_count);

        let index = DestinationIndex::build(source)?;
        debug!("Indexed {} named destinations", index.len());

        let detector = OverflowDetector::new(self.config.cell_tolerance);
        let mut checker = LinkChecker::new(&index);
        if let Some(probe) = probe.filter(|_| self.config.probes_external_links()) {
            checker = checker.with_probe(probe, self.config.link_retries);
        }

        for page in 1..=page_count {
            let geometry = source.page_geometry(page)?;
            debug!(
                "Page {}: {} chars, {} tables",
                page,
                geometry.chars.len(),
                geometry.tables.len()
            );

            report.extend(detector.check_page_overflow(&geometry, page));
            report.extend(detector.check_table_overflow(&geometry, page));
            if self.config.check_cells {
                report.extend(detector.check_table_cell_overflow(&geometry, page));
            }
            if self.config.check_links {
                let annotations = source.page_annotations(page)?;
                report.extend(checker.check_page(&annotations, page));
            }
        }

        let summary = report.summary();
        info!(
            "Finished {}: {} errors, {} warnings",
            report.file(),
            summary.errors,
            summary.warnings
        );
        Ok(report)
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
