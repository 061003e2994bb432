//! Overflow detection
//!
//! Compares glyph and table boxes against the page width and against cell
//! edges. Every offending glyph yields its own issue, so the number of
//! issues doubles as a measure of how badly a page overflows.

use crate::geometry::PageGeometry;
use crate::issue::{Issue, IssueType};

pub const DEFAULT_CELL_TOLERANCE: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverflowDetector {
    cell_tolerance: f64,
}

impl Default for OverflowDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_TOLERANCE)
    }
}

impl OverflowDetector {
    pub fn new(cell_tolerance: f64) -> Self {
        Self { cell_tolerance }
    }

    /// One `PageOverflow` per glyph whose right edge is past the page width
    pub fn check_page_overflow(&self, geometry: &PageGeometry, page: u32) -> Vec<Issue> {
        geometry
            .chars
            .iter()
            .filter(|c| c.x1() > geometry.width)
            .map(|c| {
                Issue::new(
                    page,
                    IssueType::PageOverflow,
                    c.text.as_str(),
                    "Content exceeds page width",
                )
            })
            .collect()
    }

    /// One `TableBoundaryOverflow` per table wider than the page
    pub fn check_table_overflow(&self, geometry: &PageGeometry, page: u32) -> Vec<Issue> {
        geometry
            .tables
            .iter()
            .filter(|t| t.bbox.x1 > geometry.width)
            .map(|t| {
                Issue::new(
                    page,
                    IssueType::TableBoundaryOverflow,
                    t.sample(),
                    "Table exceeds page width",
                )
            })
            .collect()
    }

    /// For each cell of each table, one `TableCellOverflow` per glyph on the
    /// page reaching further right than the cell edge plus the tolerance.
    pub fn check_table_cell_overflow(&self, geometry: &PageGeometry, page: u32) -> Vec<Issue> {
        let mut issues = Vec::new();
        for table in &geometry.tables {
            for cell in &table.cells {
                let limit = cell.x1 + self.cell_tolerance;
                issues.extend(geometry.chars.iter().filter(|c| c.x1() > limit).map(|c| {
                    Issue::new(
                        page,
                        IssueType::TableCellOverflow,
                        c.text.as_str(),
                        "Text exceeds cell boundary",
                    )
                }));
            }
        }
        issues
    }
}
