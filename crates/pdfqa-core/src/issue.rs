//! Issue model
//!
//! An [`Issue`] is one finding on one page. Severity is not chosen by the
//! detectors: it follows from the [`IssueType`], so broken internal links
//! are always errors and everything else is always a warning.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of defect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueType {
    #[serde(rename = "Page Overflow")]
    PageOverflow,
    #[serde(rename = "Table Boundary Overflow")]
    TableBoundaryOverflow,
    #[serde(rename = "Table Cell Overflow")]
    TableCellOverflow,
    #[serde(rename = "Broken Internal Link")]
    BrokenInternalLink,
    #[serde(rename = "Broken External Link")]
    BrokenExternalLink,
}

impl IssueType {
    pub fn severity(&self) -> Severity {
        match self {
            IssueType::BrokenInternalLink => Severity::Error,
            IssueType::PageOverflow
            | IssueType::TableBoundaryOverflow
            | IssueType::TableCellOverflow
            | IssueType::BrokenExternalLink => Severity::Warning,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IssueType::PageOverflow => "Page Overflow",
            IssueType::TableBoundaryOverflow => "Table Boundary Overflow",
            IssueType::TableCellOverflow => "Table Cell Overflow",
            IssueType::BrokenInternalLink => "Broken Internal Link",
            IssueType::BrokenExternalLink => "Broken External Link",
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(
            self,
            IssueType::BrokenInternalLink | IssueType::BrokenExternalLink
        )
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether a finding can block a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Advisory
    Warning,
    /// Blocking in CI
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// A single finding, immutable once created
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    page: u32,
    #[serde(rename = "type")]
    issue_type: IssueType,
    severity: Severity,
    text: String,
    details: String,
}

impl Issue {
    pub fn new(
        page: u32,
        issue_type: IssueType,
        text: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            page,
            issue_type,
            severity: issue_type.severity(),
            text: text.into(),
            details: details.into(),
        }
    }

    /// 1-based page number
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn issue_type(&self) -> IssueType {
        self.issue_type
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "page {} [{}] {}: {} ({})",
            self.page, self.severity, self.issue_type, self.details, self.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_internal_links_are_errors() {
        let issue = Issue::new(
            3,
            IssueType::BrokenInternalLink,
            "sec2",
            "Named destination not found",
        );
        assert_eq!(issue.severity(), Severity::Error);
        assert!(issue.is_error());
    }

    #[test]
    fn test_everything_else_is_a_warning() {
        for t in [
            IssueType::PageOverflow,
            IssueType::TableBoundaryOverflow,
            IssueType::TableCellOverflow,
            IssueType::BrokenExternalLink,
        ] {
            assert_eq!(Issue::new(1, t, "", "").severity(), Severity::Warning);
        }
    }

    #[test]
    fn test_issue_serializes_flat() {
        let issue = Issue::new(1, IssueType::PageOverflow, "W", "Content exceeds page width");
        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(
            value,
            json!({
                "page": 1,
                "type": "Page Overflow",
                "severity": "warning",
                "text": "W",
                "details": "Content exceeds page width"
            })
        );
    }

    #[test]
    fn test_display() {
        let issue = Issue::new(
            2,
            IssueType::BrokenInternalLink,
            "sec2",
            "Named destination not found",
        );
        assert_eq!(
            issue.to_string(),
            "page 2 [error] Broken Internal Link: Named destination not found (sec2)"
        );
    }
}
