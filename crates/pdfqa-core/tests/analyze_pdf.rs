//! End-to-end analysis of PDFs built in memory

mod common;

use common::*;
use pdfqa_core::{
    AnalysisReport, Analyzer, AnalyzerConfig, DestinationIndex, DocumentSource, IssueType,
    LinkProbe, LopdfSource, Outcome, ProbeOutcome, RunContext, RunPolicy, Severity,
};
use pretty_assertions::assert_eq;
use std::cell::RefCell;

fn links_only_internal() -> AnalyzerConfig {
    AnalyzerConfig {
        check_links: true,
        check_external_links: false,
        ..AnalyzerConfig::default()
    }
}

fn analyze_bytes(config: AnalyzerConfig, pdf: &[u8]) -> AnalysisReport {
    let source = LopdfSource::from_bytes(pdf).unwrap();
    Analyzer::new(config)
        .analyze_document(&source, "fixture.pdf")
        .unwrap()
}

fn kinds(report: &AnalysisReport) -> Vec<(u32, IssueType, String)> {
    report
        .issues()
        .iter()
        .map(|i| (i.page(), i.issue_type(), i.text().to_string()))
        .collect()
}

/// Records probed URIs and reports every one as a 404
#[derive(Default)]
struct RecordingProbe {
    seen: RefCell<Vec<String>>,
}

impl LinkProbe for RecordingProbe {
    fn probe(&self, uri: &str) -> ProbeOutcome {
        self.seen.borrow_mut().push(uri.to_string());
        ProbeOutcome::HttpError(404)
    }
}

#[test]
fn test_char_one_point_past_edge_is_page_overflow() {
    // 10pt Courier glyph is 6pt wide: 607 + 6 = 613 = width + 1
    let pdf = PdfBuilder::new()
        .page(text_at(607.0, 700.0, "X"), vec![])
        .build();
    let report = analyze_bytes(AnalyzerConfig::default(), &pdf);

    assert_eq!(
        kinds(&report),
        vec![(1, IssueType::PageOverflow, "X".to_string())]
    );
    assert_eq!(report.issues()[0].severity(), Severity::Warning);
    assert!(!report.has_errors());
}

#[test]
fn test_char_ending_exactly_at_edge_is_fine() {
    let pdf = PdfBuilder::new()
        .page(text_at(606.0, 700.0, "X"), vec![])
        .build();
    assert!(analyze_bytes(AnalyzerConfig::default(), &pdf).is_clean());
}

#[test]
fn test_quarter_turned_page_measures_displayed_width() {
    // Letter turned to landscape: displayed width is the MediaBox height.
    // "W" sits past x = 612 in user space but well inside 792 on screen;
    // "E" sits above y = 792, which is past the displayed right edge.
    let mut ops = text_at(620.0, 300.0, "W");
    ops.extend(text_at(100.0, 790.0, "E"));
    let pdf = PdfBuilder::new().rotated_page(90, ops).build();

    let source = LopdfSource::from_bytes(&pdf).unwrap();
    let geometry = source.page_geometry(1).unwrap();
    assert_eq!((geometry.width, geometry.height), (792.0, 612.0));

    let report = Analyzer::default()
        .analyze_document(&source, "fixture.pdf")
        .unwrap();
    assert_eq!(
        kinds(&report),
        vec![(1, IssueType::PageOverflow, "E".to_string())]
    );
}

#[test]
fn test_rotation_is_normalised() {
    let pdf = PdfBuilder::new()
        .rotated_page(-270, text_at(620.0, 300.0, "W"))
        .rotated_page(180, text_at(607.0, 700.0, "X"))
        .build();

    let source = LopdfSource::from_bytes(&pdf).unwrap();
    assert_eq!(source.page_geometry(1).unwrap().width, 792.0);
    assert_eq!(source.page_geometry(2).unwrap().width, 612.0);

    // upside down, the glyph past the right edge is now past the left one
    let report = Analyzer::default()
        .analyze_document(&source, "fixture.pdf")
        .unwrap();
    assert!(report.is_clean());
}

#[test]
fn test_missing_named_destination_is_blocking() {
    let pdf = PdfBuilder::new()
        .page(text_at(72.0, 700.0, "See section 2"), vec![named_link("sec2")])
        .build();
    let report = analyze_bytes(links_only_internal(), &pdf);

    assert_eq!(
        kinds(&report),
        vec![(1, IssueType::BrokenInternalLink, "sec2".to_string())]
    );
    assert_eq!(report.issues()[0].severity(), Severity::Error);
    assert_eq!(report.issues()[0].details(), "Named destination not found");
    assert!(report.has_errors());
    assert_eq!(RunPolicy::decide(RunContext::Ci, report.has_errors()), Outcome::Fail);
    assert_eq!(
        RunPolicy::decide(RunContext::Hook, report.has_errors()),
        Outcome::Succeed
    );
}

#[test]
fn test_link_checks_disabled_finds_nothing() {
    let pdf = PdfBuilder::new()
        .page(
            vec![],
            vec![
                named_link("sec2"),
                goto_link("gone"),
                uri_link("https://broken.example/"),
            ],
        )
        .build();
    let source = LopdfSource::from_bytes(&pdf).unwrap();
    let probe = RecordingProbe::default();

    let report = Analyzer::new(AnalyzerConfig::default())
        .analyze_with_probe(&source, "fixture.pdf", Some(&probe))
        .unwrap();

    assert!(report.issues().iter().all(|i| !i.issue_type().is_link()));
    assert!(probe.seen.borrow().is_empty());
}

#[test]
fn test_catalog_dests_resolve_links() {
    let pdf = PdfBuilder::new()
        .page(vec![], vec![named_link("sec2"), goto_link("sec2")])
        .page(text_at(72.0, 700.0, "Section 2"), vec![])
        .dest("sec2", 1)
        .build();
    assert!(analyze_bytes(links_only_internal(), &pdf).is_clean());
}

#[test]
fn test_name_tree_destinations() {
    let pdf = PdfBuilder::new()
        .page(vec![], vec![named_link("sec3"), named_link("sec4")])
        .page(vec![], vec![])
        .named_dest("intro", 0)
        .named_dest("sec2", 1)
        .named_dest("sec3", 1)
        .build();

    let source = LopdfSource::from_bytes(&pdf).unwrap();
    let index = DestinationIndex::build(&source).unwrap();
    assert_eq!(index.len(), 3);
    assert_eq!(index.resolve("sec2").and_then(|t| t.page), Some(2));
    assert_eq!(index.resolve("intro").and_then(|t| t.page), Some(1));

    let report = Analyzer::new(links_only_internal())
        .analyze_document(&source, "fixture.pdf")
        .unwrap();
    assert_eq!(
        kinds(&report),
        vec![(1, IssueType::BrokenInternalLink, "sec4".to_string())]
    );
}

#[test]
fn test_goto_action_checked_like_dest() {
    let pdf = PdfBuilder::new()
        .page(vec![], vec![goto_link("appendix")])
        .build();
    let report = analyze_bytes(links_only_internal(), &pdf);
    assert_eq!(
        kinds(&report),
        vec![(1, IssueType::BrokenInternalLink, "appendix".to_string())]
    );
}

#[test]
fn test_explicit_and_non_link_annotations_pass() {
    let pdf = PdfBuilder::new()
        .page(vec![], vec![explicit_link(), sticky_note()])
        .build();

    let source = LopdfSource::from_bytes(&pdf).unwrap();
    let annotations = source.page_annotations(1).unwrap();
    let subtypes: Vec<&str> = annotations.iter().map(|a| a.subtype.as_str()).collect();
    assert_eq!(subtypes, vec!["Link", "Text"]);

    let report = Analyzer::new(links_only_internal())
        .analyze_document(&source, "fixture.pdf")
        .unwrap();
    assert!(report.is_clean());
}

#[test]
fn test_external_links_probed_only_for_web_schemes() {
    let pdf = PdfBuilder::new()
        .page(
            vec![],
            vec![
                uri_link("mailto:docs@example.com"),
                uri_link("https://example.com/moved"),
            ],
        )
        .build();
    let source = LopdfSource::from_bytes(&pdf).unwrap();
    let probe = RecordingProbe::default();
    let config = AnalyzerConfig {
        check_links: true,
        ..AnalyzerConfig::default()
    };

    let report = Analyzer::new(config)
        .analyze_with_probe(&source, "fixture.pdf", Some(&probe))
        .unwrap();

    assert_eq!(*probe.seen.borrow(), vec!["https://example.com/moved".to_string()]);
    assert_eq!(
        kinds(&report),
        vec![(
            1,
            IssueType::BrokenExternalLink,
            "https://example.com/moved".to_string()
        )]
    );
    assert_eq!(report.issues()[0].details(), "HTTP 404");
    assert!(!report.has_errors());
}

#[test]
fn test_ruled_table_past_page_edge() {
    // two cells: 400-500 and 500-650, the second runs off a 612pt page
    let mut ops = grid_row(&[400.0, 500.0, 650.0], 600.0, 640.0);
    ops.extend(text_at(405.0, 618.0, "Name"));
    ops.extend(text_at(505.0, 618.0, "Value"));
    let pdf = PdfBuilder::new().page(ops, vec![]).build();

    let source = LopdfSource::from_bytes(&pdf).unwrap();
    let geometry = source.page_geometry(1).unwrap();
    assert_eq!(geometry.tables.len(), 1);
    assert_eq!(geometry.tables[0].cells.len(), 2);

    let report = Analyzer::default()
        .analyze_document(&source, "fixture.pdf")
        .unwrap();

    let mut expected = vec![(
        1,
        IssueType::TableBoundaryOverflow,
        "Name | Value".to_string(),
    )];
    // every glyph of "Value" lies right of the first cell's edge + 3.0
    expected.extend(
        "Value"
            .chars()
            .map(|c| (1, IssueType::TableCellOverflow, c.to_string())),
    );
    assert_eq!(kinds(&report), expected);
}

#[test]
fn test_cell_checks_disabled() {
    let mut ops = grid_row(&[100.0, 200.0, 300.0], 600.0, 640.0);
    ops.extend(text_at(105.0, 618.0, "A very long cell value"));
    let pdf = PdfBuilder::new().page(ops, vec![]).build();

    let with_cells = analyze_bytes(AnalyzerConfig::default(), &pdf);
    assert!(with_cells
        .issues()
        .iter()
        .all(|i| i.issue_type() == IssueType::TableCellOverflow));
    assert!(!with_cells.is_clean());

    let config = AnalyzerConfig {
        check_cells: false,
        ..AnalyzerConfig::default()
    };
    assert!(analyze_bytes(config, &pdf).is_clean());
}

#[test]
fn test_issues_follow_page_order() {
    let pdf = PdfBuilder::new()
        .page(text_at(72.0, 700.0, "fine"), vec![])
        .page(text_at(610.0, 700.0, "W"), vec![named_link("nope")])
        .page(vec![], vec![named_link("also-nope")])
        .build();
    let report = analyze_bytes(links_only_internal(), &pdf);

    assert_eq!(
        kinds(&report),
        vec![
            (2, IssueType::PageOverflow, "W".to_string()),
            (2, IssueType::BrokenInternalLink, "nope".to_string()),
            (3, IssueType::BrokenInternalLink, "also-nope".to_string()),
        ]
    );
    let summary = report.summary();
    assert_eq!((summary.errors, summary.warnings), (2, 1));
}

#[test]
fn test_analyze_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guide.pdf");
    std::fs::write(
        &path,
        PdfBuilder::new()
            .page(text_at(607.0, 700.0, "X"), vec![])
            .build(),
    )
    .unwrap();

    let report = Analyzer::default().analyze(&path).unwrap();
    assert_eq!(report.file(), "guide.pdf");
    assert_eq!(report.summary().warnings, 1);
}

#[test]
fn test_missing_pdf_is_vacuous_success() {
    let dir = tempfile::tempdir().unwrap();
    let report = Analyzer::new(links_only_internal())
        .analyze(dir.path().join("never-built.pdf"))
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(
        RunPolicy::decide(RunContext::Ci, report.has_errors()),
        Outcome::Succeed
    );
}
