use chrono::Utc;
use color_eyre::Result;
use edash::caps::ColumnCaps;
use edash::chart::build_charts;
use edash::export::{csv_artifact, html_artifact, pdf_artifact, ExportOutcome};
use edash::filter::FilteredView;
use edash::html_export::CHART_LIB_MARKER;
use edash::insight::generate_insights;
use polars::prelude::*;

mod common;

fn dashboard_pieces() -> Result<(
    FilteredView,
    ColumnCaps,
    Vec<edash::chart::ChartSpec>,
    Vec<edash::insight::InsightStatement>,
)> {
    let frame = common::sales_frame();
    let caps = ColumnCaps::from_frame(&frame);
    let view = FilteredView { frame };
    let insights = generate_insights(&view, &caps)?;
    let charts = build_charts(&view, &caps, 10)?;
    Ok((view, caps, charts, insights))
}

#[test]
fn csv_round_trip_preserves_rows_and_values() -> Result<()> {
    let (view, _, _, _) = dashboard_pieces()?;
    let artifact = csv_artifact(&view)?;

    let reparsed = CsvReader::new(std::io::Cursor::new(artifact.bytes)).finish()?;
    assert_eq!(reparsed.height(), view.frame.height());

    let mut original: Vec<String> = view
        .frame
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut round_tripped: Vec<String> = reparsed
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    original.sort();
    round_tripped.sort();
    assert_eq!(original, round_tripped);

    let sales_in = view.frame.column("Sales")?.f64()?;
    let sales_out = reparsed.column("Sales")?.f64()?;
    for i in 0..view.frame.height() {
        assert_eq!(sales_in.get(i), sales_out.get(i));
    }
    Ok(())
}

#[test]
fn html_snapshot_has_single_lib_inclusion() -> Result<()> {
    let (_, _, charts, insights) = dashboard_pieces()?;
    assert!(charts.len() >= 3, "need several charts for this test");

    let outcome = html_artifact(&charts, &insights, Utc::now())?;
    let ExportOutcome::Artifact(artifact) = outcome else {
        panic!("expected artifact");
    };
    let doc = String::from_utf8(artifact.bytes).unwrap();

    assert_eq!(doc.matches(CHART_LIB_MARKER).count(), 1);
    assert_eq!(
        doc.matches("<section class=\"chart\"").count(),
        charts.len()
    );
    assert!(doc.contains("<h2>Sales vs Profit</h2>"));
    // Insights come after every chart fragment.
    let insights_pos = doc.find("<section class=\"insights\"").unwrap();
    let last_chart_pos = doc.rfind("<section class=\"chart\"").unwrap();
    assert!(insights_pos > last_chart_pos);
    Ok(())
}

#[test]
fn html_export_with_no_charts_is_disabled() -> Result<()> {
    let outcome = html_artifact(&[], &[], Utc::now())?;
    assert!(matches!(outcome, ExportOutcome::NoCharts));
    Ok(())
}

#[test]
fn pdf_export_succeeds_with_or_without_rasterizer() -> Result<()> {
    let (_, _, charts, insights) = dashboard_pieces()?;
    let outcome = pdf_artifact(&charts, &insights, Utc::now())?;
    let ExportOutcome::Artifact(artifact) = outcome else {
        panic!("expected artifact");
    };

    // Whether or not rasterization worked in this environment, the export
    // succeeds and the document carries the insights.
    assert!(!artifact.bytes.is_empty());
    assert!(artifact.bytes.starts_with(b"%PDF-"));
    let text = String::from_utf8_lossy(&artifact.bytes);
    assert!(text.contains("Insights"));
    if artifact.notice.is_some() {
        // Degraded path: no embedded image, but still a full document.
        assert!(!text.contains("/Subtype /Image"));
        assert!(text.contains("text-only"));
    }
    Ok(())
}

#[test]
fn pdf_export_without_charts_is_disabled() -> Result<()> {
    let (_, _, _, insights) = dashboard_pieces()?;
    let outcome = pdf_artifact(&[], &insights, Utc::now())?;
    assert!(matches!(outcome, ExportOutcome::NoCharts));
    Ok(())
}
