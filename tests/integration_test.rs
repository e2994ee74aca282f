//! End-to-end flow: load from disk, filter, recompute, export everything.

use chrono::NaiveDate;
use color_eyre::Result;
use edash::export::ExportFormat;
use edash::{headless_export, Dashboard, Dataset, FilterParams, LoadOptions};

mod common;

#[test]
fn load_filter_export_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = common::write_sales_csv(dir.path());

    let dataset = Dataset::load(&path, &LoadOptions::new())?;
    let filter = FilterParams {
        date_start: NaiveDate::from_ymd_opt(2024, 1, 2),
        date_end: NaiveDate::from_ymd_opt(2024, 1, 6),
        products: Some(vec!["Widget".to_string(), "Gadget".to_string()]),
    };
    let dashboard = Dashboard::build(dataset, filter, 10)?;

    // Jan 2-6 inclusive has 5 rows; Doohickey (Jan 4) is filtered out.
    assert_eq!(dashboard.view.height(), 4);
    assert!(dashboard.view.height() <= 8);
    assert!(!dashboard.charts.is_empty());
    assert!(!dashboard.insights.is_empty());
    // Dates were coerced at load time, so the time-series chart is present.
    assert!(dashboard
        .charts
        .iter()
        .any(|c| c.kind == edash::chart::ChartKind::QuantityOverTime));

    let out_dir = dir.path().join("exports");
    let reports = headless_export(
        &dashboard,
        &[
            ExportFormat::Csv,
            ExportFormat::Html,
            ExportFormat::Pdf,
            ExportFormat::Dataset,
        ],
        &out_dir,
    )?;
    assert_eq!(reports.len(), 4);

    for report in &reports {
        let path = report.path.as_ref().expect("every export should produce a file");
        let metadata = std::fs::metadata(path)?;
        assert!(metadata.len() > 0, "{} artifact is empty", path.display());
    }

    // The dataset passthrough is byte-identical to the input.
    let passthrough = reports
        .iter()
        .find(|r| r.format == ExportFormat::Dataset)
        .and_then(|r| r.path.clone())
        .unwrap();
    assert_eq!(std::fs::read(&passthrough)?, std::fs::read(&path)?);
    Ok(())
}

#[test]
fn aggregate_partition_invariant_over_filtered_view() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = common::write_sales_csv(dir.path());
    let dataset = Dataset::load(&path, &LoadOptions::new())?;
    let dashboard = Dashboard::build(
        dataset,
        FilterParams {
            products: Some(vec![
                "Widget".to_string(),
                "Doohickey".to_string(),
            ]),
            ..Default::default()
        },
        10,
    )?;

    let view_total: f64 = dashboard.totals.sales.unwrap();
    for keys in [
        vec!["Category"],
        vec!["Product"],
        vec!["Category", "Product"],
    ] {
        let grouped = edash::aggregate::sum_by(&dashboard.view.frame, &keys, &["Sales", "Profit"])?;
        let grouped_total: f64 = grouped
            .column("Sales")?
            .f64()?
            .into_iter()
            .flatten()
            .sum();
        assert!(
            (grouped_total - view_total).abs() < 1e-9,
            "partition invariant violated for {:?}",
            keys
        );
    }
    Ok(())
}

#[test]
fn empty_selection_and_inverted_range_yield_empty_views() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = common::write_sales_csv(dir.path());
    let dataset = Dataset::load(&path, &LoadOptions::new())?;

    let zero_products = Dashboard::build(
        dataset.clone(),
        FilterParams {
            products: Some(vec![]),
            ..Default::default()
        },
        10,
    )?;
    assert_eq!(zero_products.view.height(), 0);

    let inverted = Dashboard::build(
        dataset,
        FilterParams {
            date_start: NaiveDate::from_ymd_opt(2024, 1, 8),
            date_end: NaiveDate::from_ymd_opt(2024, 1, 1),
            products: None,
        },
        10,
    )?;
    assert_eq!(inverted.view.height(), 0);

    // An empty view still exports CSV (header only) without error.
    let artifact = edash::export::csv_artifact(&inverted.view)?;
    assert!(!artifact.bytes.is_empty());
    Ok(())
}

#[test]
fn refilter_is_always_a_fresh_derivation() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = common::write_sales_csv(dir.path());
    let dataset = Dataset::load(&path, &LoadOptions::new())?;
    let dashboard = Dashboard::build(dataset, FilterParams::default(), 10)?;

    let narrowed = dashboard.refilter(FilterParams {
        products: Some(vec!["Widget".to_string()]),
        ..Default::default()
    })?;
    assert_eq!(narrowed.view.height(), 3);

    // Narrow, then widen again: nothing was lost from the source.
    let widened = narrowed.refilter(FilterParams::default())?;
    assert_eq!(widened.view.height(), 8);
    Ok(())
}
