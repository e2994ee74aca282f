//! Export pipeline entry points. Every artifact is regenerated from the
//! current view and chart set on each request; nothing is cached.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use polars::prelude::*;
use std::path::{Path, PathBuf};

use crate::chart::{representative, ChartSpec};
use crate::chart_export::{try_rasterize, RASTER_HEIGHT, RASTER_WIDTH};
use crate::dataset::Dataset;
use crate::filter::FilteredView;
use crate::html_export::html_snapshot;
use crate::insight::InsightStatement;
use crate::pdf_export::pdf_report;

pub const REPORT_TITLE: &str = "Sales EDA Dashboard";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Html,
    Pdf,
    /// The original input file, unmodified.
    Dataset,
}

impl ExportFormat {
    pub const ALL: [Self; 4] = [Self::Csv, Self::Html, Self::Pdf, Self::Dataset];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Html => "HTML",
            Self::Pdf => "PDF",
            Self::Dataset => "Dataset",
        }
    }
}

/// A finished export: bytes plus enough metadata to hand the file to the
/// user. `notice` carries a non-fatal degradation message (e.g. the PDF
/// text-only fallback).
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: &'static str,
    pub notice: Option<String>,
}

/// Chart-dependent exports are disabled (not errored) when there is
/// nothing to render.
pub enum ExportOutcome {
    Artifact(ExportArtifact),
    NoCharts,
}

/// Serialize the filtered view verbatim as UTF-8 CSV with a header row.
pub fn csv_artifact(view: &FilteredView) -> Result<ExportArtifact> {
    let mut df = view.frame.clone();
    let mut bytes = Vec::new();
    CsvWriter::new(&mut bytes)
        .include_header(true)
        .finish(&mut df)?;
    Ok(ExportArtifact {
        bytes,
        file_name: "filtered_data.csv".to_string(),
        mime: "text/csv",
        notice: None,
    })
}

/// Offer the original input file back, unmodified, with its original MIME
/// type.
pub fn dataset_artifact(dataset: &Dataset) -> Result<ExportArtifact> {
    let bytes = std::fs::read(&dataset.path)?;
    let file_name = dataset
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("dataset")
        .to_string();
    Ok(ExportArtifact {
        bytes,
        file_name,
        mime: dataset.mime,
        notice: None,
    })
}

/// HTML snapshot of all rendered charts plus the insights list.
pub fn html_artifact(
    charts: &[ChartSpec],
    insights: &[InsightStatement],
    generated_at: DateTime<Utc>,
) -> Result<ExportOutcome> {
    html_snapshot(charts, insights, generated_at)
}

/// PDF report: representative chart image (best effort) plus title,
/// timestamp, and insights. A failed rasterization degrades to a text-only
/// report with a visible notice; only the absence of any chart disables
/// the export.
pub fn pdf_artifact(
    charts: &[ChartSpec],
    insights: &[InsightStatement],
    generated_at: DateTime<Utc>,
) -> Result<ExportOutcome> {
    let Some(chart) = representative(charts) else {
        return Ok(ExportOutcome::NoCharts);
    };

    let (image, notice) = match try_rasterize(chart, RASTER_WIDTH, RASTER_HEIGHT) {
        Ok(image) => (Some(image), None),
        Err(e) => (
            None,
            Some(format!("{}; exported text-only report", e)),
        ),
    };

    let timestamp = generated_at.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let bytes = pdf_report(
        REPORT_TITLE,
        &timestamp,
        image.as_ref(),
        insights,
        notice.as_deref(),
    )?;

    Ok(ExportOutcome::Artifact(ExportArtifact {
        bytes,
        file_name: "sales_report.pdf".to_string(),
        mime: "application/pdf",
        notice,
    }))
}

/// Write an artifact into `dir`, creating the directory if needed.
pub fn write_artifact(dir: &Path, artifact: &ExportArtifact) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&artifact.file_name);
    std::fs::write(&path, &artifact.bytes)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_round_trips_rows_and_columns() {
        let view = FilteredView {
            frame: df!(
                "Product" => &["A", "B"],
                "Sales" => &[100.5_f64, 200.0]
            )
            .unwrap(),
        };
        let artifact = csv_artifact(&view).unwrap();
        assert_eq!(artifact.mime, "text/csv");

        let reparsed = CsvReader::new(std::io::Cursor::new(artifact.bytes))
            .finish()
            .unwrap();
        assert_eq!(reparsed.height(), 2);
        let names: Vec<&str> = reparsed
            .get_column_names()
            .iter()
            .map(|s| s.as_str())
            .collect();
        assert_eq!(names, vec!["Product", "Sales"]);
        let sales = reparsed.column("Sales").unwrap().f64().unwrap();
        assert_eq!(sales.get(0), Some(100.5));
        assert_eq!(sales.get(1), Some(200.0));
    }

    #[test]
    fn csv_of_empty_view_has_header_only() {
        let view = FilteredView {
            frame: df!("Sales" => &[1.0_f64]).unwrap().head(Some(0)),
        };
        let artifact = csv_artifact(&view).unwrap();
        let text = String::from_utf8(artifact.bytes).unwrap();
        assert!(text.starts_with("Sales"));
    }

    #[test]
    fn pdf_no_charts_is_disabled_not_error() {
        let outcome = pdf_artifact(&[], &[], Utc::now()).unwrap();
        assert!(matches!(outcome, ExportOutcome::NoCharts));
    }
}
