//! HTML snapshot export: one self-contained document concatenating every
//! rendered chart as an SVG fragment.
//!
//! Exactly one fragment (the first) carries the shared chart-helper script;
//! later fragments must omit it. A duplicate block would double-run the
//! helper and a missing one leaves fragments inert, so the
//! include-once-first rule is load-bearing and tested.

use chrono::{DateTime, Utc};
use color_eyre::Result;

use crate::chart::ChartSpec;
use crate::chart_export::render_svg;
use crate::export::{ExportArtifact, ExportOutcome, REPORT_TITLE};
use crate::insight::InsightStatement;

/// Marker id of the shared script block; appears exactly once per document.
pub const CHART_LIB_MARKER: &str = "edash-chart-lib";

const FRAGMENT_WIDTH: u32 = 720;
const FRAGMENT_HEIGHT: u32 = 420;

/// Shared helper wired to every chart fragment: reads each fragment's JSON
/// data island and tags the SVG for accessibility and hover lookup.
const CHART_LIB_JS: &str = r#"
document.addEventListener("DOMContentLoaded", function () {
  document.querySelectorAll("section.chart").forEach(function (section) {
    var island = section.querySelector("script.chart-data");
    if (!island) return;
    var spec = JSON.parse(island.textContent);
    section.dataset.kind = typeof spec.kind === "string" ? spec.kind : Object.keys(spec.kind)[0];
    var svg = section.querySelector("svg");
    if (svg) {
      svg.setAttribute("role", "img");
      svg.setAttribute("aria-label", section.querySelector("h2").textContent);
    }
  });
});
"#;

const STYLE: &str = "body{font-family:sans-serif;margin:2em auto;max-width:780px}\
section.chart{margin-bottom:2em}h2{font-size:1.1em}\
ul.insights li{margin:0.4em 0}p.generated{color:#666}";

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// One chart fragment. Only the first fragment of a document includes the
/// shared script block. A failed SVG render degrades to a placeholder so
/// one bad chart cannot abort the whole snapshot.
fn chart_fragment(index: usize, spec: &ChartSpec, include_lib: bool) -> Result<String> {
    let svg = render_svg(spec, FRAGMENT_WIDTH, FRAGMENT_HEIGHT).unwrap_or_else(|_| {
        "<p class=\"chart-unavailable\">Chart rendering unavailable in this \
         environment.</p>"
            .to_string()
    });
    let data_island = serde_json::to_string(spec)?;

    let mut fragment = String::new();
    if include_lib {
        fragment.push_str(&format!(
            "<script id=\"{}\">{}</script>\n",
            CHART_LIB_MARKER, CHART_LIB_JS
        ));
    }
    fragment.push_str(&format!(
        "<section class=\"chart\" id=\"chart-{}\">\n<h2>{}</h2>\n{}\n\
         <script type=\"application/json\" class=\"chart-data\">{}</script>\n</section>\n",
        index,
        escape_html(&spec.title),
        svg,
        data_island
    ));
    Ok(fragment)
}

/// Assemble the full snapshot document. Zero charts disables the export
/// rather than producing a chartless (malformed-looking) document.
pub fn html_snapshot(
    charts: &[ChartSpec],
    insights: &[InsightStatement],
    generated_at: DateTime<Utc>,
) -> Result<ExportOutcome> {
    if charts.is_empty() {
        return Ok(ExportOutcome::NoCharts);
    }

    let mut doc = String::new();
    doc.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    doc.push_str(&format!("<title>{}</title>\n", REPORT_TITLE));
    doc.push_str(&format!("<style>{}</style>\n", STYLE));
    doc.push_str("</head>\n<body>\n");
    doc.push_str(&format!("<h1>{}</h1>\n", REPORT_TITLE));
    doc.push_str(&format!(
        "<p class=\"generated\">Generated {}</p>\n",
        generated_at.format("%Y-%m-%dT%H:%M:%SZ")
    ));

    for (index, spec) in charts.iter().enumerate() {
        doc.push_str(&chart_fragment(index, spec, index == 0)?);
    }

    doc.push_str("<section class=\"insights\">\n<h2>Insights</h2>\n<ul class=\"insights\">\n");
    for insight in insights {
        doc.push_str(&format!("<li>{}</li>\n", escape_html(&insight.text)));
    }
    doc.push_str("</ul>\n</section>\n</body>\n</html>\n");

    Ok(ExportOutcome::Artifact(ExportArtifact {
        bytes: doc.into_bytes(),
        file_name: "dashboard_snapshot.html".to_string(),
        mime: "text/html",
        notice: None,
    }))
}
