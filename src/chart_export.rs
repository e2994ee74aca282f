//! Chart rendering to static form: PNG-style RGB rasterization (plotters
//! bitmap backend) and SVG fragments for the HTML snapshot.
//!
//! Rasterization depends on backend facilities (notably font loading) that
//! are absent on some systems, so it is exposed as an explicit probe
//! returning `RasterizationUnavailable` rather than an error that unwinds
//! the whole export.

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::chart::{ChartData, ChartSpec};

/// Default pixel size for rasterized charts.
pub const RASTER_WIDTH: u32 = 640;
pub const RASTER_HEIGHT: u32 = 480;

/// The optional rasterization backend failed. Callers degrade (text-only
/// PDF) instead of propagating.
#[derive(Debug)]
pub struct RasterizationUnavailable(pub String);

impl std::fmt::Display for RasterizationUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chart rasterization unavailable: {}", self.0)
    }
}

impl std::error::Error for RasterizationUnavailable {}

/// An owned RGB8 pixel buffer (row-major, 3 bytes per pixel).
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// Probe-style rasterization: one attempt, success or a caught failure.
pub fn try_rasterize(
    spec: &ChartSpec,
    width: u32,
    height: u32,
) -> Result<RasterImage, RasterizationUnavailable> {
    let mut rgb = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut rgb, (width, height)).into_drawing_area();
        draw_chart(&root, spec).map_err(RasterizationUnavailable)?;
        root.present()
            .map_err(|e| RasterizationUnavailable(e.to_string()))?;
    }
    Ok(RasterImage { width, height, rgb })
}

/// Render one chart as a standalone SVG document string.
pub fn render_svg(spec: &ChartSpec, width: u32, height: u32) -> color_eyre::Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        draw_chart(&root, spec).map_err(|e| color_eyre::eyre::eyre!("SVG render: {}", e))?;
        root.present()
            .map_err(|e| color_eyre::eyre::eyre!("SVG render: {}", e))?;
    }
    Ok(svg)
}

// Fixed palette shared by all backends.
const SERIES_COLORS: [RGBColor; 7] = [
    RGBColor(0, 119, 182),
    RGBColor(214, 40, 40),
    RGBColor(6, 167, 125),
    RGBColor(244, 162, 97),
    RGBColor(108, 92, 231),
    RGBColor(255, 183, 3),
    RGBColor(87, 117, 144),
];

fn padded_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        return (min - 1.0, max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad, max + pad)
}

/// Draw a chart spec onto any plotters drawing area. Errors are stringified
/// so the bitmap and SVG backends share one code path.
fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
) -> Result<(), String> {
    root.fill(&WHITE).map_err(|e| e.to_string())?;

    match &spec.data {
        ChartData::Points { series, lines } => draw_points(root, spec, series, *lines),
        ChartData::Bars { labels, values } => draw_bars(root, spec, labels, values),
        ChartData::Histogram { bins } => draw_histogram(root, spec, bins),
        ChartData::Treemap { tiles } => draw_treemap(root, spec, tiles),
    }
}

fn draw_points<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    series: &[crate::chart::SeriesPoints],
    lines: bool,
) -> Result<(), String> {
    let all_points: Vec<(f64, f64)> =
        series.iter().flat_map(|s| s.points.iter().copied()).collect();
    if all_points.is_empty() {
        return Ok(());
    }
    let (x_min, x_max) = padded_range(
        all_points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min),
        all_points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max),
    );
    let (y_min, y_max) = padded_range(
        all_points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min),
        all_points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max),
    );

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(|e| e.to_string())?;
    chart
        .configure_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()
        .map_err(|e| e.to_string())?;

    for (idx, s) in series.iter().enumerate() {
        if s.points.is_empty() {
            continue;
        }
        let color = SERIES_COLORS[idx % SERIES_COLORS.len()];
        if lines {
            chart
                .draw_series(LineSeries::new(s.points.iter().copied(), color))
                .map_err(|e| e.to_string())?;
            chart
                .draw_series(s.points.iter().map(|&p| Circle::new(p, 3, color.filled())))
                .map_err(|e| e.to_string())?;
        } else {
            let radii = point_radii(s.weights.as_deref(), s.points.len());
            chart
                .draw_series(
                    s.points
                        .iter()
                        .zip(radii)
                        .map(|(&p, r)| Circle::new(p, r, color.mix(0.7).filled())),
                )
                .map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

/// Bubble radii from weights: absolute weight scaled into 2..=10 px.
fn point_radii(weights: Option<&[f64]>, n: usize) -> Vec<i32> {
    match weights {
        None => vec![3; n],
        Some(ws) => {
            let abs: Vec<f64> = ws.iter().map(|w| w.abs()).collect();
            let min = abs.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = abs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            abs.iter()
                .map(|&w| {
                    if max > min {
                        (2.0 + 8.0 * (w - min) / (max - min)).round() as i32
                    } else {
                        4
                    }
                })
                .collect()
        }
    }
}

fn draw_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    labels: &[String],
    values: &[f64],
) -> Result<(), String> {
    if values.is_empty() {
        return Ok(());
    }
    let v_min = values.iter().cloned().fold(f64::INFINITY, f64::min).min(0.0);
    let v_max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max).max(0.0);
    let (y_min, y_max) = padded_range(v_min, v_max);

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..labels.len() as f64, y_min..y_max)
        .map_err(|e| e.to_string())?;
    chart
        .configure_mesh()
        .x_labels(labels.len().min(12))
        .x_label_formatter(&|x| labels.get(x.floor() as usize).cloned().unwrap_or_default())
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()
        .map_err(|e| e.to_string())?;

    let color = SERIES_COLORS[0];
    chart
        .draw_series(values.iter().enumerate().map(|(i, &v)| {
            let x0 = i as f64 + 0.1;
            let x1 = i as f64 + 0.9;
            Rectangle::new([(x0, 0.0), (x1, v)], color.filled())
        }))
        .map_err(|e| e.to_string())?;
    Ok(())
}

fn draw_histogram<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    bins: &[crate::chart::HistogramBin],
) -> Result<(), String> {
    if bins.is_empty() {
        return Ok(());
    }
    let x_min = bins.first().map(|b| b.lower).unwrap_or(0.0);
    let x_max = bins.last().map(|b| b.upper).unwrap_or(1.0);
    let (x_min, x_max) = if x_min == x_max {
        (x_min - 0.5, x_max + 0.5)
    } else {
        (x_min, x_max)
    };
    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(1) as f64;

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, 0.0..max_count * 1.05)
        .map_err(|e| e.to_string())?;
    chart
        .configure_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()
        .map_err(|e| e.to_string())?;

    let color = SERIES_COLORS[0];
    chart
        .draw_series(
            bins.iter().map(|b| {
                Rectangle::new([(b.lower, 0.0), (b.upper, b.count as f64)], color.filled())
            }),
        )
        .map_err(|e| e.to_string())?;
    Ok(())
}

fn draw_treemap<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    tiles: &[crate::chart::TreemapTile],
) -> Result<(), String> {
    if tiles.is_empty() {
        return Ok(());
    }
    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 18))
        .margin(10)
        .build_cartesian_2d(0.0..1.0, 0.0..1.0)
        .map_err(|e| e.to_string())?;

    for (idx, tile) in tiles.iter().enumerate() {
        let color = SERIES_COLORS[idx % SERIES_COLORS.len()];
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(tile.x0, tile.y0), (tile.x1, tile.y1)],
                color.mix(0.85).filled(),
            )))
            .map_err(|e| e.to_string())?;
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(tile.x0, tile.y0), (tile.x1, tile.y1)],
                WHITE.stroke_width(2),
            )))
            .map_err(|e| e.to_string())?;
        let cx = (tile.x0 + tile.x1) / 2.0;
        let cy = (tile.y0 + tile.y1) / 2.0;
        chart
            .draw_series(std::iter::once(Text::new(
                tile.label.clone(),
                (cx, cy),
                ("sans-serif", 14).into_font().color(&BLACK),
            )))
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartData, ChartKind, SeriesPoints};

    fn scatter_spec() -> ChartSpec {
        ChartSpec {
            kind: ChartKind::SalesVsProfit,
            title: "Sales vs Profit".to_string(),
            x_label: "Sales".to_string(),
            y_label: "Profit".to_string(),
            data: ChartData::Points {
                series: vec![SeriesPoints {
                    name: "records".to_string(),
                    points: vec![(1.0, 2.0), (2.0, 1.0), (3.0, 4.0)],
                    weights: None,
                }],
                lines: false,
            },
        }
    }

    #[test]
    fn svg_render_produces_document_when_backend_available() {
        // Text layout needs a system font; environments without one report
        // the failure instead of panicking.
        match render_svg(&scatter_spec(), 320, 240) {
            Ok(svg) => {
                assert!(svg.contains("<svg"));
                assert!(svg.contains("</svg>"));
                assert!(svg.contains("circle"));
            }
            Err(e) => {
                assert!(!e.to_string().is_empty());
            }
        }
    }

    #[test]
    fn point_radii_scale_with_weights() {
        let radii = point_radii(Some(&[1.0, 5.0, 10.0]), 3);
        assert_eq!(radii.len(), 3);
        assert!(radii[0] < radii[2]);
        assert_eq!(radii[0], 2);
        assert_eq!(radii[2], 10);
    }

    #[test]
    fn point_radii_uniform_without_weights() {
        assert_eq!(point_radii(None, 2), vec![3, 3]);
    }

    #[test]
    fn point_radii_equal_weights() {
        assert_eq!(point_radii(Some(&[2.0, 2.0]), 2), vec![4, 4]);
    }
}
