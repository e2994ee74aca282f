//! In-terminal chart pane. Point charts render through the ratatui Chart
//! widget; bar-shaped data (bars, histogram, treemap) renders as labeled
//! text bars, which stay readable at terminal resolutions.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style, Stylize},
    symbols,
    text::Line,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Widget},
};

use crate::chart::{ChartData, ChartSpec};

pub struct ChartPane<'a> {
    spec: Option<&'a ChartSpec>,
    position: (usize, usize),
}

impl<'a> ChartPane<'a> {
    pub fn new(spec: Option<&'a ChartSpec>, index: usize, total: usize) -> Self {
        Self {
            spec,
            position: (index, total),
        }
    }

    fn title(&self) -> String {
        match self.spec {
            Some(spec) => format!(
                "{} [{}/{}]",
                spec.title,
                self.position.0 + 1,
                self.position.1
            ),
            None => "Charts".to_string(),
        }
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if min == max {
        return (min - 1.0, max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad, max + pad)
}

fn axis_labels(min: f64, max: f64) -> Vec<Line<'static>> {
    let mid = (min + max) / 2.0;
    [min, mid, max]
        .iter()
        .map(|v| Line::from(format!("{:.1}", v)))
        .collect()
}

fn render_points(spec: &ChartSpec, block: Block, area: Rect, buf: &mut Buffer) {
    let ChartData::Points { series, lines } = &spec.data else {
        return;
    };
    let (x_min, x_max) = bounds(series.iter().flat_map(|s| s.points.iter().map(|p| p.0)));
    let (y_min, y_max) = bounds(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));

    let graph_type = if *lines {
        GraphType::Line
    } else {
        GraphType::Scatter
    };
    let colors = [Color::Cyan, Color::Magenta, Color::Green, Color::Yellow];
    let datasets: Vec<Dataset> = series
        .iter()
        .enumerate()
        .map(|(i, s)| {
            Dataset::default()
                .name(s.name.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(graph_type)
                .style(Style::default().fg(colors[i % colors.len()]))
                .data(&s.points)
        })
        .collect();

    Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title(spec.x_label.clone())
                .bounds([x_min, x_max])
                .labels(axis_labels(x_min, x_max)),
        )
        .y_axis(
            Axis::default()
                .title(spec.y_label.clone())
                .bounds([y_min, y_max])
                .labels(axis_labels(y_min, y_max)),
        )
        .render(area, buf);
}

/// Proportional text bar rows: `label ████▌ value`.
fn render_text_bars(labels: &[String], values: &[f64], block: Block, area: Rect, buf: &mut Buffer) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let label_width = labels.iter().map(|l| l.len()).max().unwrap_or(0).min(16);
    let value_width = 10usize;
    let bar_width = inner_width.saturating_sub(label_width + value_width + 3).max(4);
    let max_abs = values.iter().map(|v| v.abs()).fold(0.0_f64, f64::max);

    let rows: Vec<Line> = labels
        .iter()
        .zip(values.iter())
        .map(|(label, &value)| {
            let filled = if max_abs > 0.0 {
                ((value.abs() / max_abs) * bar_width as f64).round() as usize
            } else {
                0
            };
            let bar: String = "█".repeat(filled);
            let color = if value < 0.0 { Color::Red } else { Color::Cyan };
            Line::from(vec![
                format!("{:<width$.width$} ", label, width = label_width).into(),
                ratatui::text::Span::styled(bar, Style::default().fg(color)),
                format!(" {:.1}", value).into(),
            ])
        })
        .collect();

    Paragraph::new(rows).block(block).render(area, buf);
}

impl Widget for &ChartPane<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title())
            .title_style(Style::default().bold());

        let Some(spec) = self.spec else {
            Paragraph::new("No charts available for the current columns.")
                .style(Style::default().fg(Color::DarkGray))
                .block(block)
                .render(area, buf);
            return;
        };

        match &spec.data {
            ChartData::Points { .. } => render_points(spec, block, area, buf),
            ChartData::Bars { labels, values } => {
                render_text_bars(labels, values, block, area, buf)
            }
            ChartData::Histogram { bins } => {
                let labels: Vec<String> = bins
                    .iter()
                    .map(|b| format!("{:.0}-{:.0}", b.lower, b.upper))
                    .collect();
                let values: Vec<f64> = bins.iter().map(|b| b.count as f64).collect();
                render_text_bars(&labels, &values, block, area, buf)
            }
            ChartData::Treemap { tiles } => {
                let labels: Vec<String> = tiles.iter().map(|t| t.label.clone()).collect();
                let values: Vec<f64> = tiles.iter().map(|t| t.value).collect();
                render_text_bars(&labels, &values, block, area, buf)
            }
        }
    }
}
