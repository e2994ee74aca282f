//! Headline metrics strip: row count and Sales/Profit/Quantity totals.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Style, Stylize},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::aggregate::MetricTotals;

pub struct MetricsStrip<'a> {
    totals: &'a MetricTotals,
}

impl<'a> MetricsStrip<'a> {
    pub fn new(totals: &'a MetricTotals) -> Self {
        Self { totals }
    }
}

fn metric_cell(title: &str, value: String) -> Paragraph<'static> {
    Paragraph::new(value)
        .centered()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string()),
        )
        .style(Style::default().bold())
}

fn format_total(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "n/a".to_string(),
    }
}

impl Widget for &MetricsStrip<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let layout = Layout::new(
            Direction::Horizontal,
            [
                Constraint::Ratio(1, 4),
                Constraint::Ratio(1, 4),
                Constraint::Ratio(1, 4),
                Constraint::Ratio(1, 4),
            ],
        )
        .split(area);

        metric_cell("Rows", format!("{}", self.totals.rows)).render(layout[0], buf);
        metric_cell("Total Sales", format_total(self.totals.sales)).render(layout[1], buf);
        metric_cell("Total Profit", format_total(self.totals.profit)).render(layout[2], buf);
        let quantity = match self.totals.quantity {
            Some(q) => format!("{}", q as i64),
            None => "n/a".to_string(),
        };
        metric_cell("Total Quantity", quantity).render(layout[3], buf);
    }
}
