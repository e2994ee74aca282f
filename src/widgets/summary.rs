//! Statistical summary table (describe-style, numeric columns only).

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Style, Stylize},
    widgets::{Block, Borders, Cell, Row, Table, Widget},
};

use crate::stats::ColumnSummary;

pub struct SummaryTable<'a> {
    summaries: &'a [ColumnSummary],
}

impl<'a> SummaryTable<'a> {
    pub fn new(summaries: &'a [ColumnSummary]) -> Self {
        Self { summaries }
    }
}

fn fmt(v: f64) -> String {
    if v.is_nan() {
        "-".to_string()
    } else if v.abs() >= 1000.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

impl Widget for &SummaryTable<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let header = Row::new(
            ["column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"]
                .into_iter()
                .map(Cell::from),
        )
        .style(Style::default().bold());

        let rows = self.summaries.iter().map(|s| {
            Row::new(vec![
                Cell::from(s.name.clone()),
                Cell::from(format!("{}", s.count)),
                Cell::from(fmt(s.mean)),
                Cell::from(fmt(s.std)),
                Cell::from(fmt(s.min)),
                Cell::from(fmt(s.q25)),
                Cell::from(fmt(s.median)),
                Cell::from(fmt(s.q75)),
                Cell::from(fmt(s.max)),
            ])
        });

        let widths = [
            Constraint::Length(10),
            Constraint::Length(7),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(9),
        ];

        Table::new(rows, widths)
            .header(header)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Statistical Summary"),
            )
            .render(area, buf);
    }
}
