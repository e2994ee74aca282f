//! Insights list panel.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, List, ListItem, Widget},
};

use crate::insight::InsightStatement;

pub struct InsightsPanel<'a> {
    insights: &'a [InsightStatement],
}

impl<'a> InsightsPanel<'a> {
    pub fn new(insights: &'a [InsightStatement]) -> Self {
        Self { insights }
    }
}

impl Widget for &InsightsPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let items: Vec<ListItem> = if self.insights.is_empty() {
            vec![ListItem::new("No insights for the current selection.")
                .style(Style::default().fg(Color::DarkGray))]
        } else {
            self.insights
                .iter()
                .map(|i| ListItem::new(format!("• {}", i.text)))
                .collect()
        };

        List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Insights"))
            .render(area, buf);
    }
}
