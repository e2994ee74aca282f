use chrono::Utc;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::path::{Path, PathBuf};

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

pub mod aggregate;
pub mod caps;
pub mod chart;
pub mod chart_export;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error_display;
pub mod export;
pub mod export_modal;
pub mod filter;
pub mod filter_modal;
pub mod html_export;
pub mod insight;
pub mod pdf_export;
pub mod stats;
pub mod widgets;

pub use cli::Args;
pub use config::{AppConfig, ConfigManager};
pub use dataset::{Dataset, LoadError, LoadOptions};
pub use export::ExportFormat;
pub use filter::FilterParams;

use aggregate::{metric_totals, MetricTotals};
use caps::ColumnCaps;
use chart::{build_charts, ChartSpec};
use export::ExportOutcome;
use export_modal::ExportModal;
use filter::{apply_filters, product_values, FilteredView};
use filter_modal::{FilterFocus, FilterModal};
use insight::{generate_insights, InsightStatement};
use stats::{describe, ColumnSummary};
use widgets::chart_pane::ChartPane;
use widgets::controls::Controls;
use widgets::insights::InsightsPanel;
use widgets::metrics::MetricsStrip;
use widgets::summary::SummaryTable;
use widgets::text_input::TextInputEvent;

/// Application name used for the config directory and other app paths.
pub const APP_NAME: &str = "edash";

pub enum AppEvent {
    Open(PathBuf, LoadOptions),
    Key(KeyEvent),
    Resize(u16, u16),
    Export(ExportFormat),
    Exit,
    Crash(String),
}

/// The whole derived dashboard for one filter selection. Rebuilt as a value
/// on every interaction; the source frame inside `dataset` is never
/// mutated.
pub struct Dashboard {
    pub dataset: Dataset,
    pub caps: ColumnCaps,
    pub filter: FilterParams,
    pub view: FilteredView,
    pub totals: MetricTotals,
    pub summary: Vec<ColumnSummary>,
    pub insights: Vec<InsightStatement>,
    pub charts: Vec<ChartSpec>,
    pub chart_index: usize,
    histogram_bins: usize,
}

impl Dashboard {
    pub fn new(dataset: Dataset, histogram_bins: usize) -> Result<Self> {
        Self::build(dataset, FilterParams::default(), histogram_bins)
    }

    /// One full recomputation pass: filter, totals, summary, insights,
    /// charts.
    pub fn build(dataset: Dataset, filter: FilterParams, histogram_bins: usize) -> Result<Self> {
        let caps = ColumnCaps::from_frame(&dataset.frame);
        let view = apply_filters(&dataset.frame, &caps, &filter)?;
        let totals = metric_totals(&view, &caps)?;
        let summary = describe(&view.frame)?;
        let insights = generate_insights(&view, &caps)?;
        let charts = build_charts(&view, &caps, histogram_bins)?;

        Ok(Self {
            dataset,
            caps,
            filter,
            view,
            totals,
            summary,
            insights,
            charts,
            chart_index: 0,
            histogram_bins,
        })
    }

    /// Derive a new dashboard from the same source with different filters.
    pub fn refilter(&self, filter: FilterParams) -> Result<Self> {
        Self::build(self.dataset.clone(), filter, self.histogram_bins)
    }

    pub fn current_chart(&self) -> Option<&ChartSpec> {
        self.charts.get(self.chart_index)
    }

    pub fn next_chart(&mut self) {
        if !self.charts.is_empty() {
            self.chart_index = (self.chart_index + 1) % self.charts.len();
        }
    }

    pub fn prev_chart(&mut self) {
        if !self.charts.is_empty() {
            self.chart_index = if self.chart_index == 0 {
                self.charts.len() - 1
            } else {
                self.chart_index - 1
            };
        }
    }

    /// Product names from the unfiltered source, for the filter panel.
    pub fn product_names(&self) -> Result<Vec<String>> {
        product_values(&self.dataset.frame, &self.caps)
    }
}

/// Result of one headless export request.
pub struct ExportReport {
    pub format: ExportFormat,
    /// None when the export was disabled (no charts to render).
    pub path: Option<PathBuf>,
    pub notice: Option<String>,
}

/// Run a set of exports against a dashboard, writing artifacts into
/// `out_dir`. Used by the `--export` CLI path and exercised directly by
/// the integration tests.
pub fn headless_export(
    dashboard: &Dashboard,
    formats: &[ExportFormat],
    out_dir: &Path,
) -> Result<Vec<ExportReport>> {
    let mut reports = Vec::with_capacity(formats.len());
    for &format in formats {
        let outcome = match format {
            ExportFormat::Csv => ExportOutcome::Artifact(export::csv_artifact(&dashboard.view)?),
            ExportFormat::Dataset => {
                ExportOutcome::Artifact(export::dataset_artifact(&dashboard.dataset)?)
            }
            ExportFormat::Html => {
                export::html_artifact(&dashboard.charts, &dashboard.insights, Utc::now())?
            }
            ExportFormat::Pdf => {
                export::pdf_artifact(&dashboard.charts, &dashboard.insights, Utc::now())?
            }
        };
        let report = match outcome {
            ExportOutcome::Artifact(artifact) => {
                let path = export::write_artifact(out_dir, &artifact)?;
                ExportReport {
                    format,
                    path: Some(path),
                    notice: artifact.notice,
                }
            }
            ExportOutcome::NoCharts => ExportReport {
                format,
                path: None,
                notice: Some("no charts available; export disabled".to_string()),
            },
        };
        reports.push(report);
    }
    Ok(reports)
}

pub struct App {
    config: AppConfig,
    out_dir: PathBuf,
    dashboard: Option<Dashboard>,
    filter_modal: FilterModal,
    export_modal: ExportModal,
    status: Option<String>,
    show_summary: bool,
}

impl App {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let out_dir = config
            .export
            .out_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            config,
            out_dir,
            dashboard: None,
            filter_modal: FilterModal::new(),
            export_modal: ExportModal::new(),
            status: None,
            show_summary: true,
        }
    }

    pub fn set_out_dir(&mut self, out_dir: PathBuf) {
        self.out_dir = out_dir;
    }

    pub fn dashboard(&self) -> Option<&Dashboard> {
        self.dashboard.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Handle one event; optionally emits a follow-up event for the main
    /// loop to enqueue.
    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        match event {
            AppEvent::Open(path, options) => {
                self.load(path, options);
                None
            }
            AppEvent::Key(key) => self.handle_key(*key),
            AppEvent::Export(format) => {
                self.run_export(*format);
                None
            }
            AppEvent::Resize(_, _) => None,
            AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn load(&mut self, path: &Path, options: &LoadOptions) {
        let bins = self.config.charts.histogram_bins;
        match Dataset::load(path, options).and_then(|dataset| Dashboard::new(dataset, bins)) {
            Ok(dashboard) => {
                self.status = Some(format!(
                    "Loaded {} ({} rows)",
                    path.display(),
                    dashboard.dataset.frame.height()
                ));
                self.dashboard = Some(dashboard);
            }
            Err(report) => {
                self.dashboard = None;
                self.status = Some(error_display::user_message_from_report(&report, None));
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<AppEvent> {
        if self.filter_modal.active {
            return self.filter_modal_key(key);
        }
        if self.export_modal.active {
            return self.export_modal_key(key);
        }

        match key.code {
            KeyCode::Char('q') => Some(AppEvent::Exit),
            KeyCode::Char('f') => {
                self.open_filter_modal();
                None
            }
            KeyCode::Char('e') => {
                if self.dashboard.is_some() {
                    self.export_modal.open();
                }
                None
            }
            KeyCode::Char('s') => {
                self.show_summary = !self.show_summary;
                None
            }
            KeyCode::Char('R') => {
                self.apply_filter_params(FilterParams::default());
                None
            }
            KeyCode::Left => {
                if let Some(dashboard) = &mut self.dashboard {
                    dashboard.prev_chart();
                }
                None
            }
            KeyCode::Right => {
                if let Some(dashboard) = &mut self.dashboard {
                    dashboard.next_chart();
                }
                None
            }
            _ => None,
        }
    }

    fn open_filter_modal(&mut self) {
        let Some(dashboard) = &self.dashboard else {
            return;
        };
        let panel = dashboard.product_names().and_then(|names| {
            let bounds = filter::date_bounds(&dashboard.dataset.frame, &dashboard.caps)?;
            Ok((names, bounds))
        });
        match panel {
            Ok((names, bounds)) => self.filter_modal.open(&dashboard.filter, &names, bounds),
            Err(report) => {
                self.status = Some(error_display::user_message_from_report(&report, None));
            }
        }
    }

    fn filter_modal_key(&mut self, key: KeyEvent) -> Option<AppEvent> {
        match key.code {
            KeyCode::Esc => {
                self.filter_modal.close();
                return None;
            }
            KeyCode::Tab => {
                self.filter_modal.next_focus();
                return None;
            }
            KeyCode::BackTab => {
                self.filter_modal.prev_focus();
                return None;
            }
            _ => {}
        }

        match self.filter_modal.focus {
            FilterFocus::DateStart | FilterFocus::DateEnd => {
                let input = if self.filter_modal.focus == FilterFocus::DateStart {
                    &mut self.filter_modal.date_start
                } else {
                    &mut self.filter_modal.date_end
                };
                match input.input(key) {
                    TextInputEvent::Submit => self.confirm_filter_modal(),
                    TextInputEvent::Cancel => self.filter_modal.close(),
                    TextInputEvent::None => {}
                }
            }
            FilterFocus::Products => match key.code {
                KeyCode::Up => self.filter_modal.cursor_up(),
                KeyCode::Down => self.filter_modal.cursor_down(),
                KeyCode::Char(' ') => self.filter_modal.toggle_current(),
                KeyCode::Char('a') => self.filter_modal.select_all(true),
                KeyCode::Char('n') => self.filter_modal.select_all(false),
                KeyCode::Enter => self.confirm_filter_modal(),
                _ => {}
            },
            FilterFocus::Apply => {
                if key.code == KeyCode::Enter {
                    self.confirm_filter_modal();
                }
            }
            FilterFocus::Clear => {
                if key.code == KeyCode::Enter {
                    self.filter_modal.date_start.clear();
                    self.filter_modal.date_end.clear();
                    self.filter_modal.select_all(true);
                    self.filter_modal.error = None;
                }
            }
        }
        None
    }

    fn confirm_filter_modal(&mut self) {
        match self.filter_modal.to_params() {
            Ok(params) => {
                self.filter_modal.close();
                self.apply_filter_params(params);
            }
            Err(message) => {
                self.filter_modal.error = Some(message);
            }
        }
    }

    pub fn apply_filter_params(&mut self, params: FilterParams) {
        let Some(dashboard) = &self.dashboard else {
            return;
        };
        match dashboard.refilter(params) {
            Ok(rebuilt) => {
                self.status = Some(format!("{} rows match", rebuilt.view.height()));
                self.dashboard = Some(rebuilt);
            }
            Err(report) => {
                self.status = Some(error_display::user_message_from_report(&report, None));
            }
        }
    }

    fn export_modal_key(&mut self, key: KeyEvent) -> Option<AppEvent> {
        match key.code {
            KeyCode::Esc => {
                self.export_modal.close();
                None
            }
            KeyCode::Up => {
                self.export_modal.prev();
                None
            }
            KeyCode::Down => {
                self.export_modal.next();
                None
            }
            KeyCode::Enter => {
                let format = self.export_modal.format();
                self.export_modal.close();
                Some(AppEvent::Export(format))
            }
            _ => None,
        }
    }

    fn run_export(&mut self, format: ExportFormat) {
        let Some(dashboard) = &self.dashboard else {
            return;
        };
        match headless_export(dashboard, &[format], &self.out_dir) {
            Ok(reports) => {
                let report = &reports[0];
                self.status = Some(match (&report.path, &report.notice) {
                    (Some(path), Some(notice)) => {
                        format!("Exported {} ({})", path.display(), notice)
                    }
                    (Some(path), None) => format!("Exported {}", path.display()),
                    (None, _) => format!("{} export disabled: no charts", format.as_str()),
                });
            }
            Err(report) => {
                self.status = Some(format!(
                    "Export failed: {}",
                    error_display::user_message_from_report(&report, None)
                ));
            }
        }
    }

}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // metrics
                Constraint::Fill(1),   // main
                Constraint::Length(1), // status
                Constraint::Length(1), // controls
            ])
            .split(area);

        let metrics_area = layout[0];
        let mut main_area = layout[1];
        let status_area = layout[2];
        let controls_area = layout[3];

        // Side panels shrink the main area instead of overlaying it.
        let mut panel_area = Rect::default();
        if self.filter_modal.active {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(0), Constraint::Length(46)])
                .split(main_area);
            main_area = chunks[0];
            panel_area = chunks[1];
        } else if self.export_modal.active {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(0), Constraint::Length(30)])
                .split(main_area);
            main_area = chunks[0];
            panel_area = chunks[1];
        }

        match &self.dashboard {
            Some(dashboard) => {
                MetricsStrip::new(&dashboard.totals).render(metrics_area, buf);
                render_dashboard(dashboard, self.show_summary, main_area, buf);
            }
            None => {
                let message = self
                    .status
                    .clone()
                    .unwrap_or_else(|| "Loading...".to_string());
                Paragraph::new(message)
                    .style(Style::default().fg(Color::Red))
                    .block(Block::default().borders(Borders::ALL))
                    .render(main_area, buf);
            }
        }

        if self.filter_modal.active {
            render_filter_panel(&self.filter_modal, panel_area, buf);
        } else if self.export_modal.active {
            render_export_panel(&self.export_modal, panel_area, buf);
        }

        if let Some(status) = &self.status {
            Paragraph::new(status.as_str())
                .style(Style::default().fg(Color::Yellow))
                .render(status_area, buf);
        }

        let controls = Controls::new()
            .with_row_count(
                self.dashboard
                    .as_ref()
                    .map(|d| d.view.height())
                    .unwrap_or(0),
            )
            .with_filter_active(
                self.dashboard
                    .as_ref()
                    .is_some_and(|d| d.filter.is_active()),
            );
        (&controls).render(controls_area, buf);
    }
}

fn render_dashboard(dashboard: &Dashboard, show_summary: bool, area: Rect, buf: &mut Buffer) {
    let summary_height = if show_summary && !dashboard.summary.is_empty() {
        (dashboard.summary.len() as u16 + 3).min(10)
    } else {
        0
    };
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(summary_height)])
        .split(area);

    let upper = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Fill(3), Constraint::Fill(2)])
        .split(vertical[0]);

    let pane = ChartPane::new(
        dashboard.current_chart(),
        dashboard.chart_index,
        dashboard.charts.len(),
    );
    (&pane).render(upper[0], buf);

    let insights = InsightsPanel::new(&dashboard.insights);
    (&insights).render(upper[1], buf);

    if summary_height > 0 {
        let summary = SummaryTable::new(&dashboard.summary);
        (&summary).render(vertical[1], buf);
    }
}

fn render_filter_panel(modal: &FilterModal, area: Rect, buf: &mut Buffer) {
    let block = Block::default().borders(Borders::ALL).title("Filters");
    let inner = block.inner(area);
    block.render(area, buf);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // start label
            Constraint::Length(1), // start input
            Constraint::Length(1), // end label
            Constraint::Length(1), // end input
            Constraint::Length(1), // products label
            Constraint::Fill(1),   // product list
            Constraint::Length(1), // buttons
            Constraint::Length(1), // error
        ])
        .split(inner);

    let label_style = |focused: bool| {
        if focused {
            Style::default().fg(Color::Cyan).bold()
        } else {
            Style::default().fg(Color::Gray)
        }
    };

    Paragraph::new("Date from (YYYY-MM-DD)")
        .style(label_style(modal.focus == FilterFocus::DateStart))
        .render(layout[0], buf);
    (&modal.date_start).render(layout[1], buf);
    Paragraph::new("Date to (YYYY-MM-DD)")
        .style(label_style(modal.focus == FilterFocus::DateEnd))
        .render(layout[2], buf);
    (&modal.date_end).render(layout[3], buf);

    Paragraph::new("Products (space toggle, a all, n none)")
        .style(label_style(modal.focus == FilterFocus::Products))
        .render(layout[4], buf);

    let items: Vec<ListItem> = modal
        .products
        .iter()
        .enumerate()
        .map(|(i, choice)| {
            let marker = if choice.selected { "[x]" } else { "[ ]" };
            let mut item = ListItem::new(format!("{} {}", marker, choice.name));
            if modal.focus == FilterFocus::Products && i == modal.cursor {
                item = item.style(Style::default().bg(Color::DarkGray));
            }
            item
        })
        .collect();
    Widget::render(List::new(items), layout[5], buf);

    let button = |label: &str, focused: bool| {
        if focused {
            format!("[{}]", label.to_uppercase())
        } else {
            format!("[{}]", label)
        }
    };
    Paragraph::new(Line::from(format!(
        "{}  {}",
        button("apply", modal.focus == FilterFocus::Apply),
        button("clear", modal.focus == FilterFocus::Clear)
    )))
    .render(layout[6], buf);

    if let Some(error) = &modal.error {
        Paragraph::new(error.as_str())
            .style(Style::default().fg(Color::Red))
            .render(layout[7], buf);
    }
}

fn render_export_panel(modal: &ExportModal, area: Rect, buf: &mut Buffer) {
    let block = Block::default().borders(Borders::ALL).title("Export");
    let inner = block.inner(area);
    block.render(area, buf);

    let items: Vec<ListItem> = ExportFormat::ALL
        .iter()
        .enumerate()
        .map(|(i, format)| {
            let marker = if i == modal.selected { "(•)" } else { "( )" };
            let mut item = ListItem::new(format!("{} {}", marker, format.as_str()));
            if i == modal.selected {
                item = item.style(Style::default().bold());
            }
            item
        })
        .collect();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(1)])
        .split(inner);

    Widget::render(List::new(items), layout[0], buf);
    Paragraph::new("Enter export · Esc close")
        .style(Style::default().fg(Color::Gray))
        .render(layout[1], buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn dashboard() -> Dashboard {
        let frame = df!(
            "Product" => &["A", "B", "A"],
            "Category" => &["X", "Y", "X"],
            "Sales" => &[100.0_f64, 200.0, 300.0],
            "Profit" => &[40.0_f64, -10.0, 25.0],
            "Quantity" => &[2_i64, 1, 3]
        )
        .unwrap();
        let dataset = Dataset {
            frame,
            path: PathBuf::from("sales.csv"),
            mime: "text/csv",
        };
        Dashboard::new(dataset, 10).unwrap()
    }

    #[test]
    fn dashboard_builds_all_derived_state() {
        let dashboard = dashboard();
        assert_eq!(dashboard.view.height(), 3);
        assert_eq!(dashboard.totals.sales, Some(600.0));
        assert!(!dashboard.insights.is_empty());
        assert!(!dashboard.charts.is_empty());
        assert!(!dashboard.summary.is_empty());
    }

    #[test]
    fn refilter_rebuilds_from_source() {
        let dashboard = dashboard();
        let filtered = dashboard
            .refilter(FilterParams {
                products: Some(vec!["A".to_string()]),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(filtered.view.height(), 2);
        // Original source remains intact for the next refilter.
        let restored = filtered.refilter(FilterParams::default()).unwrap();
        assert_eq!(restored.view.height(), 3);
    }

    #[test]
    fn chart_cycling_wraps() {
        let mut dashboard = dashboard();
        let n = dashboard.charts.len();
        for _ in 0..n {
            dashboard.next_chart();
        }
        assert_eq!(dashboard.chart_index, 0);
        dashboard.prev_chart();
        assert_eq!(dashboard.chart_index, n - 1);
    }

    #[test]
    fn app_surfaces_load_failure_as_status() {
        let mut app = App::new();
        app.event(&AppEvent::Open(
            PathBuf::from("/definitely/missing.xlsx"),
            LoadOptions::new(),
        ));
        assert!(app.dashboard().is_none());
        let status = app.status().unwrap();
        assert!(status.contains("Dataset not found"), "got: {}", status);
    }

    #[test]
    fn export_key_flow_emits_export_event() {
        let mut app = App::new();
        app.dashboard = Some(dashboard());

        let press = |app: &mut App, code: KeyCode| {
            app.event(&AppEvent::Key(KeyEvent::new(
                code,
                crossterm::event::KeyModifiers::NONE,
            )))
        };

        assert!(press(&mut app, KeyCode::Char('e')).is_none());
        assert!(app.export_modal.active);
        press(&mut app, KeyCode::Down); // Html
        let followup = press(&mut app, KeyCode::Enter);
        assert!(matches!(followup, Some(AppEvent::Export(ExportFormat::Html))));
        assert!(!app.export_modal.active);
    }

    #[test]
    fn quit_key_requests_exit() {
        let mut app = App::new();
        let followup = app.event(&AppEvent::Key(KeyEvent::new(
            KeyCode::Char('q'),
            crossterm::event::KeyModifiers::NONE,
        )));
        assert!(matches!(followup, Some(AppEvent::Exit)));
    }
}
