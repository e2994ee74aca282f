pub mod chart_pane;
pub mod controls;
pub mod insights;
pub mod metrics;
pub mod summary;
pub mod text_input;
