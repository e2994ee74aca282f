//! Export modal state: a format radio list.

use crate::export::ExportFormat;

#[derive(Default)]
pub struct ExportModal {
    pub active: bool,
    pub selected: usize,
}

impl ExportModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) {
        self.active = true;
        self.selected = 0;
    }

    pub fn close(&mut self) {
        self.active = false;
    }

    pub fn next(&mut self) {
        self.selected = (self.selected + 1) % ExportFormat::ALL.len();
    }

    pub fn prev(&mut self) {
        self.selected = if self.selected == 0 {
            ExportFormat::ALL.len() - 1
        } else {
            self.selected - 1
        };
    }

    pub fn format(&self) -> ExportFormat {
        ExportFormat::ALL[self.selected]
    }
}
