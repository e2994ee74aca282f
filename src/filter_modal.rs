//! Filter panel state and focus management: date bounds plus a product
//! toggle list.

use chrono::NaiveDate;

use crate::filter::FilterParams;
use crate::widgets::text_input::TextInput;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FilterFocus {
    #[default]
    DateStart,
    DateEnd,
    Products,
    Apply,
    Clear,
}

impl FilterFocus {
    pub fn next(self) -> Self {
        match self {
            Self::DateStart => Self::DateEnd,
            Self::DateEnd => Self::Products,
            Self::Products => Self::Apply,
            Self::Apply => Self::Clear,
            Self::Clear => Self::DateStart,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::DateStart => Self::Clear,
            Self::DateEnd => Self::DateStart,
            Self::Products => Self::DateEnd,
            Self::Apply => Self::Products,
            Self::Clear => Self::Apply,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductChoice {
    pub name: String,
    pub selected: bool,
}

#[derive(Default)]
pub struct FilterModal {
    pub active: bool,
    pub focus: FilterFocus,
    pub date_start: TextInput,
    pub date_end: TextInput,
    pub products: Vec<ProductChoice>,
    pub cursor: usize,
    pub error: Option<String>,
}

impl FilterModal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open with the current params prefilled. Product rows come from the
    /// full (unfiltered) dataset; an inactive product filter shows all
    /// products selected. Unset date bounds default to the data's own
    /// min/max when known.
    pub fn open(
        &mut self,
        params: &FilterParams,
        product_names: &[String],
        date_bounds: Option<(NaiveDate, NaiveDate)>,
    ) {
        self.active = true;
        self.focus = FilterFocus::DateStart;
        self.cursor = 0;
        self.error = None;

        let fmt = |d: NaiveDate| d.format("%Y-%m-%d").to_string();
        self.date_start.set_value(
            params
                .date_start
                .or(date_bounds.map(|(min, _)| min))
                .map(fmt)
                .unwrap_or_default(),
        );
        self.date_end.set_value(
            params
                .date_end
                .or(date_bounds.map(|(_, max)| max))
                .map(fmt)
                .unwrap_or_default(),
        );

        self.products = product_names
            .iter()
            .map(|name| ProductChoice {
                name: name.clone(),
                selected: match &params.products {
                    None => true,
                    Some(selected) => selected.contains(name),
                },
            })
            .collect();
        self.sync_focus();
    }

    pub fn close(&mut self) {
        self.active = false;
        self.error = None;
    }

    pub fn next_focus(&mut self) {
        self.focus = self.focus.next();
        self.sync_focus();
    }

    pub fn prev_focus(&mut self) {
        self.focus = self.focus.prev();
        self.sync_focus();
    }

    fn sync_focus(&mut self) {
        self.date_start
            .set_focused(self.focus == FilterFocus::DateStart);
        self.date_end.set_focused(self.focus == FilterFocus::DateEnd);
    }

    pub fn cursor_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn cursor_down(&mut self) {
        if self.cursor + 1 < self.products.len() {
            self.cursor += 1;
        }
    }

    pub fn toggle_current(&mut self) {
        if let Some(choice) = self.products.get_mut(self.cursor) {
            choice.selected = !choice.selected;
        }
    }

    pub fn select_all(&mut self, selected: bool) {
        for choice in &mut self.products {
            choice.selected = selected;
        }
    }

    /// Build FilterParams from the panel state. Empty date fields mean "no
    /// bound". A fully-selected product list deactivates the product filter;
    /// anything else (including nothing selected) is an explicit selection.
    pub fn to_params(&self) -> Result<FilterParams, String> {
        let parse = |input: &TextInput, which: &str| -> Result<Option<NaiveDate>, String> {
            let value = input.value();
            let value = value.trim();
            if value.is_empty() {
                return Ok(None);
            }
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| format!("Invalid {} date: expected YYYY-MM-DD", which))
        };

        let date_start = parse(&self.date_start, "start")?;
        let date_end = parse(&self.date_end, "end")?;

        let products = if self.products.is_empty() || self.products.iter().all(|c| c.selected) {
            None
        } else {
            Some(
                self.products
                    .iter()
                    .filter(|c| c.selected)
                    .map(|c| c.name.clone())
                    .collect(),
            )
        };

        Ok(FilterParams {
            date_start,
            date_end,
            products,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_modal(names: &[&str]) -> FilterModal {
        let mut modal = FilterModal::new();
        modal.open(
            &FilterParams::default(),
            &names.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            None,
        );
        modal
    }

    #[test]
    fn all_selected_products_deactivate_filter() {
        let modal = open_modal(&["A", "B"]);
        let params = modal.to_params().unwrap();
        assert_eq!(params.products, None);
    }

    #[test]
    fn partial_selection_is_explicit() {
        let mut modal = open_modal(&["A", "B"]);
        modal.cursor = 1;
        modal.toggle_current();
        let params = modal.to_params().unwrap();
        assert_eq!(params.products, Some(vec!["A".to_string()]));
    }

    #[test]
    fn deselect_all_yields_empty_selection() {
        let mut modal = open_modal(&["A", "B"]);
        modal.select_all(false);
        let params = modal.to_params().unwrap();
        assert_eq!(params.products, Some(vec![]));
    }

    #[test]
    fn invalid_date_is_an_error() {
        let mut modal = open_modal(&[]);
        modal.date_start.set_value("01/02/2024");
        assert!(modal.to_params().is_err());
    }

    #[test]
    fn empty_dates_mean_unbounded() {
        let modal = open_modal(&[]);
        let params = modal.to_params().unwrap();
        assert_eq!(params.date_start, None);
        assert_eq!(params.date_end, None);
    }

    #[test]
    fn focus_cycles() {
        let mut modal = open_modal(&[]);
        assert_eq!(modal.focus, FilterFocus::DateStart);
        modal.next_focus();
        assert_eq!(modal.focus, FilterFocus::DateEnd);
        modal.prev_focus();
        modal.prev_focus();
        assert_eq!(modal.focus, FilterFocus::Clear);
    }
}
