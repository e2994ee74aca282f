//! Filter engine: date-range and product-membership predicates over the
//! source table, producing a fresh FilteredView per parameter change.

use chrono::NaiveDate;
use color_eyre::Result;
use polars::prelude::*;

use crate::caps::ColumnCaps;
use crate::dataset::columns;

/// Filter parameters as selected by the user. `products: None` means the
/// product filter is inactive; `Some(vec![])` means "zero products selected"
/// and yields an empty view, not a pass-through.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterParams {
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub products: Option<Vec<String>>,
}

impl FilterParams {
    pub fn is_active(&self) -> bool {
        self.date_start.is_some() || self.date_end.is_some() || self.products.is_some()
    }
}

/// A read-only subset of the source table under the current filters.
/// Always a fresh derivation; discarded and rebuilt when filters change.
#[derive(Debug, Clone)]
pub struct FilteredView {
    pub frame: DataFrame,
}

impl FilteredView {
    pub fn height(&self) -> usize {
        self.frame.height()
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid date")
}

fn day_ordinal(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

/// Apply the date and product predicates. Each predicate is a no-op when its
/// column is unavailable; date bounds are inclusive on both ends.
pub fn apply_filters(
    source: &DataFrame,
    caps: &ColumnCaps,
    params: &FilterParams,
) -> Result<FilteredView> {
    let mut lf = source.clone().lazy();

    if caps.has_date {
        // Compare on day ordinals so Date and Datetime columns behave alike.
        let day = col(columns::DATE).cast(DataType::Date).cast(DataType::Int32);
        if let Some(start) = params.date_start {
            lf = lf.filter(day.clone().gt_eq(lit(day_ordinal(start))));
        }
        if let Some(end) = params.date_end {
            lf = lf.filter(day.lt_eq(lit(day_ordinal(end))));
        }
    }

    if caps.has_product {
        if let Some(products) = &params.products {
            let predicate = products
                .iter()
                .map(|p| col(columns::PRODUCT).eq(lit(p.as_str())))
                .reduce(|a, b| a.or(b))
                // Zero selected products: nothing passes.
                .unwrap_or_else(|| lit(false));
            lf = lf.filter(predicate);
        }
    }

    Ok(FilteredView {
        frame: lf.collect()?,
    })
}

/// Min/max of the temporal `Date` column, for filter defaults and display.
pub fn date_bounds(source: &DataFrame, caps: &ColumnCaps) -> Result<Option<(NaiveDate, NaiveDate)>> {
    if !caps.has_date {
        return Ok(None);
    }
    let days = source
        .column(columns::DATE)?
        .as_materialized_series()
        .cast(&DataType::Date)?
        .cast(&DataType::Int32)?;
    let days = days.i32()?;
    let (Some(min), Some(max)) = (days.min(), days.max()) else {
        return Ok(None);
    };
    let to_date = |d: i32| epoch() + chrono::Duration::days(d as i64);
    Ok(Some((to_date(min), to_date(max))))
}

/// Distinct product names in first-encounter order, for the selection list.
pub fn product_values(source: &DataFrame, caps: &ColumnCaps) -> Result<Vec<String>> {
    if !caps.has_product {
        return Ok(Vec::new());
    }
    let series = source.column(columns::PRODUCT)?.as_materialized_series();
    let strings = series.cast(&DataType::String)?;
    let strings = strings.str()?;
    let mut seen = std::collections::HashSet::new();
    let mut values = Vec::new();
    for v in strings.iter().flatten() {
        if seen.insert(v.to_string()) {
            values.push(v.to_string());
        }
    }
    Ok(values)
}
