//! Aggregation layer: grouped sums, top-N rankings, and the guarded profit
//! margin. All pure functions of their inputs.

use color_eyre::Result;
use polars::prelude::*;

use crate::caps::ColumnCaps;
use crate::dataset::columns;
use crate::filter::FilteredView;

/// Name of the derived margin column appended by [`sum_by`].
pub const PROFIT_MARGIN: &str = "Profit_Margin";

/// Profit ÷ Sales, defined as 0.0 when Sales is 0. Never NaN or infinite.
/// Applied per-row for record margins and per-group for aggregate margins;
/// never an average of ratios.
pub fn profit_margin(sales: f64, profit: f64) -> f64 {
    if sales == 0.0 {
        0.0
    } else {
        profit / sales
    }
}

/// Group by `group_keys` and sum each metric column. One output row per
/// distinct key combination observed in the data (no synthetic zero rows),
/// in first-encounter order. When both Sales and Profit are among the
/// metrics a guarded `Profit_Margin` column is appended.
pub fn sum_by(frame: &DataFrame, group_keys: &[&str], metrics: &[&str]) -> Result<DataFrame> {
    if group_keys.is_empty() {
        return Err(color_eyre::eyre::eyre!("sum_by requires at least one group key"));
    }
    let keys: Vec<Expr> = group_keys.iter().map(|k| col(*k)).collect();
    let aggs: Vec<Expr> = metrics
        .iter()
        .map(|m| col(*m).cast(DataType::Float64).sum())
        .collect();

    let mut lf = frame.clone().lazy().group_by_stable(keys).agg(aggs);

    if metrics.contains(&columns::SALES) && metrics.contains(&columns::PROFIT) {
        lf = lf.with_column(
            when(col(columns::SALES).eq(lit(0.0)))
                .then(lit(0.0))
                .otherwise(col(columns::PROFIT) / col(columns::SALES))
                .alias(PROFIT_MARGIN),
        );
    }

    Ok(lf.collect()?)
}

/// The `n` groups with the largest summed `metric`, descending. Ties keep
/// their first-encounter order (stable sort over the stable grouping).
pub fn top_n(frame: &DataFrame, group_key: &str, metric: &str, n: usize) -> Result<Vec<(String, f64)>> {
    let summed = sum_by(frame, &[group_key], &[metric])?;
    let sorted = summed
        .lazy()
        .sort(
            [metric],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .limit(n as u32)
        .collect()?;

    let labels = sorted.column(group_key)?.as_materialized_series().cast(&DataType::String)?;
    let labels = labels.str()?;
    let values = sorted.column(metric)?.f64()?;

    let mut out = Vec::with_capacity(sorted.height());
    for i in 0..sorted.height() {
        let label = labels.get(i).unwrap_or("").to_string();
        let value = values.get(i).unwrap_or(0.0);
        out.push((label, value));
    }
    Ok(out)
}

/// Headline totals for the metrics strip. A metric is `None` when its
/// column is absent from the schema.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MetricTotals {
    pub rows: usize,
    pub sales: Option<f64>,
    pub profit: Option<f64>,
    pub quantity: Option<f64>,
}

pub fn metric_totals(view: &FilteredView, caps: &ColumnCaps) -> Result<MetricTotals> {
    let sum_of = |name: &str| -> Result<f64> {
        let series = view
            .frame
            .column(name)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        Ok(series.sum::<f64>().unwrap_or(0.0))
    };

    Ok(MetricTotals {
        rows: view.height(),
        sales: if caps.has_sales { Some(sum_of(columns::SALES)?) } else { None },
        profit: if caps.has_profit { Some(sum_of(columns::PROFIT)?) } else { None },
        quantity: if caps.has_quantity { Some(sum_of(columns::QUANTITY)?) } else { None },
    })
}

/// Per-record profit margins with the division guard applied row by row.
/// Rows where either column is null are skipped.
pub fn record_margins(view: &FilteredView) -> Result<Vec<f64>> {
    let sales = view
        .frame
        .column(columns::SALES)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let profit = view
        .frame
        .column(columns::PROFIT)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let sales = sales.f64()?;
    let profit = profit.f64()?;

    let mut margins = Vec::with_capacity(view.height());
    for (s, p) in sales.iter().zip(profit.iter()) {
        if let (Some(s), Some(p)) = (s, p) {
            margins.push(profit_margin(s, p));
        }
    }
    Ok(margins)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> FilteredView {
        FilteredView {
            frame: df!(
                "Category" => &["X", "X", "Y"],
                "Product" => &["A", "B", "A"],
                "Sales" => &[100.0_f64, 200.0, 0.0],
                "Profit" => &[40.0_f64, -10.0, 25.0],
                "Quantity" => &[2_i64, 1, 3]
            )
            .unwrap(),
        }
    }

    #[test]
    fn profit_margin_guard() {
        assert_eq!(profit_margin(0.0, 123.0), 0.0);
        assert_eq!(profit_margin(100.0, 25.0), 0.25);
        assert_eq!(profit_margin(0.0, 0.0), 0.0);
        assert!(profit_margin(-50.0, 10.0).is_finite());
    }

    #[test]
    fn sum_by_partitions_the_view() {
        let view = view();
        let grouped = sum_by(&view.frame, &["Category"], &["Sales", "Profit"]).unwrap();
        assert_eq!(grouped.height(), 2);

        let total_sales: f64 = grouped.column("Sales").unwrap().f64().unwrap().sum().unwrap();
        let total_profit: f64 = grouped.column("Profit").unwrap().f64().unwrap().sum().unwrap();
        assert_eq!(total_sales, 300.0);
        assert_eq!(total_profit, 55.0);
    }

    #[test]
    fn sum_by_appends_guarded_margin() {
        let view = view();
        let grouped = sum_by(&view.frame, &["Product"], &["Sales", "Profit"]).unwrap();
        let margins = grouped.column(PROFIT_MARGIN).unwrap().f64().unwrap();
        for m in margins.iter().flatten() {
            assert!(m.is_finite());
        }
        // Product A: sales 100, profit 65 -> 0.65
        let products = grouped.column("Product").unwrap().str().unwrap();
        let idx = (0..grouped.height())
            .find(|&i| products.get(i) == Some("A"))
            .unwrap();
        assert!((margins.get(idx).unwrap() - 0.65).abs() < 1e-12);
    }

    #[test]
    fn sum_by_no_synthetic_rows() {
        let view = view();
        let grouped = sum_by(&view.frame, &["Category", "Product"], &["Sales"]).unwrap();
        // Only X×A, X×B, Y×A occur; Y×B must not be invented.
        assert_eq!(grouped.height(), 3);
    }

    #[test]
    fn top_n_orders_descending() {
        let view = view();
        let top = top_n(&view.frame, "Product", "Sales", 2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, "B");
        assert_eq!(top[0].1, 200.0);
        assert_eq!(top[1].0, "A");
    }

    #[test]
    fn top_n_stable_on_ties() {
        let frame = df!(
            "Product" => &["A", "B", "C"],
            "Sales" => &[50.0_f64, 50.0, 50.0]
        )
        .unwrap();
        let top = top_n(&frame, "Product", "Sales", 3).unwrap();
        let labels: Vec<&str> = top.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
    }

    #[test]
    fn totals_match_view() {
        let view = view();
        let caps = ColumnCaps::from_frame(&view.frame);
        let totals = metric_totals(&view, &caps).unwrap();
        assert_eq!(totals.rows, 3);
        assert_eq!(totals.sales, Some(300.0));
        assert_eq!(totals.profit, Some(55.0));
        assert_eq!(totals.quantity, Some(6.0));
    }

    #[test]
    fn totals_none_for_absent_columns() {
        let view = FilteredView {
            frame: df!("Sales" => &[10.0_f64]).unwrap(),
        };
        let caps = ColumnCaps::from_frame(&view.frame);
        let totals = metric_totals(&view, &caps).unwrap();
        assert_eq!(totals.sales, Some(10.0));
        assert_eq!(totals.profit, None);
        assert_eq!(totals.quantity, None);
    }

    #[test]
    fn record_margins_apply_guard_per_row() {
        let view = view();
        let margins = record_margins(&view).unwrap();
        assert_eq!(margins, vec![0.4, -0.05, 0.0]);
    }
}
