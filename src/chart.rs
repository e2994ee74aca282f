//! Chart building: a pure mapping from the filtered view to renderable
//! chart specs. Which charts appear is capability-gated; the fixed build
//! order matches the dashboard layout top to bottom.

use color_eyre::Result;
use polars::prelude::*;
use serde::Serialize;

use crate::aggregate::sum_by;
use crate::caps::ColumnCaps;
use crate::dataset::columns;
use crate::filter::FilteredView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartKind {
    QuantityOverTime,
    ProfitByProduct,
    SalesVsProfit,
    SalesVsQuantity,
    SalesHistogram,
    CategoryTreemap,
    CustomerQuantity,
}

/// One named series of (x, y) points; `weights` scales point size for
/// bubble charts.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesPoints {
    pub name: String,
    pub points: Vec<(f64, f64)>,
    pub weights: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// One treemap tile in unit-square coordinates.
#[derive(Debug, Clone, Serialize)]
pub struct TreemapTile {
    pub label: String,
    pub value: f64,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

#[derive(Debug, Clone, Serialize)]
pub enum ChartData {
    Points { series: Vec<SeriesPoints>, lines: bool },
    Bars { labels: Vec<String>, values: Vec<f64> },
    Histogram { bins: Vec<HistogramBin> },
    Treemap { tiles: Vec<TreemapTile> },
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub data: ChartData,
}

impl ChartSpec {
    pub fn is_empty(&self) -> bool {
        match &self.data {
            ChartData::Points { series, .. } => series.iter().all(|s| s.points.is_empty()),
            ChartData::Bars { values, .. } => values.is_empty(),
            ChartData::Histogram { bins } => bins.iter().all(|b| b.count == 0),
            ChartData::Treemap { tiles } => tiles.is_empty(),
        }
    }
}

/// Build every chart the current schema supports, in fixed order.
pub fn build_charts(
    view: &FilteredView,
    caps: &ColumnCaps,
    histogram_bins: usize,
) -> Result<Vec<ChartSpec>> {
    let mut charts = Vec::new();

    if caps.has_date && caps.has_quantity {
        charts.push(quantity_over_time(view)?);
    }
    if caps.has_product && caps.has_profit {
        charts.push(profit_by_product(view)?);
    }
    if caps.has_sales && caps.has_profit {
        charts.push(sales_vs_profit(view)?);
    }
    if caps.has_sales && caps.has_quantity && caps.has_profit {
        charts.push(sales_vs_quantity(view)?);
    }
    if caps.has_sales {
        charts.push(sales_histogram(view, histogram_bins)?);
    }
    if caps.has_category && caps.has_sales {
        charts.push(category_treemap(view)?);
    }
    if caps.has_customer && caps.has_quantity {
        charts.push(customer_quantity(view)?);
    }

    Ok(charts)
}

/// The chart embedded in PDF reports, by fixed preference: the category
/// treemap, else sales-vs-profit, else the sales histogram. None means no
/// eligible chart exists and PDF export is unavailable.
pub fn representative(charts: &[ChartSpec]) -> Option<&ChartSpec> {
    const PREFERENCE: [ChartKind; 3] = [
        ChartKind::CategoryTreemap,
        ChartKind::SalesVsProfit,
        ChartKind::SalesHistogram,
    ];
    PREFERENCE
        .iter()
        .find_map(|kind| charts.iter().find(|c| c.kind == *kind && !c.is_empty()))
}

/// (x, y) pairs from two columns, nulls and non-finite values dropped,
/// temporal x cast to day/time ordinals.
fn xy_points(frame: &DataFrame, x: &str, y: &str) -> Result<Vec<(f64, f64)>> {
    let x_expr = match frame.schema().get(x) {
        Some(DataType::Date) | Some(DataType::Datetime(_, _)) => {
            col(x).cast(DataType::Int64).cast(DataType::Float64)
        }
        _ => col(x).cast(DataType::Float64),
    };
    let df = frame
        .clone()
        .lazy()
        .select([x_expr.alias("x"), col(y).cast(DataType::Float64).alias("y")])
        .drop_nulls(None)
        .collect()?;

    let xs = df.column("x")?.f64()?;
    let ys = df.column("y")?.f64()?;
    let mut points = Vec::with_capacity(df.height());
    for (x, y) in xs.iter().zip(ys.iter()) {
        if let (Some(x), Some(y)) = (x, y) {
            if x.is_finite() && y.is_finite() {
                points.push((x, y));
            }
        }
    }
    Ok(points)
}

fn quantity_over_time(view: &FilteredView) -> Result<ChartSpec> {
    let sorted = view
        .frame
        .clone()
        .lazy()
        .sort([columns::DATE], SortMultipleOptions::default())
        .collect()?;
    let points = xy_points(&sorted, columns::DATE, columns::QUANTITY)?;
    Ok(ChartSpec {
        kind: ChartKind::QuantityOverTime,
        title: "Quantity Over Time".to_string(),
        x_label: columns::DATE.to_string(),
        y_label: columns::QUANTITY.to_string(),
        data: ChartData::Points {
            series: vec![SeriesPoints {
                name: columns::QUANTITY.to_string(),
                points,
                weights: None,
            }],
            lines: true,
        },
    })
}

fn profit_by_product(view: &FilteredView) -> Result<ChartSpec> {
    let grouped = sum_by(&view.frame, &[columns::PRODUCT], &[columns::PROFIT])?;
    let sorted = grouped
        .lazy()
        .sort(
            [columns::PROFIT],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .collect()?;

    let labels_series = sorted
        .column(columns::PRODUCT)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let labels_series = labels_series.str()?;
    let values_series = sorted.column(columns::PROFIT)?.f64()?;

    let mut labels = Vec::with_capacity(sorted.height());
    let mut values = Vec::with_capacity(sorted.height());
    for i in 0..sorted.height() {
        labels.push(labels_series.get(i).unwrap_or("").to_string());
        values.push(values_series.get(i).unwrap_or(0.0));
    }

    Ok(ChartSpec {
        kind: ChartKind::ProfitByProduct,
        title: "Profit by Product".to_string(),
        x_label: columns::PRODUCT.to_string(),
        y_label: columns::PROFIT.to_string(),
        data: ChartData::Bars { labels, values },
    })
}

fn sales_vs_profit(view: &FilteredView) -> Result<ChartSpec> {
    let points = xy_points(&view.frame, columns::SALES, columns::PROFIT)?;
    Ok(ChartSpec {
        kind: ChartKind::SalesVsProfit,
        title: "Sales vs Profit".to_string(),
        x_label: columns::SALES.to_string(),
        y_label: columns::PROFIT.to_string(),
        data: ChartData::Points {
            series: vec![SeriesPoints {
                name: "records".to_string(),
                points,
                weights: None,
            }],
            lines: false,
        },
    })
}

fn sales_vs_quantity(view: &FilteredView) -> Result<ChartSpec> {
    let df = view
        .frame
        .clone()
        .lazy()
        .select([
            col(columns::SALES).cast(DataType::Float64).alias("x"),
            col(columns::QUANTITY).cast(DataType::Float64).alias("y"),
            col(columns::PROFIT).cast(DataType::Float64).alias("w"),
        ])
        .drop_nulls(None)
        .collect()?;

    let xs = df.column("x")?.f64()?;
    let ys = df.column("y")?.f64()?;
    let ws = df.column("w")?.f64()?;
    let mut points = Vec::with_capacity(df.height());
    let mut weights = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        if let (Some(x), Some(y), Some(w)) = (xs.get(i), ys.get(i), ws.get(i)) {
            if x.is_finite() && y.is_finite() && w.is_finite() {
                points.push((x, y));
                weights.push(w);
            }
        }
    }

    Ok(ChartSpec {
        kind: ChartKind::SalesVsQuantity,
        title: "Sales vs Quantity (profit-weighted)".to_string(),
        x_label: columns::SALES.to_string(),
        y_label: columns::QUANTITY.to_string(),
        data: ChartData::Points {
            series: vec![SeriesPoints {
                name: "records".to_string(),
                points,
                weights: Some(weights),
            }],
            lines: false,
        },
    })
}

fn sales_histogram(view: &FilteredView, bins: usize) -> Result<ChartSpec> {
    let values = crate::stats::numeric_values(
        view.frame.column(columns::SALES)?.as_materialized_series(),
    );
    Ok(ChartSpec {
        kind: ChartKind::SalesHistogram,
        title: "Sales Distribution".to_string(),
        x_label: columns::SALES.to_string(),
        y_label: "count".to_string(),
        data: ChartData::Histogram {
            bins: histogram(&values, bins),
        },
    })
}

/// Equal-width bins over [min, max]. Values at the top edge land in the
/// last bin.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + i as f64 * width,
            upper: min + (i + 1) as f64 * width,
            count,
        })
        .collect()
}

fn category_treemap(view: &FilteredView) -> Result<ChartSpec> {
    let grouped = sum_by(&view.frame, &[columns::CATEGORY], &[columns::SALES])?;
    let sorted = grouped
        .lazy()
        .sort(
            [columns::SALES],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .collect()?;

    let labels = sorted
        .column(columns::CATEGORY)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let labels = labels.str()?;
    let values = sorted.column(columns::SALES)?.f64()?;

    let mut entries = Vec::with_capacity(sorted.height());
    for i in 0..sorted.height() {
        let value = values.get(i).unwrap_or(0.0);
        if value > 0.0 {
            entries.push((labels.get(i).unwrap_or("").to_string(), value));
        }
    }

    Ok(ChartSpec {
        kind: ChartKind::CategoryTreemap,
        title: "Sales by Category".to_string(),
        x_label: columns::CATEGORY.to_string(),
        y_label: columns::SALES.to_string(),
        data: ChartData::Treemap {
            tiles: treemap_tiles(&entries),
        },
    })
}

/// Slice-and-dice treemap layout in the unit square: each entry takes a
/// slab of the remaining rectangle proportional to its value, splitting
/// along the longer side. Entries must be sorted descending for a sane
/// layout; areas are exactly proportional either way.
pub fn treemap_tiles(entries: &[(String, f64)]) -> Vec<TreemapTile> {
    let total: f64 = entries.iter().map(|(_, v)| v.max(0.0)).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut tiles = Vec::with_capacity(entries.len());
    let (mut x0, mut y0, mut x1, mut y1) = (0.0_f64, 0.0_f64, 1.0_f64, 1.0_f64);
    let mut remaining = total;

    for (label, value) in entries {
        let value = value.max(0.0);
        if value == 0.0 || remaining <= 0.0 {
            continue;
        }
        let share = (value / remaining).min(1.0);
        let (w, h) = (x1 - x0, y1 - y0);
        let tile = if w >= h {
            let split = x0 + w * share;
            let t = TreemapTile {
                label: label.clone(),
                value,
                x0,
                y0,
                x1: split,
                y1,
            };
            x0 = split;
            t
        } else {
            let split = y0 + h * share;
            let t = TreemapTile {
                label: label.clone(),
                value,
                x0,
                y0,
                x1,
                y1: split,
            };
            y0 = split;
            t
        };
        tiles.push(tile);
        remaining -= value;
    }
    tiles
}

fn customer_quantity(view: &FilteredView) -> Result<ChartSpec> {
    let grouped = sum_by(&view.frame, &[columns::CUSTOMER], &[columns::QUANTITY])?;

    let labels_series = grouped
        .column(columns::CUSTOMER)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let labels_series = labels_series.str()?;
    let values_series = grouped.column(columns::QUANTITY)?.f64()?;

    let mut labels = Vec::with_capacity(grouped.height());
    let mut values = Vec::with_capacity(grouped.height());
    for i in 0..grouped.height() {
        labels.push(labels_series.get(i).unwrap_or("").to_string());
        values.push(values_series.get(i).unwrap_or(0.0));
    }

    Ok(ChartSpec {
        kind: ChartKind::CustomerQuantity,
        title: "Customers vs Quantity".to_string(),
        x_label: columns::CUSTOMER.to_string(),
        y_label: columns::QUANTITY.to_string(),
        data: ChartData::Bars { labels, values },
    })
}
