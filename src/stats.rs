//! Descriptive statistics over the filtered view: Pearson correlation,
//! skewness, and the per-column summary used by the summary table.
//!
//! Degenerate inputs (too few points, zero spread) produce NaN rather than
//! a guess; the insight rules map NaN into their weak/balanced buckets.

use color_eyre::Result;
use polars::prelude::*;

/// Pearson correlation coefficient. NaN when either series has zero
/// variance or there are fewer than three points; a two-point correlation
/// is always ±1 and carries no information, so it counts as undefined too.
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 3 {
        return f64::NAN;
    }
    let nf = n as f64;
    let mean_x = xs[..n].iter().sum::<f64>() / nf;
    let mean_y = ys[..n].iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        let dy = ys[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

/// Adjusted Fisher-Pearson skewness (third standardized moment). NaN when
/// fewer than three points or zero standard deviation.
pub fn skewness(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if n < 3.0 {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = variance.sqrt();
    if std == 0.0 {
        return f64::NAN;
    }

    let sum_cubed_deviations: f64 = values
        .iter()
        .map(|v| {
            let deviation = (v - mean) / std;
            deviation * deviation * deviation
        })
        .sum();

    (n / ((n - 1.0) * (n - 2.0))) * sum_cubed_deviations
}

/// One row of the statistical summary table.
#[derive(Debug, Clone)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub null_count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Non-null values of a numeric series as f64.
pub fn numeric_values(series: &Series) -> Vec<f64> {
    match series.cast(&DataType::Float64) {
        Ok(cast) => match cast.f64() {
            Ok(ca) => ca.iter().flatten().filter(|v| v.is_finite()).collect(),
            Err(_) => Vec::new(),
        },
        Err(_) => Vec::new(),
    }
}

/// Percentile by nearest-rank over a sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Summarize every numeric column: count, nulls, mean, std, min, quartiles,
/// max. Non-numeric columns are skipped.
pub fn describe(frame: &DataFrame) -> Result<Vec<ColumnSummary>> {
    let mut summaries = Vec::new();
    let schema = frame.schema().clone();
    for (name, dtype) in schema.iter() {
        if !is_numeric_type(dtype) {
            continue;
        }
        let column = frame.column(name)?;
        let series = column.as_materialized_series();
        let null_count = series.null_count();
        let mean = series.mean().unwrap_or(f64::NAN);
        let std = series.std(1).unwrap_or(f64::NAN);

        let mut values = numeric_values(series);
        values.sort_by(|a, b| a.partial_cmp(b).expect("finite values"));

        summaries.push(ColumnSummary {
            name: name.to_string(),
            count: series.len() - null_count,
            null_count,
            mean,
            std,
            min: values.first().copied().unwrap_or(f64::NAN),
            q25: percentile(&values, 25.0),
            median: percentile(&values, 50.0),
            q75: percentile(&values, 75.0),
            max: values.last().copied().unwrap_or(f64::NAN),
        });
    }
    Ok(summaries)
}

/// Paired non-null values from two numeric columns; rows where either side
/// is null are dropped from both.
pub fn paired_values(frame: &DataFrame, x: &str, y: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let xs = frame.column(x)?.as_materialized_series().cast(&DataType::Float64)?;
    let ys = frame.column(y)?.as_materialized_series().cast(&DataType::Float64)?;
    let xs = xs.f64()?;
    let ys = ys.f64()?;

    let mut out_x = Vec::with_capacity(xs.len());
    let mut out_y = Vec::with_capacity(ys.len());
    for (x, y) in xs.iter().zip(ys.iter()) {
        if let (Some(x), Some(y)) = (x, y) {
            if x.is_finite() && y.is_finite() {
                out_x.push(x);
                out_y.push(y);
            }
        }
    }
    Ok((out_x, out_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_perfect_positive() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson_correlation(&xs, &ys) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_perfect_negative() {
        let xs = [1.0, 2.0, 3.0];
        let ys = [3.0, 2.0, 1.0];
        assert!((pearson_correlation(&xs, &ys) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_degenerate_is_nan() {
        assert!(pearson_correlation(&[1.0], &[2.0]).is_nan());
        assert!(pearson_correlation(&[], &[]).is_nan());
        // Two points always lie on a line; treated as undefined.
        assert!(pearson_correlation(&[100.0, 200.0], &[40.0, -10.0]).is_nan());
        // zero variance on one side
        assert!(pearson_correlation(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
    }

    #[test]
    fn skewness_of_symmetric_data_is_zero() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(skewness(&values).abs() < 1e-12);
    }

    #[test]
    fn skewness_right_tail_positive() {
        let values = [1.0, 1.0, 1.0, 1.0, 100.0];
        assert!(skewness(&values) > 1.0);
    }

    #[test]
    fn skewness_degenerate_is_nan() {
        assert!(skewness(&[1.0, 2.0]).is_nan());
        assert!(skewness(&[5.0, 5.0, 5.0]).is_nan());
    }

    #[test]
    fn describe_skips_non_numeric() {
        let df = df!(
            "Product" => &["A", "B"],
            "Sales" => &[100.0_f64, 200.0]
        )
        .unwrap();
        let summaries = describe(&df).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "Sales");
        assert_eq!(summaries[0].count, 2);
        assert_eq!(summaries[0].mean, 150.0);
        assert_eq!(summaries[0].min, 100.0);
        assert_eq!(summaries[0].max, 200.0);
    }

    #[test]
    fn paired_values_drop_nulls_together() {
        let df = df!(
            "Sales" => &[Some(1.0_f64), None, Some(3.0)],
            "Profit" => &[Some(0.5_f64), Some(0.2), None]
        )
        .unwrap();
        let (xs, ys) = paired_values(&df, "Sales", "Profit").unwrap();
        assert_eq!(xs, vec![1.0]);
        assert_eq!(ys, vec![0.5]);
    }
}
