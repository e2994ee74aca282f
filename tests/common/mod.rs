use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A small sales table covering every well-known column. Dates are strings
/// here; the loader coerces them on the way in.
pub fn sales_frame() -> DataFrame {
    df!(
        "Date" => &[
            "2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04",
            "2024-01-05", "2024-01-06", "2024-01-07", "2024-01-08",
        ],
        "Product" => &["Widget", "Gadget", "Widget", "Doohickey", "Gadget", "Widget", "Doohickey", "Gadget"],
        "Category" => &["Hardware", "Hardware", "Software", "Hardware", "Software", "Hardware", "Hardware", "Software"],
        "Customer" => &["acme", "globex", "acme", "initech", "globex", "acme", "initech", "acme"],
        "Sales" => &[120.0_f64, 340.5, 89.9, 410.0, 55.0, 230.0, 99.0, 180.0],
        "Profit" => &[24.0_f64, 80.0, -5.0, 120.0, 11.0, 46.0, 0.0, 40.0],
        "Quantity" => &[2_i64, 5, 1, 7, 1, 3, 2, 2]
    )
    .unwrap()
}

/// Write a DataFrame as CSV into `dir` and return the path.
pub fn write_csv(dir: &Path, name: &str, df: &mut DataFrame) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
    path
}

/// Write the standard sample table as CSV.
pub fn write_sales_csv(dir: &Path) -> PathBuf {
    write_csv(dir, "sales.csv", &mut sales_frame())
}
