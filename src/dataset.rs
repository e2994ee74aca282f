//! Dataset loading: CSV (plain or gzipped) and Excel workbooks into Polars.
//!
//! Loading failures are typed (`LoadError`) so callers can tell a missing
//! file from an unreadable one. After load, column names are trimmed and a
//! `Date` column is best-effort coerced to a temporal dtype; when coercion
//! fails the column is left untouched and date filtering is unavailable.

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use color_eyre::Result;
use polars::prelude::*;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

/// Well-known column names the dashboard understands. Any subset may be
/// present; absent columns disable the computations that need them.
pub mod columns {
    pub const DATE: &str = "Date";
    pub const PRODUCT: &str = "Product";
    pub const CATEGORY: &str = "Category";
    pub const CUSTOMER: &str = "Customer";
    pub const SALES: &str = "Sales";
    pub const PROFIT: &str = "Profit";
    pub const QUANTITY: &str = "Quantity";
}

/// Typed loading failures. Both are user-facing conditions, not crashes.
#[derive(Debug)]
pub enum LoadError {
    /// The configured path does not exist.
    DatasetNotFound(PathBuf),
    /// The file exists but could not be parsed as tabular data.
    DataUnreadable(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::DatasetNotFound(path) => {
                write!(f, "Dataset not found at: {}", path.display())
            }
            LoadError::DataUnreadable(msg) => {
                write!(f, "Error reading dataset: {}", msg)
            }
        }
    }
}

impl std::error::Error for LoadError {}

#[derive(Debug, Default, Clone)]
pub struct LoadOptions {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    /// Excel worksheet selection by 0-based index or name.
    pub sheet: Option<String>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }
}

/// A loaded source table plus enough provenance to offer the original file
/// back as a download (unmodified bytes, original MIME type).
#[derive(Clone, Debug)]
pub struct Dataset {
    pub frame: DataFrame,
    pub path: PathBuf,
    pub mime: &'static str,
}

impl Dataset {
    /// Load a dataset from `path`. The format is chosen by extension:
    /// csv / csv.gz / xls / xlsx / xlsm / xlsb.
    pub fn load(path: &Path, options: &LoadOptions) -> Result<Self> {
        if !path.exists() {
            return Err(LoadError::DatasetNotFound(path.to_path_buf()).into());
        }

        let ext = file_extension(path);
        let frame = match ext.as_deref() {
            Some("csv") => read_csv_frame(path, options, false),
            Some("gz") => read_csv_frame(path, options, true),
            Some("xls") | Some("xlsx") | Some("xlsm") | Some("xlsb") => {
                read_excel_frame(path, options)
            }
            other => Err(color_eyre::eyre::eyre!(
                "unsupported file extension: {}",
                other.unwrap_or("(none)")
            )),
        }
        .map_err(|e| LoadError::DataUnreadable(first_line(&e.to_string())))?;

        let frame = normalize_column_names(frame)?;
        let frame = coerce_date_column(frame)?;

        Ok(Self {
            frame,
            path: path.to_path_buf(),
            mime: mime_for_extension(ext.as_deref()),
        })
    }
}

/// Final path extension, lowercased.
fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// MIME type of the original file, for the dataset passthrough export.
pub fn mime_for_extension(ext: Option<&str>) -> &'static str {
    match ext {
        Some("csv") => "text/csv",
        Some("gz") => "application/gzip",
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") | Some("xlsm") | Some("xlsb") => {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        }
        _ => "application/octet-stream",
    }
}

fn first_line(msg: &str) -> String {
    msg.lines().next().unwrap_or("unknown error").trim().to_string()
}

fn read_csv_frame(path: &Path, options: &LoadOptions, gzipped: bool) -> Result<DataFrame> {
    let mut read_options = CsvReadOptions::default();
    if let Some(has_header) = options.has_header {
        read_options.has_header = has_header;
    }
    if let Some(delimiter) = options.delimiter {
        read_options = read_options.map_parse_options(|opts| opts.with_separator(delimiter));
    }

    let df = if gzipped {
        let file = File::open(path)?;
        let mut decoder = flate2::read::GzDecoder::new(BufReader::new(file));
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        CsvReader::new(Cursor::new(decompressed))
            .with_options(read_options)
            .finish()?
    } else {
        read_options
            .try_into_reader_with_file_path(Some(path.into()))?
            .finish()?
    };
    Ok(df)
}

/// Eager Excel read via calamine, with per-column type inference.
fn read_excel_frame(path: &Path, options: &LoadOptions) -> Result<DataFrame> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| color_eyre::eyre::eyre!("Excel: {}", e))?;
    if workbook.sheet_names().is_empty() {
        return Err(color_eyre::eyre::eyre!("Excel file has no worksheets"));
    }

    let range = match options.sheet.as_deref() {
        Some(sel) => {
            if let Ok(idx) = sel.parse::<usize>() {
                workbook
                    .worksheet_range_at(idx)
                    .ok_or_else(|| color_eyre::eyre::eyre!("Excel: no sheet at index {}", idx))?
                    .map_err(|e| color_eyre::eyre::eyre!("Excel: {}", e))?
            } else {
                workbook
                    .worksheet_range(sel)
                    .map_err(|e| color_eyre::eyre::eyre!("Excel: {}", e))?
            }
        }
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| color_eyre::eyre::eyre!("Excel: no first sheet"))?
            .map_err(|e| color_eyre::eyre::eyre!("Excel: {}", e))?,
    };

    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
    if rows.is_empty() {
        return Ok(DataFrame::new(vec![])?);
    }

    let headers: Vec<String> = rows[0]
        .iter()
        .map(|c| calamine::DataType::as_string(c).unwrap_or_else(|| c.to_string()))
        .collect();

    let mut series_vec = Vec::with_capacity(headers.len());
    for (col_idx, header) in headers.iter().enumerate() {
        let cells: Vec<Option<&Data>> = rows[1..].iter().map(|row| row.get(col_idx)).collect();
        let name = if header.trim().is_empty() {
            format!("column_{}", col_idx + 1)
        } else {
            header.clone()
        };
        let series = excel_column_to_series(&name, &cells, excel_infer_column_type(&cells))?;
        series_vec.push(series.into());
    }
    Ok(DataFrame::new(series_vec)?)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExcelColType {
    Int64,
    Float64,
    Utf8,
    Boolean,
    Date,
    Datetime,
}

/// Infers a column type: strings win unless every non-empty cell parses as a
/// date; whole-number float columns become Int64.
fn excel_infer_column_type(cells: &[Option<&Data>]) -> ExcelColType {
    use calamine::DataType as CalamineTrait;
    let mut has_string = false;
    let mut has_float = false;
    let mut has_int = false;
    let mut has_bool = false;
    let mut has_datetime = false;
    for cell in cells.iter().flatten() {
        if CalamineTrait::is_string(*cell) {
            has_string = true;
            break;
        }
        if CalamineTrait::is_float(*cell) {
            has_float = true;
        }
        if CalamineTrait::is_int(*cell) {
            has_int = true;
        }
        if CalamineTrait::is_bool(*cell) {
            has_bool = true;
        }
        if CalamineTrait::is_datetime(*cell) || CalamineTrait::is_datetime_iso(*cell) {
            has_datetime = true;
        }
    }

    if has_string {
        let any_parsed = cells
            .iter()
            .flatten()
            .any(|c| excel_cell_to_naive_datetime(c).is_some());
        let all_non_empty_parse = cells.iter().flatten().all(|c| {
            calamine::DataType::is_empty(*c) || excel_cell_to_naive_datetime(c).is_some()
        });
        if any_parsed && all_non_empty_parse {
            if parsed_cells_all_midnight(cells) {
                ExcelColType::Date
            } else {
                ExcelColType::Datetime
            }
        } else {
            ExcelColType::Utf8
        }
    } else if has_datetime {
        if parsed_cells_all_midnight(cells) {
            ExcelColType::Date
        } else {
            ExcelColType::Datetime
        }
    } else if has_int {
        ExcelColType::Int64
    } else if has_float {
        let all_whole = cells.iter().flatten().all(|cell| {
            calamine::DataType::as_f64(*cell)
                .is_none_or(|f| f.is_finite() && (f - f.trunc()).abs() < 1e-10)
        });
        if all_whole {
            ExcelColType::Int64
        } else {
            ExcelColType::Float64
        }
    } else if has_bool {
        ExcelColType::Boolean
    } else {
        ExcelColType::Utf8
    }
}

fn parsed_cells_all_midnight(cells: &[Option<&Data>]) -> bool {
    let midnight = NaiveTime::from_hms_opt(0, 0, 0).expect("valid time");
    cells
        .iter()
        .flatten()
        .filter_map(|c| excel_cell_to_naive_datetime(c))
        .all(|dt| dt.time() == midnight)
}

/// Converts a calamine cell to NaiveDateTime (Excel serial, DateTimeIso, or
/// parseable string).
fn excel_cell_to_naive_datetime(cell: &Data) -> Option<NaiveDateTime> {
    use calamine::DataType;
    if let Some(dt) = cell.as_datetime() {
        return Some(dt);
    }
    let s = cell.get_datetime_iso().or_else(|| cell.get_string())?;
    parse_naive_datetime_str(s)
}

/// Parses an ISO-style date/datetime string; tries FORMATS in order.
pub(crate) fn parse_naive_datetime_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0).expect("midnight"));
    }
    None
}

fn excel_column_to_series(
    name: &str,
    cells: &[Option<&Data>],
    col_type: ExcelColType,
) -> Result<Series> {
    use calamine::DataType as CalamineTrait;
    let series = match col_type {
        ExcelColType::Int64 => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| c.and_then(|cell| CalamineTrait::as_i64(cell)))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Float64 => {
            let v: Vec<Option<f64>> = cells
                .iter()
                .map(|c| c.and_then(|cell| CalamineTrait::as_f64(cell)))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Boolean => {
            let v: Vec<Option<bool>> = cells
                .iter()
                .map(|c| c.and_then(|cell| cell.get_bool()))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Utf8 => {
            let v: Vec<Option<String>> = cells
                .iter()
                .map(|c| c.and_then(|cell| CalamineTrait::as_string(cell)))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Date => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid date");
            let v: Vec<Option<i32>> = cells
                .iter()
                .map(|c| {
                    c.and_then(excel_cell_to_naive_datetime)
                        .map(|dt| (dt.date() - epoch).num_days() as i32)
                })
                .collect();
            Series::new(name.into(), v).cast(&DataType::Date)?
        }
        ExcelColType::Datetime => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| {
                    c.and_then(excel_cell_to_naive_datetime)
                        .map(|dt| dt.and_utc().timestamp_micros())
                })
                .collect();
            Series::new(name.into(), v).cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        }
    };
    Ok(series)
}

/// Trim surrounding whitespace from every column name.
fn normalize_column_names(frame: DataFrame) -> Result<DataFrame> {
    let names: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let trimmed: Vec<String> = names.iter().map(|s| s.trim().to_string()).collect();
    if names == trimmed {
        return Ok(frame);
    }
    let mut frame = frame;
    frame.set_column_names(trimmed)?;
    Ok(frame)
}

/// Best-effort coercion of a string `Date` column to the Date dtype. Every
/// non-null value must parse; otherwise the column is left as-is (silent
/// degrade; downstream treats a non-temporal `Date` as "no date filtering").
fn coerce_date_column(frame: DataFrame) -> Result<DataFrame> {
    let Ok(column) = frame.column(columns::DATE) else {
        return Ok(frame);
    };
    if !matches!(column.dtype(), DataType::String) {
        return Ok(frame);
    }

    let strings = column.str()?;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid date");
    let mut days: Vec<Option<i32>> = Vec::with_capacity(strings.len());
    for value in strings.iter() {
        match value {
            None => days.push(None),
            Some(s) => match parse_naive_datetime_str(s) {
                Some(dt) => days.push(Some((dt.date() - epoch).num_days() as i32)),
                // One unparseable value abandons the coercion entirely.
                None => return Ok(frame.clone()),
            },
        }
    }

    let date_series = Series::new(columns::DATE.into(), days).cast(&DataType::Date)?;
    let mut frame = frame;
    frame.replace(columns::DATE, date_series)?;
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_for_known_extensions() {
        assert_eq!(mime_for_extension(Some("csv")), "text/csv");
        assert_eq!(
            mime_for_extension(Some("xlsx")),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(mime_for_extension(Some("xls")), "application/vnd.ms-excel");
        assert_eq!(mime_for_extension(None), "application/octet-stream");
    }

    #[test]
    fn parse_datetime_formats() {
        assert!(parse_naive_datetime_str("2024-01-15").is_some());
        assert!(parse_naive_datetime_str("2024-01-15 08:30:00").is_some());
        assert!(parse_naive_datetime_str("2024-01-15T08:30:00").is_some());
        assert!(parse_naive_datetime_str("15/01/2024").is_none());
        assert!(parse_naive_datetime_str("").is_none());
    }

    #[test]
    fn trims_column_names() {
        let df = df!("  Sales " => &[1.0_f64], "Profit" => &[2.0_f64]).unwrap();
        let df = normalize_column_names(df).unwrap();
        let names: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["Sales", "Profit"]);
    }

    #[test]
    fn coerces_fully_parseable_date_column() {
        let df = df!(
            "Date" => &["2024-01-01", "2024-01-02"],
            "Sales" => &[100.0_f64, 200.0]
        )
        .unwrap();
        let df = coerce_date_column(df).unwrap();
        assert_eq!(df.column("Date").unwrap().dtype(), &DataType::Date);
    }

    #[test]
    fn leaves_unparseable_date_column_as_string() {
        let df = df!(
            "Date" => &["2024-01-01", "not a date"],
            "Sales" => &[100.0_f64, 200.0]
        )
        .unwrap();
        let df = coerce_date_column(df).unwrap();
        assert_eq!(df.column("Date").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn load_missing_path_is_dataset_not_found() {
        let err = Dataset::load(Path::new("/nonexistent/sales.xlsx"), &LoadOptions::new())
            .expect_err("should fail");
        let load_err = err
            .downcast_ref::<LoadError>()
            .expect("typed load error in chain");
        assert!(matches!(load_err, LoadError::DatasetNotFound(_)));
    }
}
