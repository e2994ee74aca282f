use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

use crate::export::ExportFormat;

/// Headless export selection: one format, or everything at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportSelection {
    Csv,
    Html,
    Pdf,
    /// Copy of the original input file.
    Dataset,
    All,
}

impl ExportSelection {
    pub fn formats(self) -> Vec<ExportFormat> {
        match self {
            Self::Csv => vec![ExportFormat::Csv],
            Self::Html => vec![ExportFormat::Html],
            Self::Pdf => vec![ExportFormat::Pdf],
            Self::Dataset => vec![ExportFormat::Dataset],
            Self::All => ExportFormat::ALL.to_vec(),
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD date: {}", e))
}

/// Command-line arguments for edash
#[derive(Parser, Debug)]
#[command(version, about = "edash")]
pub struct Args {
    /// Spreadsheet to explore (csv, csv.gz, xls, xlsx, xlsm, xlsb)
    pub path: PathBuf,

    /// Excel worksheet to read, by name or 0-based index
    #[arg(long = "sheet")]
    pub sheet: Option<String>,

    /// Specify the delimiter to use when reading a CSV file
    #[arg(long = "delimiter")]
    pub delimiter: Option<u8>,

    /// Specify that the file has no header
    #[arg(long = "no-header", action)]
    pub no_header: bool,

    /// Histogram bins for the sales distribution chart
    #[arg(long = "bins")]
    pub bins: Option<usize>,

    /// Inclusive lower date bound (YYYY-MM-DD)
    #[arg(long = "date-start", value_parser = parse_date)]
    pub date_start: Option<NaiveDate>,

    /// Inclusive upper date bound (YYYY-MM-DD)
    #[arg(long = "date-end", value_parser = parse_date)]
    pub date_end: Option<NaiveDate>,

    /// Comma-separated product filter; an empty string selects nothing
    #[arg(long = "products", value_delimiter = ',')]
    pub products: Option<Vec<String>>,

    /// Run one export headlessly and exit instead of opening the dashboard
    #[arg(long = "export", value_enum)]
    pub export: Option<ExportSelection>,

    /// Directory exports are written into
    #[arg(long = "out")]
    pub out: Option<PathBuf>,

    /// Write the default config file and exit
    #[arg(long = "write-config", action)]
    pub write_config: bool,

    /// Overwrite an existing config file with --write-config
    #[arg(long = "force", action)]
    pub force: bool,
}
