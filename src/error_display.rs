//! User-facing error message formatting.
//!
//! Uses typed error matching (LoadError, PolarsError variants, io::ErrorKind)
//! rather than string parsing to produce actionable, implementation-agnostic
//! messages for the status line.

use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

use crate::dataset::LoadError;

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!(
            "Column not found: {}. Check spelling and that the column exists.",
            msg
        ),
        PE::Duplicate(msg) => format!("Duplicate column: {}", msg),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::InvalidOperation(msg) => format!("Operation not allowed: {}", msg),
        PE::OutOfBounds(msg) => format!("Index or row out of bounds: {}", msg),
        PE::SchemaFieldNotFound(msg) => format!("Schema field not found: {}", msg),
        PE::ComputeError(msg) => msg.to_string(),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Format a color_eyre Report by downcasting to known error types, walking
/// the cause chain for LoadError first, then PolarsError and io::Error.
pub fn user_message_from_report(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    for cause in report.chain() {
        if let Some(load_err) = cause.downcast_ref::<LoadError>() {
            return load_err.to_string();
        }
        if let Some(pe) = cause.downcast_ref::<PolarsError>() {
            let msg = user_message_from_polars(pe);
            return match path {
                Some(p) => format!("Failed to load {}: {}", p.display(), msg),
                None => msg,
            };
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            let msg = user_message_from_io(io_err, None);
            return match path {
                Some(p) => format!("Failed to load {}: {}", p.display(), msg),
                None => msg,
            };
        }
    }

    // Fallback: first display line, to avoid long tracebacks in the UI.
    let display = report.to_string();
    let first_line = display.lines().next().unwrap_or("An error occurred").trim();
    match path {
        Some(p) => format!("Failed to load {}: {}", p.display(), first_line),
        None => first_line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn io_not_found_message() {
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file");
        let msg = user_message_from_io(&err, None);
        assert!(msg.contains("not found"), "got: {}", msg);
    }

    #[test]
    fn polars_column_not_found_message() {
        let err = PolarsError::ColumnNotFound("foo".into());
        let msg = user_message_from_polars(&err);
        assert!(msg.contains("foo"), "got: {}", msg);
        assert!(msg.contains("Column not found"), "got: {}", msg);
    }

    #[test]
    fn report_surfaces_load_error() {
        let report = color_eyre::eyre::Report::new(LoadError::DatasetNotFound(PathBuf::from(
            "/data/sales.xlsx",
        )));
        let msg = user_message_from_report(&report, None);
        assert!(msg.contains("Dataset not found"), "got: {}", msg);
        assert!(msg.contains("sales.xlsx"), "got: {}", msg);
    }

    #[test]
    fn report_fallback_uses_first_line() {
        let report = color_eyre::eyre::eyre!("top line\nsecond line");
        let msg = user_message_from_report(&report, None);
        assert_eq!(msg, "top line");
    }
}
