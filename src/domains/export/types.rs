use crate::errors::DomainError;
use serde::{Deserialize, Serialize};

/// Suffix of the companion column carrying a property's type tag
pub const TYPE_SUFFIX: &str = "@type";

/// Name of the type column paired with `property`
pub fn type_column(property: &str) -> String {
    format!("{}{}", property, TYPE_SUFFIX)
}

/// Property a type column belongs to, `None` for ordinary columns
pub fn base_column(column: &str) -> Option<&str> {
    column.strip_suffix(TYPE_SUFFIX)
}

/// Line terminator written after every record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineTerminator {
    Lf,
    CrLf,
}

impl LineTerminator {
    /// The host platform's line ending
    pub fn platform() -> Self {
        if cfg!(windows) {
            LineTerminator::CrLf
        } else {
            LineTerminator::Lf
        }
    }

    pub(crate) fn to_csv(self) -> csv::Terminator {
        match self {
            LineTerminator::Lf => csv::Terminator::Any(b'\n'),
            LineTerminator::CrLf => csv::Terminator::CRLF,
        }
    }
}

/// Dialect of the typed CSV files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvConfig {
    pub delimiter: u8,
    pub quote_char: u8,
    pub terminator: LineTerminator,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote_char: b'"',
            terminator: LineTerminator::platform(),
        }
    }
}

/// Statistics about a finished export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportStats {
    pub rows_written: usize,
    /// Header columns, including the system and `@type` columns
    pub columns: usize,
    pub bytes_written: usize,
    pub duration_ms: u64,
}

/// A row the import skipped
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    /// 1-based data row number; the header is not counted
    pub row: usize,
    pub error: DomainError,
}

/// Outcome of an import
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub rows_read: usize,
    pub entities_imported: usize,
    pub chunks_submitted: usize,
    pub skipped: Vec<RowError>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}
