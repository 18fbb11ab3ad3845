pub mod codec;
pub mod readers;
pub mod schema;
pub mod service;
pub mod types;
pub mod writers;

pub use codec::{coerce, format_datetime, format_value, parse_datetime, render_cell, RowDecoder};
pub use readers::CsvRecordReader;
pub use schema::{Header, SchemaDiscoverer};
pub use service::{export_csv, import_csv};
pub use types::{CsvConfig, ExportStats, ImportReport, LineTerminator, RowError, TYPE_SUFFIX};
pub use writers::TypedCsvWriter;
