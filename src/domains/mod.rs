pub mod batch;
pub mod core;
pub mod export;
pub mod query;
pub mod table;

pub use table::{TableExtensions, TableServiceExtensions};
