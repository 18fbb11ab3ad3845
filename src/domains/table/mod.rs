pub mod memory;
pub mod repository;
pub mod service;
pub mod types;

pub use memory::{InMemoryTable, InMemoryTableStore, TransactionRecord};
pub use repository::{TableClient, TableServiceClient, TABLE_NAME_COLUMN};
pub use service::{TableExtensions, TableServiceExtensions};
pub use types::*;
