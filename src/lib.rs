// Public modules
pub mod config;
pub mod domains;
pub mod errors;
pub mod globals;
pub mod types;
pub mod validation;

pub use config::{ExtensionsConfig, ImportErrorPolicy};
pub use domains::batch::{partition_into_chunks, submit_batched, ChunkResult, PartitionChunk};
pub use domains::core::keys::{from_safe_key, ticks_key, ticks_key_at, ticks_key_to_datetime, to_safe_key};
pub use domains::export::{CsvConfig, ExportStats, ImportReport, RowError};
pub use domains::query::{starts_with, Filter};
pub use domains::table::{
    InMemoryTable, InMemoryTableStore, QueryOptions, TableClient, TableExtensions, TableServiceClient,
    TableServiceExtensions, TransactionActionType,
};
pub use errors::{DomainError, DomainResult, StoreError, StoreResult, ValidationError};
pub use types::{Entity, PropertyValue, TypeTag};

/// Initialize logging and load the default config from the environment.
/// Safe to call more than once.
pub fn initialize() -> DomainResult<ExtensionsConfig> {
    globals::initialize()
}
