use crate::domains::query::filter::Filter;
use crate::domains::table::types::*;
use crate::errors::StoreResult;
use async_trait::async_trait;

/// Column the table listing can be filtered on
pub const TABLE_NAME_COLUMN: &str = "TableName";

/// Capabilities of a client bound to a single table.
///
/// Implementations own authentication, wire protocol and paging on the
/// service side. The extension layer only drives them.
#[async_trait]
pub trait TableClient: Send + Sync {
    fn table_name(&self) -> &str;

    /// Fetch one page, resuming after `continuation` when given
    async fn query_page(
        &self,
        options: &QueryOptions,
        continuation: Option<ContinuationToken>,
    ) -> StoreResult<Page>;

    /// Submit up to 100 actions on one partition as an atomic transaction
    async fn submit_transaction(
        &self,
        actions: Vec<TransactionAction>,
    ) -> StoreResult<Vec<TransactionResponse>>;

    /// Returns true if the table was created by this call
    async fn create_if_not_exists(&self) -> StoreResult<bool>;

    async fn delete(&self) -> StoreResult<()>;
}

/// Account-level table lifecycle
#[async_trait]
pub trait TableServiceClient: Send + Sync {
    type Table: TableClient;

    fn table_client(&self, name: &str) -> Self::Table;

    /// List tables, optionally filtered on the `TableName` column
    async fn query_tables(&self, filter: Option<&Filter>) -> StoreResult<Vec<TableItem>>;

    /// Create a table; fails with `TableExists` if it is already there
    async fn create_table(&self, name: &str) -> StoreResult<TableItem>;

    async fn delete_table(&self, name: &str) -> StoreResult<()>;
}
