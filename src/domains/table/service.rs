use crate::config::ExtensionsConfig;
use crate::domains::batch::service::{submit_batched, ChunkResult};
use crate::domains::export::service::{export_csv, import_csv};
use crate::domains::export::types::{CsvConfig, ExportStats, ImportReport};
use crate::domains::query::filter::{starts_with, Filter};
use crate::domains::query::paging::{collect_all, first, for_each_page};
use crate::domains::table::repository::{TableClient, TableServiceClient, TABLE_NAME_COLUMN};
use crate::domains::table::types::{QueryOptions, TableItem, TransactionActionType};
use crate::errors::{DomainResult, StoreError};
use crate::globals;
use crate::types::Entity;
use crate::validation::validate_table_name;
use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};

/// Query, batch and CSV operations layered over a [`TableClient`]
pub struct TableExtensions<C: TableClient> {
    client: C,
    config: ExtensionsConfig,
}

impl<C: TableClient> TableExtensions<C> {
    /// Wrap `client` using the process-wide default config
    pub fn new(client: C) -> Self {
        Self::with_config(client, globals::default_config())
    }

    pub fn with_config(client: C, config: ExtensionsConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &ExtensionsConfig {
        &self.config
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    fn query(&self) -> QueryOptions {
        QueryOptions::new().page_size(self.config.page_size)
    }

    pub async fn get_all_entities(&self) -> DomainResult<Vec<Entity>> {
        collect_all(&self.client, self.query()).await
    }

    pub async fn get_all_entities_by_partition_key(&self, partition_key: &str) -> DomainResult<Vec<Entity>> {
        collect_all(&self.client, self.query().filter(Filter::partition_key_eq(partition_key))).await
    }

    /// Every entity with this row key, across all partitions. Scans the table.
    pub async fn get_all_entities_by_row_key(&self, row_key: &str) -> DomainResult<Vec<Entity>> {
        collect_all(&self.client, self.query().filter(Filter::row_key_eq(row_key))).await
    }

    /// Entities whose `column` value starts with `prefix`
    pub async fn get_all_entities_starting_with(&self, column: &str, prefix: &str) -> DomainResult<Vec<Entity>> {
        collect_all(&self.client, self.query().filter(starts_with(column, prefix))).await
    }

    pub async fn get_first_entity(&self) -> DomainResult<Option<Entity>> {
        first(&self.client, None).await
    }

    pub async fn get_first_entity_in_partition(&self, partition_key: &str) -> DomainResult<Option<Entity>> {
        first(&self.client, Some(Filter::partition_key_eq(partition_key))).await
    }

    /// Submit `entities` grouped by partition, at most `batch_size` per
    /// transaction. Returns one result per submitted chunk.
    pub async fn batch_manipulate_entities(
        &self,
        entities: Vec<Entity>,
        action_type: TransactionActionType,
    ) -> DomainResult<Vec<ChunkResult>> {
        submit_batched(&self.client, entities, action_type, self.config.batch_size).await
    }

    /// Write `entities` with `action_type`, [`TransactionActionType::Add`]
    /// being the usual choice
    pub async fn add_entities(
        &self,
        entities: Vec<Entity>,
        action_type: TransactionActionType,
    ) -> DomainResult<Vec<ChunkResult>> {
        let count = entities.len();
        let results = self.batch_manipulate_entities(entities, action_type).await?;
        debug!(
            "Wrote {} entities to '{}' in {} chunk(s)",
            count,
            self.client.table_name(),
            results.len()
        );
        Ok(results)
    }

    /// Delete every entity page by page. Returns the number deleted.
    pub async fn delete_all_entities(&self) -> DomainResult<usize> {
        self.delete_matching(None).await
    }

    pub async fn delete_all_entities_by_partition_key(&self, partition_key: &str) -> DomainResult<usize> {
        self.delete_matching(Some(Filter::partition_key_eq(partition_key))).await
    }

    async fn delete_matching(&self, filter: Option<Filter>) -> DomainResult<usize> {
        let client = &self.client;
        let batch_size = self.config.batch_size;
        // keys are all a delete needs
        let options = self.query().maybe_filter(filter).select(Vec::<String>::new());

        let deleted = for_each_page(client, options, |page| async move {
            submit_batched(client, page, TransactionActionType::Delete, batch_size)
                .await
                .map(|_| ())
        })
        .await?;

        info!("Deleted {} entities from '{}'", deleted, client.table_name());
        Ok(deleted)
    }

    /// Number of entities, optionally limited to one partition
    pub async fn count_entities(&self, partition_key: Option<&str>) -> DomainResult<usize> {
        let options = self
            .query()
            .maybe_filter(partition_key.map(Filter::partition_key_eq))
            .select(Vec::<String>::new());
        for_each_page(&self.client, options, |_| async { Ok(()) }).await
    }

    /// Export the whole table as typed CSV in the default dialect
    pub async fn export_csv<W>(&self, writer: W) -> DomainResult<ExportStats>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.export_csv_with(writer, CsvConfig::default()).await
    }

    pub async fn export_csv_with<W>(&self, writer: W, csv_config: CsvConfig) -> DomainResult<ExportStats>
    where
        W: AsyncWrite + Unpin + Send,
    {
        export_csv(&self.client, &self.config, csv_config, writer).await
    }

    /// Add every row of a typed CSV document to the table
    pub async fn import_csv<R>(&self, reader: R) -> DomainResult<ImportReport>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.import_csv_with(reader, CsvConfig::default()).await
    }

    pub async fn import_csv_with<R>(&self, reader: R, csv_config: CsvConfig) -> DomainResult<ImportReport>
    where
        R: AsyncRead + Unpin + Send,
    {
        import_csv(&self.client, &self.config, csv_config, reader).await
    }
}

/// Table lifecycle helpers over a [`TableServiceClient`]
pub struct TableServiceExtensions<S: TableServiceClient> {
    service: S,
    config: ExtensionsConfig,
}

impl<S: TableServiceClient> TableServiceExtensions<S> {
    pub fn new(service: S) -> Self {
        Self::with_config(service, globals::default_config())
    }

    pub fn with_config(service: S, config: ExtensionsConfig) -> Self {
        Self { service, config }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Extensions for one table, sharing this wrapper's config
    pub fn table(&self, name: &str) -> TableExtensions<S::Table> {
        TableExtensions::with_config(self.service.table_client(name), self.config.clone())
    }

    /// Create `name` unless it exists. Looks the table up first so callers
    /// without create permission can still use existing tables.
    ///
    /// Returns the new table, or `None` if it was already there.
    pub async fn create_table_if_not_exists_safe(&self, name: &str) -> DomainResult<Option<TableItem>> {
        validate_table_name(name)?;

        let filter = Filter::equals(TABLE_NAME_COLUMN, name);
        if !self.service.query_tables(Some(&filter)).await?.is_empty() {
            debug!("Table '{}' already exists", name);
            return Ok(None);
        }

        match self.service.create_table(name).await {
            Ok(item) => {
                info!("Created table '{}'", name);
                Ok(Some(item))
            }
            // created concurrently between the lookup and the create
            Err(StoreError::TableExists(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
