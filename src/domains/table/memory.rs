use crate::config::{MAX_BATCH_SIZE, MAX_PAGE_SIZE};
use crate::domains::query::filter::Filter;
use crate::domains::table::repository::{TableClient, TableServiceClient, TABLE_NAME_COLUMN};
use crate::domains::table::types::*;
use crate::errors::{StoreError, StoreResult};
use crate::types::{Entity, PARTITION_KEY, ROW_KEY};
use crate::validation::{validate_key, validate_table_name};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::RwLock;

type RowKeyPair = (String, String);

/// Record of a committed transaction, kept for inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub table: String,
    pub partition_key: String,
    pub action_count: usize,
}

struct StoredTable {
    created_at: DateTime<Utc>,
    rows: BTreeMap<RowKeyPair, Entity>,
}

#[derive(Default)]
struct StoreState {
    tables: BTreeMap<String, StoredTable>,
    transactions: Vec<TransactionRecord>,
}

/// In-process table store with the service's observable behavior:
/// results ordered by (PartitionKey, RowKey), continuation paging, atomic
/// single-partition transactions, server-assigned Timestamp and etag.
#[derive(Clone, Default)]
pub struct InMemoryTableStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed transactions in submission order
    pub async fn transaction_log(&self) -> Vec<TransactionRecord> {
        self.state.read().await.transactions.clone()
    }

    pub async fn entity_count(&self, table: &str) -> usize {
        self.state
            .read()
            .await
            .tables
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }
}

/// Client for one table of an [`InMemoryTableStore`]
#[derive(Clone)]
pub struct InMemoryTable {
    store: InMemoryTableStore,
    name: String,
}

impl InMemoryTable {
    pub fn store(&self) -> &InMemoryTableStore {
        &self.store
    }
}

fn project(entity: &Entity, select: Option<&[String]>) -> Entity {
    match select {
        None => entity.clone(),
        Some(columns) => {
            let mut projected = entity.key_only();
            for column in columns {
                if let Some(value) = entity.get(column) {
                    projected.insert(column.clone(), value.clone());
                }
            }
            projected
        }
    }
}

fn check_keys(entity: &Entity) -> StoreResult<()> {
    validate_key(PARTITION_KEY, &entity.partition_key).map_err(|e| StoreError::KeyFormatViolation {
        key: entity.partition_key.clone(),
        reason: e.to_string(),
    })?;
    validate_key(ROW_KEY, &entity.row_key).map_err(|e| StoreError::KeyFormatViolation {
        key: entity.row_key.clone(),
        reason: e.to_string(),
    })?;
    Ok(())
}

/// Stateless checks: size, keys, single partition, unique rows
fn check_batch_shape(actions: &[TransactionAction]) -> StoreResult<()> {
    let first = actions
        .first()
        .ok_or_else(|| StoreError::InvalidBatch("transaction contains no actions".to_string()))?;

    if actions.len() > MAX_BATCH_SIZE {
        return Err(StoreError::InvalidBatch(format!(
            "transaction contains {} actions, the limit is {}",
            actions.len(),
            MAX_BATCH_SIZE
        )));
    }

    let mut row_keys = HashSet::with_capacity(actions.len());
    for action in actions {
        check_keys(&action.entity)?;
        if action.entity.partition_key != first.entity.partition_key {
            return Err(StoreError::InvalidBatch(format!(
                "transaction spans partitions '{}' and '{}'",
                first.entity.partition_key, action.entity.partition_key
            )));
        }
        if !row_keys.insert(action.entity.row_key.as_str()) {
            return Err(StoreError::InvalidBatch(format!(
                "row key '{}' appears more than once",
                action.entity.row_key
            )));
        }
    }
    Ok(())
}

fn make_etag(timestamp: &DateTime<Utc>) -> String {
    format!("W/\"datetime'{}'\"", timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

#[async_trait]
impl TableClient for InMemoryTable {
    fn table_name(&self) -> &str {
        &self.name
    }

    async fn query_page(
        &self,
        options: &QueryOptions,
        continuation: Option<ContinuationToken>,
    ) -> StoreResult<Page> {
        let state = self.store.state.read().await;
        let table = state
            .tables
            .get(&self.name)
            .ok_or_else(|| StoreError::TableNotFound(self.name.clone()))?;

        let start = match continuation {
            Some(token) => Bound::Excluded((token.after_partition_key, token.after_row_key)),
            None => Bound::Unbounded,
        };
        let page_size = options.page_size.clamp(1, MAX_PAGE_SIZE);

        let mut matching = table
            .rows
            .range((start, Bound::Unbounded))
            .map(|(_, entity)| entity)
            .filter(|entity| options.filter.as_ref().map_or(true, |f| f.matches(entity)));

        let entities: Vec<Entity> = matching
            .by_ref()
            .take(page_size)
            .map(|entity| project(entity, options.select.as_deref()))
            .collect();

        let has_more = entities.len() == page_size && matching.next().is_some();
        let continuation = match entities.last() {
            Some(last) if has_more => Some(ContinuationToken {
                after_partition_key: last.partition_key.clone(),
                after_row_key: last.row_key.clone(),
            }),
            _ => None,
        };

        debug!(
            "Table '{}' returned page of {} entities (more: {})",
            self.name,
            entities.len(),
            continuation.is_some()
        );
        Ok(Page { entities, continuation })
    }

    async fn submit_transaction(
        &self,
        actions: Vec<TransactionAction>,
    ) -> StoreResult<Vec<TransactionResponse>> {
        check_batch_shape(&actions)?;

        let mut guard = self.store.state.write().await;
        let state = &mut *guard;
        let table = state
            .tables
            .get_mut(&self.name)
            .ok_or_else(|| StoreError::TableNotFound(self.name.clone()))?;

        // Nothing is applied unless every action can be
        for (index, action) in actions.iter().enumerate() {
            let key = (action.entity.partition_key.clone(), action.entity.row_key.clone());
            let exists = table.rows.contains_key(&key);
            let failure = match action.action_type {
                TransactionActionType::Add if exists => Some(StoreError::EntityExists {
                    partition_key: key.0,
                    row_key: key.1,
                }),
                TransactionActionType::UpdateMerge
                | TransactionActionType::UpdateReplace
                | TransactionActionType::Delete
                    if !exists =>
                {
                    Some(StoreError::NotFound {
                        partition_key: key.0,
                        row_key: key.1,
                    })
                }
                _ => None,
            };
            if let Some(err) = failure {
                return Err(StoreError::Transaction {
                    index,
                    reason: err.to_string(),
                });
            }
        }

        let now = Utc::now();
        let etag = make_etag(&now);
        let partition_key = actions[0].entity.partition_key.clone();
        let action_count = actions.len();
        let mut responses = Vec::with_capacity(action_count);

        for action in actions {
            let key = (action.entity.partition_key.clone(), action.entity.row_key.clone());
            let mut entity = action.entity;
            entity.timestamp = Some(now);
            entity.etag = Some(etag.clone());

            match action.action_type {
                TransactionActionType::Delete => {
                    table.rows.remove(&key);
                    responses.push(TransactionResponse { status: 204, etag: None });
                    continue;
                }
                TransactionActionType::UpdateMerge | TransactionActionType::UpsertMerge => {
                    if let Some(existing) = table.rows.get_mut(&key) {
                        for (name, value) in entity.properties() {
                            existing.insert(name.clone(), value.clone());
                        }
                        existing.timestamp = entity.timestamp;
                        existing.etag = entity.etag.clone();
                    } else {
                        table.rows.insert(key, entity);
                    }
                }
                TransactionActionType::Add
                | TransactionActionType::UpdateReplace
                | TransactionActionType::UpsertReplace => {
                    table.rows.insert(key, entity);
                }
            }

            let status = if action.action_type == TransactionActionType::Add { 201 } else { 204 };
            responses.push(TransactionResponse {
                status,
                etag: Some(etag.clone()),
            });
        }

        state.transactions.push(TransactionRecord {
            table: self.name.clone(),
            partition_key,
            action_count,
        });
        Ok(responses)
    }

    async fn create_if_not_exists(&self) -> StoreResult<bool> {
        validate_table_name(&self.name).map_err(|e| StoreError::Other(e.to_string()))?;
        let mut state = self.store.state.write().await;
        if state.tables.contains_key(&self.name) {
            return Ok(false);
        }
        state.tables.insert(
            self.name.clone(),
            StoredTable {
                created_at: Utc::now(),
                rows: BTreeMap::new(),
            },
        );
        Ok(true)
    }

    async fn delete(&self) -> StoreResult<()> {
        self.store.state.write().await.tables.remove(&self.name);
        Ok(())
    }
}

#[async_trait]
impl TableServiceClient for InMemoryTableStore {
    type Table = InMemoryTable;

    fn table_client(&self, name: &str) -> InMemoryTable {
        InMemoryTable {
            store: self.clone(),
            name: name.to_string(),
        }
    }

    async fn query_tables(&self, filter: Option<&Filter>) -> StoreResult<Vec<TableItem>> {
        let state = self.state.read().await;
        Ok(state
            .tables
            .iter()
            .filter(|(name, _)| {
                filter.map_or(true, |f| {
                    f.matches_with(&|column: &str| (column == TABLE_NAME_COLUMN).then(|| name.to_string()))
                })
            })
            .map(|(name, table)| TableItem {
                name: name.clone(),
                created_at: table.created_at,
            })
            .collect())
    }

    async fn create_table(&self, name: &str) -> StoreResult<TableItem> {
        validate_table_name(name).map_err(|e| StoreError::Other(e.to_string()))?;
        let mut state = self.state.write().await;
        if state.tables.contains_key(name) {
            return Err(StoreError::TableExists(name.to_string()));
        }
        let created_at = Utc::now();
        state.tables.insert(
            name.to_string(),
            StoredTable {
                created_at,
                rows: BTreeMap::new(),
            },
        );
        Ok(TableItem {
            name: name.to_string(),
            created_at,
        })
    }

    async fn delete_table(&self, name: &str) -> StoreResult<()> {
        match self.state.write().await.tables.remove(name) {
            Some(_) => Ok(()),
            None => Err(StoreError::TableNotFound(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table() -> InMemoryTable {
        let store = InMemoryTableStore::new();
        let table = store.table_client("testtable");
        table.create_if_not_exists().await.unwrap();
        table
    }

    fn adds(partition_key: &str, count: usize) -> Vec<TransactionAction> {
        (0..count)
            .map(|i| TransactionAction::new(TransactionActionType::Add, Entity::new(partition_key, format!("{:04}", i))))
            .collect()
    }

    #[tokio::test]
    async fn test_add_assigns_timestamp_and_etag() {
        let table = table().await;
        let responses = table.submit_transaction(adds("p", 2)).await.unwrap();
        assert_eq!(responses.len(), 2);
        assert!(responses.iter().all(|r| r.status == 201 && r.etag.is_some()));

        let page = table.query_page(&QueryOptions::new(), None).await.unwrap();
        assert_eq!(page.entities.len(), 2);
        assert!(page.entities[0].timestamp.is_some());
        assert!(page.entities[0].etag.is_some());
    }

    #[tokio::test]
    async fn test_transaction_is_atomic() {
        let table = table().await;
        table.submit_transaction(adds("p", 1)).await.unwrap();

        // second action collides with the existing row 0000
        let mut actions = vec![TransactionAction::new(TransactionActionType::Add, Entity::new("p", "zzz"))];
        actions.extend(adds("p", 1));
        let err = table.submit_transaction(actions).await.unwrap_err();
        assert!(matches!(err, StoreError::Transaction { index: 1, .. }));
        assert_eq!(table.store().entity_count("testtable").await, 1);
    }

    #[tokio::test]
    async fn test_rejects_invalid_batches() {
        let table = table().await;
        assert!(matches!(table.submit_transaction(vec![]).await, Err(StoreError::InvalidBatch(_))));
        assert!(matches!(table.submit_transaction(adds("p", 101)).await, Err(StoreError::InvalidBatch(_))));

        let mut mixed = adds("a", 1);
        mixed.extend(adds("b", 1));
        assert!(matches!(table.submit_transaction(mixed).await, Err(StoreError::InvalidBatch(_))));

        let bad_key = vec![TransactionAction::new(TransactionActionType::Add, Entity::new("p", "a/b"))];
        assert!(matches!(
            table.submit_transaction(bad_key).await,
            Err(StoreError::KeyFormatViolation { .. })
        ));

        let missing_key = vec![TransactionAction::new(TransactionActionType::Add, Entity::new("p", ""))];
        assert!(matches!(
            table.submit_transaction(missing_key).await,
            Err(StoreError::KeyFormatViolation { .. })
        ));
        assert!(table.store().transaction_log().await.is_empty());
    }

    #[tokio::test]
    async fn test_paging_with_continuation() {
        let table = table().await;
        table.submit_transaction(adds("p", 25)).await.unwrap();

        let options = QueryOptions::new().page_size(10);
        let first = table.query_page(&options, None).await.unwrap();
        assert_eq!(first.entities.len(), 10);
        let second = table.query_page(&options, first.continuation.clone()).await.unwrap();
        assert_eq!(second.entities[0].row_key, "0010");
        let third = table.query_page(&options, second.continuation.clone()).await.unwrap();
        assert_eq!(third.entities.len(), 5);
        assert!(third.continuation.is_none());
    }

    #[tokio::test]
    async fn test_exact_page_has_no_continuation() {
        let table = table().await;
        table.submit_transaction(adds("p", 10)).await.unwrap();
        let page = table.query_page(&QueryOptions::new().page_size(10), None).await.unwrap();
        assert_eq!(page.entities.len(), 10);
        assert!(page.continuation.is_none());
    }

    #[tokio::test]
    async fn test_merge_and_projection() {
        let table = table().await;
        let entity = Entity::new("p", "r").with("a", 1i32).with("b", "x");
        table
            .submit_transaction(vec![TransactionAction::new(TransactionActionType::Add, entity)])
            .await
            .unwrap();
        table
            .submit_transaction(vec![TransactionAction::new(
                TransactionActionType::UpsertMerge,
                Entity::new("p", "r").with("c", true),
            )])
            .await
            .unwrap();

        let full = table.query_page(&QueryOptions::new(), None).await.unwrap();
        assert_eq!(full.entities[0].property_count(), 3);

        let keys = table.query_page(&QueryOptions::new().select(Vec::<String>::new()), None).await.unwrap();
        assert_eq!(keys.entities[0].property_count(), 0);
        assert_eq!(keys.entities[0].row_key, "r");
    }

    #[tokio::test]
    async fn test_table_lifecycle() {
        let store = InMemoryTableStore::new();
        store.create_table("alpha").await.unwrap();
        store.create_table("beta").await.unwrap();
        assert!(matches!(store.create_table("alpha").await, Err(StoreError::TableExists(_))));
        assert!(store.create_table("x").await.is_err());

        let filter = Filter::equals(TABLE_NAME_COLUMN, "beta");
        let tables = store.query_tables(Some(&filter)).await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "beta");
        assert_eq!(store.query_tables(None).await.unwrap().len(), 2);

        store.delete_table("beta").await.unwrap();
        assert!(matches!(store.delete_table("beta").await, Err(StoreError::TableNotFound(_))));
    }

    #[tokio::test]
    async fn test_query_missing_table() {
        let store = InMemoryTableStore::new();
        let table = store.table_client("missing");
        assert!(matches!(
            table.query_page(&QueryOptions::new(), None).await,
            Err(StoreError::TableNotFound(_))
        ));
    }
}
