use crate::config::MAX_PAGE_SIZE;
use crate::domains::query::filter::Filter;
use crate::types::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of write performed for one entity inside a transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionActionType {
    /// Insert; fails if the entity exists
    #[default]
    Add,
    /// Merge properties into an existing entity
    UpdateMerge,
    /// Replace an existing entity
    UpdateReplace,
    /// Delete an existing entity
    Delete,
    /// Insert or merge
    UpsertMerge,
    /// Insert or replace
    UpsertReplace,
}

impl TransactionActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionActionType::Add => "add",
            TransactionActionType::UpdateMerge => "update_merge",
            TransactionActionType::UpdateReplace => "update_replace",
            TransactionActionType::Delete => "delete",
            TransactionActionType::UpsertMerge => "upsert_merge",
            TransactionActionType::UpsertReplace => "upsert_replace",
        }
    }

    /// Whether resubmitting the same action after a failure is harmless
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, TransactionActionType::Add)
    }
}

/// One entity operation inside a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionAction {
    pub action_type: TransactionActionType,
    pub entity: Entity,
}

impl TransactionAction {
    pub fn new(action_type: TransactionActionType, entity: Entity) -> Self {
        Self { action_type, entity }
    }
}

/// Per-action result of a successful transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub status: u16,
    pub etag: Option<String>,
}

/// Opaque cursor to resume a query after the last page returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationToken {
    pub after_partition_key: String,
    pub after_row_key: String,
}

/// One page of query results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub entities: Vec<Entity>,
    pub continuation: Option<ContinuationToken>,
}

/// Query parameters passed to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub filter: Option<Filter>,
    /// Projection; `Some(vec![])` returns keys only
    pub select: Option<Vec<String>>,
    pub page_size: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            filter: None,
            select: None,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn maybe_filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }
}

/// Table listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableItem {
    pub name: String,
    pub created_at: DateTime<Utc>,
}
