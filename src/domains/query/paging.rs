use crate::domains::query::filter::Filter;
use crate::domains::table::repository::TableClient;
use crate::domains::table::types::{ContinuationToken, QueryOptions};
use crate::errors::{DomainResult, StoreError, StoreResult};
use crate::types::Entity;
use futures::stream::{self, Stream};
use log::debug;
use std::future::Future;

/// Cursor over the pages of one query. Page N+1 is only requested after
/// page N has been returned.
pub struct PagedQuery<'a, C: TableClient + ?Sized> {
    client: &'a C,
    options: QueryOptions,
    continuation: Option<ContinuationToken>,
    finished: bool,
    pages_fetched: usize,
}

impl<'a, C: TableClient + ?Sized> PagedQuery<'a, C> {
    pub fn new(client: &'a C, options: QueryOptions) -> Self {
        Self {
            client,
            options,
            continuation: None,
            finished: false,
            pages_fetched: 0,
        }
    }

    /// Next page of entities, or `None` once the query is exhausted
    pub async fn next_page(&mut self) -> StoreResult<Option<Vec<Entity>>> {
        if self.finished {
            return Ok(None);
        }

        let page = self
            .client
            .query_page(&self.options, self.continuation.take())
            .await?;
        self.pages_fetched += 1;
        self.continuation = page.continuation;
        self.finished = self.continuation.is_none();

        debug!(
            "Fetched page {} of '{}' ({} entities)",
            self.pages_fetched,
            self.client.table_name(),
            page.entities.len()
        );
        Ok(Some(page.entities))
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// The remaining pages as a stream; each page is requested on poll
    pub fn into_stream(self) -> impl Stream<Item = StoreResult<Vec<Entity>>> + 'a {
        stream::try_unfold(self, |mut query| async move {
            let page = query.next_page().await?;
            Ok::<_, StoreError>(page.map(|entities| (entities, query)))
        })
    }
}

/// Drain every page into one ordered list
pub async fn collect_all<C>(client: &C, options: QueryOptions) -> DomainResult<Vec<Entity>>
where
    C: TableClient + ?Sized,
{
    let mut query = PagedQuery::new(client, options);
    let mut entities = Vec::new();
    while let Some(page) = query.next_page().await? {
        entities.extend(page);
    }
    Ok(entities)
}

/// First matching entity, requesting pages of one
pub async fn first<C>(client: &C, filter: Option<Filter>) -> DomainResult<Option<Entity>>
where
    C: TableClient + ?Sized,
{
    let options = QueryOptions::new().maybe_filter(filter).page_size(1);
    let mut query = PagedQuery::new(client, options);
    // the service may hand back empty pages that still carry a continuation
    while let Some(page) = query.next_page().await? {
        if let Some(entity) = page.into_iter().next() {
            return Ok(Some(entity));
        }
    }
    Ok(None)
}

/// Run `action` on each page as it arrives, without buffering the result set.
/// Returns the number of entities visited.
pub async fn for_each_page<C, F, Fut>(client: &C, options: QueryOptions, mut action: F) -> DomainResult<usize>
where
    C: TableClient + ?Sized,
    F: FnMut(Vec<Entity>) -> Fut,
    Fut: Future<Output = DomainResult<()>>,
{
    let mut query = PagedQuery::new(client, options);
    let mut visited = 0;
    while let Some(page) = query.next_page().await? {
        visited += page.len();
        action(page).await?;
    }
    Ok(visited)
}
