use crate::config::MAX_BATCH_SIZE;
use crate::domains::batch::partitioner::partition_into_chunks;
use crate::domains::table::repository::TableClient;
use crate::domains::table::types::{TransactionAction, TransactionActionType, TransactionResponse};
use crate::errors::{DomainError, DomainResult};
use crate::types::Entity;
use log::{debug, error, warn};
use serde::Serialize;

/// Outcome of one submitted chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkResult {
    pub partition_key: String,
    pub chunk_index: usize,
    pub responses: Vec<TransactionResponse>,
}

/// Group `entities` by partition key and submit them in chunks of at most
/// `batch_size`, one transaction per chunk, strictly one after another.
/// `batch_size` is clamped to `1..=MAX_BATCH_SIZE`.
///
/// Stops at the first failing chunk. Chunks submitted before it stay applied;
/// the error reports how many there were.
pub async fn submit_batched<C>(
    client: &C,
    entities: Vec<Entity>,
    action_type: TransactionActionType,
    batch_size: usize,
) -> DomainResult<Vec<ChunkResult>>
where
    C: TableClient + ?Sized,
{
    let chunk_size = batch_size.clamp(1, MAX_BATCH_SIZE);
    if chunk_size != batch_size {
        warn!(
            "Batch size {} is outside 1..={}, submitting chunks of {}",
            batch_size, MAX_BATCH_SIZE, chunk_size
        );
    }
    let chunks = partition_into_chunks(entities, |e: &Entity| e.partition_key.as_str(), chunk_size);
    let mut results = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        let size = chunk.items.len();
        let actions = chunk
            .items
            .into_iter()
            .map(|entity| TransactionAction::new(action_type, entity))
            .collect();

        match client.submit_transaction(actions).await {
            Ok(responses) => {
                debug!(
                    "Submitted {} {} action(s) to '{}' partition '{}' (chunk {})",
                    size,
                    action_type.as_str(),
                    client.table_name(),
                    chunk.partition_key,
                    chunk.chunk_index
                );
                results.push(ChunkResult {
                    partition_key: chunk.partition_key,
                    chunk_index: chunk.chunk_index,
                    responses,
                });
            }
            Err(source) => {
                error!(
                    "Transaction for '{}' partition '{}' chunk {} failed after {} applied chunk(s): {}",
                    client.table_name(),
                    chunk.partition_key,
                    chunk.chunk_index,
                    results.len(),
                    source
                );
                return Err(DomainError::BatchFailed {
                    partition_key: chunk.partition_key,
                    chunk_index: chunk.chunk_index,
                    submitted_chunks: results.len(),
                    retry_safe: action_type.is_idempotent(),
                    source,
                });
            }
        }
    }

    Ok(results)
}
