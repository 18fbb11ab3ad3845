use indexmap::IndexMap;

/// A run of items sharing one partition key, small enough for one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionChunk<T> {
    pub partition_key: String,
    /// Position of this chunk within its partition, starting at 0
    pub chunk_index: usize,
    pub items: Vec<T>,
}

/// Group items by partition key and slice each group into chunks of at most
/// `max_chunk_size`.
///
/// Partitions come out in first-seen order and items keep their relative
/// order inside a partition, so a chunk never straddles two partitions.
/// `max_chunk_size` of 0 is treated as 1.
pub fn partition_into_chunks<T, I, F>(items: I, partition_key: F, max_chunk_size: usize) -> Vec<PartitionChunk<T>>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> &str,
{
    let max_chunk_size = max_chunk_size.max(1);

    let mut groups: IndexMap<String, Vec<T>> = IndexMap::new();
    for item in items {
        let key = partition_key(&item);
        match groups.get_mut(key) {
            Some(group) => group.push(item),
            None => {
                let key = key.to_string();
                groups.insert(key, vec![item]);
            }
        }
    }

    let mut chunks = Vec::new();
    for (key, group) in groups {
        let mut remaining = group.into_iter().peekable();
        let mut chunk_index = 0;
        while remaining.peek().is_some() {
            let items: Vec<T> = remaining.by_ref().take(max_chunk_size).collect();
            chunks.push(PartitionChunk {
                partition_key: key.clone(),
                chunk_index,
                items,
            });
            chunk_index += 1;
        }
    }
    chunks
}
