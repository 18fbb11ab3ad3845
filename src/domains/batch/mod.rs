pub mod partitioner;
pub mod service;

pub use partitioner::{partition_into_chunks, PartitionChunk};
pub use service::{submit_batched, ChunkResult};
