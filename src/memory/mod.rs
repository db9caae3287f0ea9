pub mod conversations;
pub mod keywords;
pub mod search;
pub mod service;
pub mod stats;
pub mod store;
pub mod types;

pub use search::{SearchMatch, SearchStage};
pub use service::MemoryService;
pub use store::MemoryStore;

/// Encode an embedding as little-endian `f32` bytes for the BLOB column.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Decode a BLOB written by [`embedding_to_bytes`]. `None` if the length is not a
/// multiple of four.
pub fn bytes_to_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}
