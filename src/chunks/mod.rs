/// Chunk visual cache built from scene words.
pub mod cache;
/// Versioned chunk identity shared with the baker.
pub mod key;
