pub mod cover_art;
pub mod embedder;

pub use embedder::{EmbedFailure, EmbedPair, EmbedReport, MetadataEmbedder};
