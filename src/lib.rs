//! Thumbnail and artwork cache for a self-hosted video archive.
//!
//! Remote images are fetched with retries, normalized to 16:9 JPEG, and
//! stored under deterministic cache paths. Bulk jobs backfill missing
//! artwork from the index and embed cached thumbnails into media files.

pub mod artwork_item;
pub mod artwork_store;
pub mod config;
pub mod config_persistence;
pub mod error;
pub mod fallback;
pub mod image_fetcher;
pub mod image_pipeline;
pub mod index;
pub mod jobs;
pub mod metadata;
pub mod protocol;
pub mod validator;
