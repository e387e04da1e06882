//! # topics-storage
//!
//! RocksDB persistence for the article topic-model engine.
//!
//! Provides:
//! - Database open with per-concern column families
//! - The `ModelStore` persistence boundary: upsert-style saves for
//!   training sessions, discovered topics, and article mappings
//! - Time-indexed mapping scans backing drift histograms
//! - An advisory training lease with RAII release
//!
//! No decision logic lives here; readers and writers of the decision
//! layer both go through `ModelStore`.

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;
pub mod lease;
pub mod store;

pub use column_families::{CF_LEASES, CF_MAPPINGS, CF_SESSIONS, CF_TOPICS};
pub use db::Storage;
pub use error::StorageError;
pub use lease::{LeaseGuard, LeaseRecord};
pub use store::ModelStore;
