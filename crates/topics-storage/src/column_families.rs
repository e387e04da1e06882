//! Column family definitions for RocksDB.
//!
//! Each column family isolates data with different access patterns:
//! - sessions: training session rows plus a start-time index (default compaction)
//! - topics: discovered topic rows keyed by session (default compaction)
//! - mappings: article-to-topic assignments, the high-volume family (Zstd)
//! - leases: advisory training leases, tiny and short-lived (default compaction)

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family for training session rows and their start-time index
pub const CF_SESSIONS: &str = "sessions";

/// Column family for discovered topic rows
pub const CF_TOPICS: &str = "topics";

/// Column family for article-to-topic mappings
pub const CF_MAPPINGS: &str = "mappings";

/// Column family for advisory training leases
pub const CF_LEASES: &str = "leases";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_SESSIONS, CF_TOPICS, CF_MAPPINGS, CF_LEASES];

/// Create column family options for mappings (bulk writes, compressed)
fn mappings_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_SESSIONS, Options::default()),
        ColumnFamilyDescriptor::new(CF_TOPICS, Options::default()),
        ColumnFamilyDescriptor::new(CF_MAPPINGS, mappings_options()),
        ColumnFamilyDescriptor::new(CF_LEASES, Options::default()),
    ]
}
