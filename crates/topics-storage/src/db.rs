//! RocksDB wrapper for the topic engine.
//!
//! Provides:
//! - Database open with column family setup
//! - Single-key reads and writes
//! - Atomic multi-key write batches (one upsert call, one batch)
//! - Prefix and time-range scans

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use tracing::info;

use crate::column_families::{build_cf_descriptors, ALL_CF_NAMES};
use crate::error::StorageError;

/// Main storage handle for the topic engine.
///
/// One instance per corpus store; RocksDB enforces single-process access.
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open storage at the given path, creating it if necessary.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening topic store at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(4);

        let cf_descriptors = build_cf_descriptors();
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        Ok(Self { db })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(name.to_string()))
    }

    /// Put a single key.
    pub fn put(&self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(&cf, key, value)?;
        Ok(())
    }

    /// Get a single key.
    pub fn get(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let cf = self.cf(cf_name)?;
        Ok(self.db.get_cf(&cf, key)?)
    }

    /// Delete a single key.
    pub fn delete(&self, cf_name: &str, key: &[u8]) -> Result<(), StorageError> {
        let cf = self.cf(cf_name)?;
        self.db.delete_cf(&cf, key)?;
        Ok(())
    }

    /// Write a batch of puts to one column family atomically.
    ///
    /// This is the commit boundary for upsert calls: either every key in
    /// the batch lands or none does.
    pub fn write_batch(
        &self,
        cf_name: &str,
        entries: &[(Vec<u8>, Vec<u8>)],
    ) -> Result<(), StorageError> {
        if entries.is_empty() {
            return Ok(());
        }
        let cf = self.cf(cf_name)?;
        let mut batch = WriteBatch::default();
        for (key, value) in entries {
            batch.put_cf(&cf, key, value);
        }
        self.db.write(batch)?;
        Ok(())
    }

    /// Collect all (key, value) pairs whose key starts with `prefix`.
    pub fn prefix_scan(
        &self,
        cf_name: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut results = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }
        Ok(results)
    }

    /// Collect all (key, value) pairs in [start, end_exclusive).
    pub fn range_scan(
        &self,
        cf_name: &str,
        start: &[u8],
        end_exclusive: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(start, Direction::Forward));

        let mut results = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if key.as_ref() >= end_exclusive {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }
        Ok(results)
    }

    /// Collect (key, value) pairs whose key starts with `prefix`, newest
    /// key first. Used with time-indexed keys for newest-first reads.
    pub fn prefix_scan_reverse(
        &self,
        cf_name: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        // Seek to just past the prefix, then walk backwards.
        let mut upper = prefix.to_vec();
        upper.push(0xff);

        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&upper, Direction::Reverse));

        let mut results = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }
        Ok(results)
    }

    /// Flush all column families to disk.
    pub fn flush(&self) -> Result<(), StorageError> {
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.flush_cf(&cf)?;
            }
        }
        Ok(())
    }
}
