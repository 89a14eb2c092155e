//! Storage engine for coffer.
//!
//! This crate provides:
//! - redb-based persistent and in-memory storage
//! - Nested named buckets over a flat ordered keyspace
//! - Per-bucket monotonically increasing sequences
//! - Snapshot read transactions and a single write transaction

mod engine;
mod error;
mod keys;
mod tables;
mod txn;

pub use engine::StorageEngine;
pub use error::{Result, StorageError};
pub use keys::BucketPath;
pub use tables::Tables;
pub use txn::{BucketRead, Entry, ReadTxn, WriteTxn};
