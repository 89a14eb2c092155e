//! Table definitions for redb storage.
//!
//! Every bucket shares the same two tables. Key encoding is handled by the
//! keys module.

use redb::TableDefinition;

/// Table definitions for bucket storage.
pub struct Tables;

impl Tables {
    /// Bucket markers and entries.
    /// Key format: {bucket_prefix}{0x00} for markers,
    /// {bucket_prefix}{0x01}{key} for entries.
    pub const BUCKETS: TableDefinition<'static, &'static [u8], &'static [u8]> =
        TableDefinition::new("buckets");

    /// Per-bucket sequence counters: bucket_prefix → last value handed out.
    pub const SEQUENCES: TableDefinition<'static, &'static [u8], u64> =
        TableDefinition::new("sequences");
}
