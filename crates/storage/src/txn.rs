//! Read and write transactions over nested buckets.
//!
//! Reads are shared by both transaction kinds through [`BucketRead`].
//! Reading from a bucket that does not exist yields nothing; writing into
//! one fails with [`StorageError::BucketNotFound`].

use redb::{ReadTransaction, ReadableTable, WriteTransaction};
use snafu::{ResultExt, ensure};
use tracing::{debug, trace};

use crate::{
    error::{
        BucketNotFoundSnafu, CommitSnafu, Result, RootBucketSnafu, StorageError, StorageSnafu,
        TableSnafu,
    },
    keys::{BucketPath, entry_header_len, entry_key, marker_key},
    tables::Tables,
};

/// A single key/value entry read from a bucket.
pub type Entry = (Vec<u8>, Vec<u8>);

/// Read operations available in every transaction.
#[allow(clippy::result_large_err)]
pub trait BucketRead {
    /// Returns true if the bucket exists.
    fn bucket_exists(&self, path: &BucketPath) -> Result<bool>;

    /// Returns the value stored under `key` in the bucket.
    fn get(&self, path: &BucketPath, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Returns every entry of the bucket whose key starts with `prefix`,
    /// in key order. Keys are returned without the bucket prefix.
    fn scan_prefix(&self, path: &BucketPath, prefix: &[u8]) -> Result<Vec<Entry>>;

    /// Number of entries stored directly in the bucket.
    fn count(&self, path: &BucketPath) -> Result<usize>;

    /// Returns true if the bucket holds neither entries nor child buckets.
    fn is_empty(&self, path: &BucketPath) -> Result<bool>;
}

fn read_exists<T>(table: &T, path: &BucketPath) -> Result<bool>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    if path.is_root() {
        return Ok(false);
    }
    let marker = marker_key(&path.prefix());
    Ok(table.get(marker.as_slice()).context(StorageSnafu)?.is_some())
}

fn read_get<T>(table: &T, path: &BucketPath, key: &[u8]) -> Result<Option<Vec<u8>>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let storage_key = entry_key(&path.prefix(), key);
    Ok(table.get(storage_key.as_slice()).context(StorageSnafu)?.map(|v| v.value().to_vec()))
}

fn read_scan<T>(table: &T, path: &BucketPath, prefix: &[u8]) -> Result<Vec<Entry>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let bucket_prefix = path.prefix();
    let start = entry_key(&bucket_prefix, prefix);
    let header = entry_header_len(&bucket_prefix);
    let mut entries = Vec::new();

    for result in table.range(start.as_slice()..).context(StorageSnafu)? {
        let (key, value) = result.context(StorageSnafu)?;
        let key_bytes = key.value();
        if !key_bytes.starts_with(&start) {
            break;
        }
        entries.push((key_bytes[header..].to_vec(), value.value().to_vec()));
    }

    Ok(entries)
}

fn read_is_empty<T>(table: &T, path: &BucketPath) -> Result<bool>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let prefix = path.prefix();
    let marker = marker_key(&prefix);
    for result in table.range(prefix.as_slice()..).context(StorageSnafu)? {
        let (key, _) = result.context(StorageSnafu)?;
        let key_bytes = key.value();
        if !key_bytes.starts_with(&prefix) {
            break;
        }
        if key_bytes != marker.as_slice() {
            return Ok(false);
        }
    }
    Ok(true)
}

fn read_sequence<T>(table: &T, path: &BucketPath) -> Result<u64>
where
    T: ReadableTable<&'static [u8], u64>,
{
    let prefix = path.prefix();
    Ok(table.get(prefix.as_slice()).context(StorageSnafu)?.map(|v| v.value()).unwrap_or(0))
}

/// Snapshot read transaction.
pub struct ReadTxn {
    txn: ReadTransaction,
}

impl ReadTxn {
    pub(crate) fn new(txn: ReadTransaction) -> Self {
        Self { txn }
    }
}

#[allow(clippy::result_large_err)]
impl BucketRead for ReadTxn {
    fn bucket_exists(&self, path: &BucketPath) -> Result<bool> {
        let table = self.txn.open_table(Tables::BUCKETS).context(TableSnafu)?;
        read_exists(&table, path)
    }

    fn get(&self, path: &BucketPath, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let table = self.txn.open_table(Tables::BUCKETS).context(TableSnafu)?;
        read_get(&table, path, key)
    }

    fn scan_prefix(&self, path: &BucketPath, prefix: &[u8]) -> Result<Vec<Entry>> {
        let table = self.txn.open_table(Tables::BUCKETS).context(TableSnafu)?;
        read_scan(&table, path, prefix)
    }

    fn count(&self, path: &BucketPath) -> Result<usize> {
        Ok(self.scan_prefix(path, &[])?.len())
    }

    fn is_empty(&self, path: &BucketPath) -> Result<bool> {
        let table = self.txn.open_table(Tables::BUCKETS).context(TableSnafu)?;
        read_is_empty(&table, path)
    }
}

/// The single write transaction.
///
/// Dropping it without calling [`WriteTxn::commit`] discards every change.
pub struct WriteTxn {
    txn: WriteTransaction,
}

#[allow(clippy::result_large_err)]
impl WriteTxn {
    pub(crate) fn new(txn: WriteTransaction) -> Self {
        Self { txn }
    }

    /// Creates the bucket, and any missing ancestors, if it does not exist.
    ///
    /// Returns true if the bucket was created.
    pub fn create_bucket_if_not_exists(&mut self, path: &BucketPath) -> Result<bool> {
        ensure!(!path.is_root(), RootBucketSnafu);

        let mut table = self.txn.open_table(Tables::BUCKETS).context(TableSnafu)?;
        let mut created = false;
        for depth in 1..=path.depth() {
            let prefix = encode_prefix(&path.components()[..depth]);
            let marker = marker_key(&prefix);
            if table.get(marker.as_slice()).context(StorageSnafu)?.is_none() {
                table.insert(marker.as_slice(), b"".as_slice()).context(StorageSnafu)?;
                created = true;
            }
        }
        if created {
            debug!(bucket = %path, "Created bucket");
        }
        Ok(created)
    }

    /// Deletes the bucket with all of its entries, children and sequence.
    ///
    /// Returns false if the bucket did not exist.
    pub fn delete_bucket(&mut self, path: &BucketPath) -> Result<bool> {
        ensure!(!path.is_root(), RootBucketSnafu);
        if !self.bucket_exists(path)? {
            return Ok(false);
        }

        let prefix = path.prefix();
        let removed = {
            let mut table = self.txn.open_table(Tables::BUCKETS).context(TableSnafu)?;
            remove_prefixed(&mut table, &prefix)?
        };
        {
            let mut table = self.txn.open_table(Tables::SEQUENCES).context(TableSnafu)?;
            remove_prefixed(&mut table, &prefix)?;
        }
        debug!(bucket = %path, keys = removed, "Deleted bucket");
        Ok(true)
    }

    /// Stores `value` under `key` in an existing bucket.
    pub fn put(&mut self, path: &BucketPath, key: &[u8], value: &[u8]) -> Result<()> {
        self.require_bucket(path)?;
        let storage_key = entry_key(&path.prefix(), key);
        let mut table = self.txn.open_table(Tables::BUCKETS).context(TableSnafu)?;
        table.insert(storage_key.as_slice(), value).context(StorageSnafu)?;
        Ok(())
    }

    /// Removes `key` from the bucket. Returns true if it was present.
    pub fn delete(&mut self, path: &BucketPath, key: &[u8]) -> Result<bool> {
        let storage_key = entry_key(&path.prefix(), key);
        let mut table = self.txn.open_table(Tables::BUCKETS).context(TableSnafu)?;
        let existed = table.remove(storage_key.as_slice()).context(StorageSnafu)?;
        Ok(existed.is_some())
    }

    /// Advances the bucket's sequence and returns the new value.
    ///
    /// The first call on a bucket returns `1`.
    pub fn next_sequence(&mut self, path: &BucketPath) -> Result<u64> {
        self.require_bucket(path)?;
        let prefix = path.prefix();
        let mut table = self.txn.open_table(Tables::SEQUENCES).context(TableSnafu)?;
        let current = read_sequence(&table, path)?;
        let next = current
            .checked_add(1)
            .ok_or_else(|| StorageError::SequenceOverflow { path: path.to_string() })?;
        table.insert(prefix.as_slice(), next).context(StorageSnafu)?;
        trace!(bucket = %path, sequence = next, "Advanced sequence");
        Ok(next)
    }

    /// Commit every change made in this transaction.
    pub fn commit(self) -> Result<()> {
        self.txn.commit().context(CommitSnafu)
    }

    /// Discard every change made in this transaction.
    pub fn abort(self) -> Result<()> {
        self.txn.abort().context(StorageSnafu)
    }

    fn require_bucket(&self, path: &BucketPath) -> Result<()> {
        ensure!(!path.is_root(), RootBucketSnafu);
        ensure!(self.bucket_exists(path)?, BucketNotFoundSnafu { path: path.to_string() });
        Ok(())
    }
}

#[allow(clippy::result_large_err)]
impl BucketRead for WriteTxn {
    fn bucket_exists(&self, path: &BucketPath) -> Result<bool> {
        let table = self.txn.open_table(Tables::BUCKETS).context(TableSnafu)?;
        read_exists(&table, path)
    }

    fn get(&self, path: &BucketPath, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let table = self.txn.open_table(Tables::BUCKETS).context(TableSnafu)?;
        read_get(&table, path, key)
    }

    fn scan_prefix(&self, path: &BucketPath, prefix: &[u8]) -> Result<Vec<Entry>> {
        let table = self.txn.open_table(Tables::BUCKETS).context(TableSnafu)?;
        read_scan(&table, path, prefix)
    }

    fn count(&self, path: &BucketPath) -> Result<usize> {
        Ok(self.scan_prefix(path, &[])?.len())
    }

    fn is_empty(&self, path: &BucketPath) -> Result<bool> {
        let table = self.txn.open_table(Tables::BUCKETS).context(TableSnafu)?;
        read_is_empty(&table, path)
    }
}

fn encode_prefix(components: &[Vec<u8>]) -> Vec<u8> {
    components.iter().fold(BucketPath::root(), |path, c| path.child(c)).prefix()
}

fn remove_prefixed<V>(table: &mut redb::Table<'_, &'static [u8], V>, prefix: &[u8]) -> Result<usize>
where
    V: redb::Value + 'static,
{
    let mut keys = Vec::new();
    for result in table.range(prefix..).context(StorageSnafu)? {
        let (key, _) = result.context(StorageSnafu)?;
        let key_bytes = key.value();
        if !key_bytes.starts_with(prefix) {
            break;
        }
        keys.push(key_bytes.to_vec());
    }
    for key in &keys {
        table.remove(key.as_slice()).context(StorageSnafu)?;
    }
    Ok(keys.len())
}
