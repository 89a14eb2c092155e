//! Secondary index maintenance.
//!
//! An index key is the concatenated byte-sortable encoding of the indexed
//! fields. A string in a non-final position would make the concatenation
//! ambiguous, so it closes a nested bucket instead: the bytes encoded so far
//! name a child bucket and the remaining fields are keyed inside it.
//!
//! Entries:
//! - unique: `key -> primary key`
//! - non-unique: `key ‖ primary key -> empty`

use coffer_storage::{BucketPath, BucketRead, WriteTxn};
use coffer_types::{KeyEncodingError, PRIMARY_KEY_LEN, Scalar, ScalarKind, bytesort};
use snafu::ResultExt;

use crate::{
    descriptor::IndexDescriptor,
    error::{Cause, StorageSnafu},
};

/// A primary key as stored in the data bucket.
pub(crate) type PrimaryKey = [u8; PRIMARY_KEY_LEN];

/// Location of one index entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IndexKey {
    /// The index's own bucket.
    pub(crate) base: BucketPath,
    /// Bucket holding the entry; nested below the index bucket for
    /// string-prefixed keys.
    pub(crate) bucket: BucketPath,
    /// Key inside `bucket`, without the primary key suffix.
    pub(crate) key: Vec<u8>,
}

impl IndexKey {
    /// Computes the entry location for `values` of `index`.
    ///
    /// * `base` - the index's own bucket.
    /// * `values` - one value per index field, in key order.
    pub(crate) fn compute(index: &IndexDescriptor, base: BucketPath, values: &[Scalar]) -> Self {
        let last = index.fields().len().saturating_sub(1);
        let mut bucket = base.clone();
        let mut key = Vec::new();
        for (n, (field, value)) in index.fields().iter().zip(values).enumerate() {
            bytesort::encode_into(value, &mut key);
            if field.kind == ScalarKind::Str && n < last {
                bucket = bucket.child(&key);
                key.clear();
            }
        }
        Self { base, bucket, key }
    }

    fn with_primary_key(&self, primary_key: &PrimaryKey) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.key.len() + PRIMARY_KEY_LEN);
        key.extend_from_slice(&self.key);
        key.extend_from_slice(primary_key);
        key
    }
}

/// Converts stored bytes back into a primary key.
pub(crate) fn primary_key_from(bytes: &[u8]) -> Result<PrimaryKey, Cause> {
    PrimaryKey::try_from(bytes).map_err(|_| Cause::KeyEncoding {
        source: std::sync::Arc::new(KeyEncodingError::Length {
            kind: ScalarKind::U64,
            expected: PRIMARY_KEY_LEN,
            actual: bytes.len(),
        }),
    })
}

/// Adds the entry for `primary_key`.
///
/// # Errors
///
/// Returns [`Cause::UniqueViolation`] if a unique index already maps the key
/// to a different primary key.
pub(crate) fn put(
    txn: &mut WriteTxn,
    index: &IndexDescriptor,
    key: &IndexKey,
    primary_key: &PrimaryKey,
) -> Result<(), Cause> {
    txn.create_bucket_if_not_exists(&key.bucket).context(StorageSnafu)?;

    if index.unique() {
        if let Some(existing) = txn.get(&key.bucket, &key.key).context(StorageSnafu)? {
            if existing.as_slice() != primary_key.as_slice() {
                return Err(Cause::UniqueViolation { index: index.full_name().to_string() });
            }
        }
        txn.put(&key.bucket, &key.key, primary_key).context(StorageSnafu)
    } else {
        txn.put(&key.bucket, &key.with_primary_key(primary_key), &[]).context(StorageSnafu)
    }
}

/// Removes the entry for `primary_key`.
///
/// A missing bucket on the key's path means there is nothing to remove.
/// Nested buckets left without entries or children are deleted, up to but
/// excluding the index's own bucket.
pub(crate) fn delete(
    txn: &mut WriteTxn,
    index: &IndexDescriptor,
    key: &IndexKey,
    primary_key: &PrimaryKey,
) -> Result<(), Cause> {
    if !txn.bucket_exists(&key.bucket).context(StorageSnafu)? {
        return Ok(());
    }

    if index.unique() {
        // Only remove the entry if it still points at this record.
        match txn.get(&key.bucket, &key.key).context(StorageSnafu)? {
            Some(existing) if existing.as_slice() == primary_key.as_slice() => {
                txn.delete(&key.bucket, &key.key).context(StorageSnafu)?;
            },
            _ => {},
        }
    } else {
        txn.delete(&key.bucket, &key.with_primary_key(primary_key)).context(StorageSnafu)?;
    }
    prune(txn, key)
}

fn prune(txn: &mut WriteTxn, key: &IndexKey) -> Result<(), Cause> {
    let mut bucket = key.bucket.clone();
    while bucket != key.base && txn.is_empty(&bucket).context(StorageSnafu)? {
        txn.delete_bucket(&bucket).context(StorageSnafu)?;
        match bucket.parent() {
            Some(parent) => bucket = parent,
            None => break,
        }
    }
    Ok(())
}

/// Returns the primary keys stored under `key`, in primary key order.
pub(crate) fn lookup<T: BucketRead>(
    txn: &T,
    index: &IndexDescriptor,
    key: &IndexKey,
) -> Result<Vec<PrimaryKey>, Cause> {
    if index.unique() {
        return match txn.get(&key.bucket, &key.key).context(StorageSnafu)? {
            Some(bytes) => Ok(vec![primary_key_from(&bytes)?]),
            None => Ok(Vec::new()),
        };
    }

    let entries = txn.scan_prefix(&key.bucket, &key.key).context(StorageSnafu)?;
    let mut keys = Vec::new();
    for (entry, _) in entries {
        // Longer suffixes belong to other values sharing this prefix.
        if entry.len() == key.key.len() + PRIMARY_KEY_LEN {
            keys.push(primary_key_from(&entry[key.key.len()..])?);
        }
    }
    Ok(keys)
}

/// Looks up the surrogate primary key stored for a unique index value.
pub(crate) fn lookup_unique<T: BucketRead>(
    txn: &T,
    index: &IndexDescriptor,
    key: &IndexKey,
) -> Result<Option<PrimaryKey>, Cause> {
    Ok(lookup(txn, index, key)?.into_iter().next())
}
