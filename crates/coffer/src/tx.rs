//! Transactions over registered record types.
//!
//! A [`Tx`] wraps the single engine write transaction. The first failing
//! operation poisons it: the failure is recorded, every later mutating call
//! fails with [`Cause::BadTransaction`] without touching the engine, and the
//! surrounding [`Store::write`](crate::Store::write) rolls back.
//!
//! Reads never poison. They are available on [`Tx`] and on [`ReadTx`],
//! which wraps a snapshot read transaction.

use coffer_storage::{BucketRead, ReadTxn, WriteTxn};
use coffer_types::{Codec, Scalar, bytesort};
use snafu::{OptionExt, ResultExt, ensure};
use tracing::{debug, trace};

use crate::{
    descriptor::StructDescriptor,
    error::{
        Action, Cause, CodecSnafu, DuplicateKeySnafu, Error, ErrorList, IdTypeMismatchSnafu,
        KeyEncodingSnafu, NotFoundSnafu, OverflowSnafu, Result, ShapeMismatchSnafu, StorageSnafu,
    },
    index::{self, IndexKey, PrimaryKey},
    registry::Registry,
    schema::Record,
};

/// A read-write transaction.
///
/// Obtained from [`Store::write`](crate::Store::write).
pub struct Tx<'a> {
    registry: &'a Registry,
    codec: Codec,
    txn: WriteTxn,
    errors: ErrorList,
}

impl<'a> Tx<'a> {
    pub(crate) fn new(registry: &'a Registry, codec: Codec, txn: WriteTxn) -> Self {
        Self { registry, codec, txn, errors: ErrorList::new() }
    }

    pub(crate) fn into_parts(self) -> (WriteTxn, ErrorList) {
        (self.txn, self.errors)
    }

    /// Returns true once any operation in this transaction has failed.
    pub fn is_poisoned(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Failures recorded so far.
    pub fn errors(&self) -> &ErrorList {
        &self.errors
    }

    /// Runs a mutating operation, recording its failure.
    fn guarded<T>(
        &mut self,
        action: Action,
        record: &'static str,
        op: impl FnOnce(&mut Self) -> Result<T, Cause>,
    ) -> Result<T> {
        let result = if self.is_poisoned() { Err(Cause::BadTransaction) } else { op(self) };
        result.map_err(|cause| {
            let error = Error::new(action, Some(record), cause);
            self.errors.push(error.clone());
            error
        })
    }

    /// Stores a new record.
    ///
    /// If the ID auto-increments and is zero, the generated ID is written
    /// back into `record`.
    ///
    /// # Errors
    ///
    /// Fails with [`Cause::DuplicateKey`] if a record with the same ID
    /// exists, or [`Cause::Overflow`] if the generated ID does not fit.
    pub fn insert<R: Record>(&mut self, record: &mut R) -> Result<()> {
        self.guarded(Action::Insert, R::NAME, |tx| tx.insert_record(record))
    }

    /// Replaces an existing record.
    ///
    /// # Errors
    ///
    /// Fails with [`Cause::NotFound`] if no record has this ID.
    pub fn update<R: Record>(&mut self, record: &R) -> Result<()> {
        self.guarded(Action::Update, R::NAME, |tx| tx.update_record(record))
    }

    /// Stores a record, replacing any existing record with the same ID.
    pub fn upsert<R: Record>(&mut self, record: &mut R) -> Result<()> {
        self.guarded(Action::Upsert, R::NAME, |tx| tx.upsert_record(record))
    }

    /// Removes the stored record with the same ID as `record`.
    ///
    /// Deleting a record that does not exist succeeds.
    pub fn delete<R: Record>(&mut self, record: &R) -> Result<()> {
        self.guarded(Action::Delete, R::NAME, |tx| {
            let descriptor = tx.registry.get::<R>()?;
            let id = descriptor.id_value(record)?;
            tx.delete_key(&descriptor, &id)
        })
    }

    /// Removes the stored record with the given ID.
    ///
    /// # Errors
    ///
    /// Fails with [`Cause::IdTypeMismatch`] if `id` has the wrong kind.
    pub fn delete_by_id<R: Record>(&mut self, id: impl Into<Scalar>) -> Result<()> {
        let id = id.into();
        self.guarded(Action::Delete, R::NAME, |tx| {
            let descriptor = tx.registry.get::<R>()?;
            check_id_kind(&descriptor, &id)?;
            tx.delete_key(&descriptor, &id)
        })
    }

    /// Removes every record of type `R`, its index entries and its sequence.
    pub fn truncate<R: Record>(&mut self) -> Result<()> {
        self.guarded(Action::Truncate, R::NAME, |tx| {
            let descriptor = tx.registry.get::<R>()?;
            tx.txn.delete_bucket(descriptor.bucket()).context(StorageSnafu)?;
            for bucket in descriptor.skeleton() {
                tx.txn.create_bucket_if_not_exists(&bucket).context(StorageSnafu)?;
            }
            debug!(record = R::NAME, "Truncated record type");
            Ok(())
        })
    }

    /// Fetches a record by ID. Does not poison the transaction.
    pub fn get<R: Record>(&self, id: impl Into<Scalar>) -> Result<R> {
        get_record(&self.txn, self.registry, self.codec, &id.into())
            .map_err(|cause| Error::new(Action::Get, Some(R::NAME), cause))
    }

    /// Fetches every record whose indexed fields equal `values`.
    ///
    /// `fields` must name the fields of a declared index, in index order.
    /// Does not poison the transaction.
    pub fn find<R: Record>(&self, fields: &[&str], values: &[Scalar]) -> Result<Vec<R>> {
        find_records(&self.txn, self.registry, self.codec, fields, values)
            .map_err(|cause| Error::new(Action::Find, Some(R::NAME), cause))
    }

    /// Number of stored records of type `R`. Does not poison the transaction.
    pub fn count<R: Record>(&self) -> Result<usize> {
        count_records::<R, _>(&self.txn, self.registry)
            .map_err(|cause| Error::new(Action::Count, Some(R::NAME), cause))
    }

    fn insert_record<R: Record>(&mut self, record: &mut R) -> Result<(), Cause> {
        let descriptor = self.registry.get::<R>()?;
        self.auto_increment(&descriptor, record)?;
        let id = descriptor.id_value(record)?;
        let primary_key = self.allocate_key(&descriptor, &id, Action::Insert)?;

        let existing = self.txn.get(descriptor.data_bucket(), &primary_key).context(StorageSnafu)?;
        ensure!(existing.is_none(), DuplicateKeySnafu { id: id.to_string() });

        let payload = self.codec.encode(&*record).context(CodecSnafu)?;
        self.txn.put(descriptor.data_bucket(), &primary_key, &payload).context(StorageSnafu)?;
        self.put_indexes(&descriptor, record, &primary_key)
    }

    fn update_record<R: Record>(&mut self, record: &R) -> Result<(), Cause> {
        let descriptor = self.registry.get::<R>()?;
        let id = descriptor.id_value(record)?;
        let primary_key = resolve_key(&self.txn, &descriptor, &id)?.context(NotFoundSnafu)?;
        let previous = self
            .txn
            .get(descriptor.data_bucket(), &primary_key)
            .context(StorageSnafu)?
            .context(NotFoundSnafu)?;
        let old: R = self.codec.decode(&previous).context(CodecSnafu)?;

        let payload = self.codec.encode(record).context(CodecSnafu)?;
        self.txn.put(descriptor.data_bucket(), &primary_key, &payload).context(StorageSnafu)?;
        self.delete_indexes(&descriptor, &old, &primary_key)?;
        self.put_indexes(&descriptor, record, &primary_key)
    }

    fn upsert_record<R: Record>(&mut self, record: &mut R) -> Result<(), Cause> {
        let descriptor = self.registry.get::<R>()?;
        self.auto_increment(&descriptor, record)?;
        let id = descriptor.id_value(record)?;
        let primary_key = self.allocate_key(&descriptor, &id, Action::Upsert)?;

        if let Some(previous) =
            self.txn.get(descriptor.data_bucket(), &primary_key).context(StorageSnafu)?
        {
            let old: R = self.codec.decode(&previous).context(CodecSnafu)?;
            self.delete_indexes(&descriptor, &old, &primary_key)?;
        }

        let payload = self.codec.encode(&*record).context(CodecSnafu)?;
        self.txn.put(descriptor.data_bucket(), &primary_key, &payload).context(StorageSnafu)?;
        self.put_indexes(&descriptor, record, &primary_key)
    }

    fn delete_key<R: Record>(&mut self, descriptor: &StructDescriptor<R>, id: &Scalar) -> Result<(), Cause> {
        let Some(primary_key) = resolve_key(&self.txn, descriptor, id)? else {
            return Ok(());
        };
        let Some(previous) =
            self.txn.get(descriptor.data_bucket(), &primary_key).context(StorageSnafu)?
        else {
            return Ok(());
        };

        let old: R = self.codec.decode(&previous).context(CodecSnafu)?;
        self.delete_indexes(descriptor, &old, &primary_key)?;
        self.txn.delete(descriptor.data_bucket(), &primary_key).context(StorageSnafu)?;
        Ok(())
    }

    /// Assigns the next sequence value to a zero auto-increment ID.
    fn auto_increment<R: Record>(
        &mut self,
        descriptor: &StructDescriptor<R>,
        record: &mut R,
    ) -> Result<(), Cause> {
        let id = descriptor.id();
        if !id.auto_increment || !descriptor.id_value(record)?.is_zero() {
            return Ok(());
        }
        let sequence = self.txn.next_sequence(descriptor.data_bucket()).context(StorageSnafu)?;
        let value = id.kind.from_sequence(sequence).context(OverflowSnafu { sequence, kind: id.kind })?;
        descriptor.set_id(record, value)
    }

    /// Resolves the primary key for an insert or upsert, allocating a
    /// surrogate key for a non-integer ID seen for the first time.
    fn allocate_key<R: Record>(
        &mut self,
        descriptor: &StructDescriptor<R>,
        id: &Scalar,
        action: Action,
    ) -> Result<PrimaryKey, Cause> {
        let Some(surrogate) = &descriptor.id().surrogate else {
            return bytesort::encode_primary(id).context(KeyEncodingSnafu);
        };

        let key = IndexKey::compute(surrogate, descriptor.index_bucket(surrogate), std::slice::from_ref(id));
        match index::lookup_unique(&self.txn, surrogate, &key)? {
            Some(_) if action == Action::Insert => DuplicateKeySnafu { id: id.to_string() }.fail(),
            Some(primary_key) => Ok(primary_key),
            None => {
                let sequence =
                    self.txn.next_sequence(descriptor.data_bucket()).context(StorageSnafu)?;
                trace!(record = descriptor.full_name(), sequence, "Allocated surrogate key");
                Ok(bytesort::encode_surrogate(sequence))
            },
        }
    }

    fn put_indexes<R: Record>(
        &mut self,
        descriptor: &StructDescriptor<R>,
        record: &R,
        primary_key: &PrimaryKey,
    ) -> Result<(), Cause> {
        for idx in descriptor.indexes() {
            let values = descriptor.index_values(idx, record)?;
            let key = IndexKey::compute(idx, descriptor.index_bucket(idx), &values);
            index::put(&mut self.txn, idx, &key, primary_key)?;
        }
        Ok(())
    }

    fn delete_indexes<R: Record>(
        &mut self,
        descriptor: &StructDescriptor<R>,
        record: &R,
        primary_key: &PrimaryKey,
    ) -> Result<(), Cause> {
        for idx in descriptor.indexes() {
            let values = descriptor.index_values(idx, record)?;
            let key = IndexKey::compute(idx, descriptor.index_bucket(idx), &values);
            index::delete(&mut self.txn, idx, &key, primary_key)?;
        }
        Ok(())
    }
}

/// A read-only snapshot transaction.
///
/// Obtained from [`Store::read`](crate::Store::read).
pub struct ReadTx<'a> {
    registry: &'a Registry,
    codec: Codec,
    txn: ReadTxn,
}

impl<'a> ReadTx<'a> {
    pub(crate) fn new(registry: &'a Registry, codec: Codec, txn: ReadTxn) -> Self {
        Self { registry, codec, txn }
    }

    /// Fetches a record by ID.
    ///
    /// # Errors
    ///
    /// Fails with [`Cause::NotFound`] if no record has this ID, or
    /// [`Cause::IdTypeMismatch`] if `id` has the wrong kind.
    pub fn get<R: Record>(&self, id: impl Into<Scalar>) -> Result<R> {
        get_record(&self.txn, self.registry, self.codec, &id.into())
            .map_err(|cause| Error::new(Action::Get, Some(R::NAME), cause))
    }

    /// Fetches every record whose indexed fields equal `values`.
    pub fn find<R: Record>(&self, fields: &[&str], values: &[Scalar]) -> Result<Vec<R>> {
        find_records(&self.txn, self.registry, self.codec, fields, values)
            .map_err(|cause| Error::new(Action::Find, Some(R::NAME), cause))
    }

    /// Number of stored records of type `R`.
    pub fn count<R: Record>(&self) -> Result<usize> {
        count_records::<R, _>(&self.txn, self.registry)
            .map_err(|cause| Error::new(Action::Count, Some(R::NAME), cause))
    }
}

fn check_id_kind<R: Record>(descriptor: &StructDescriptor<R>, id: &Scalar) -> Result<(), Cause> {
    let expected = descriptor.id().kind;
    ensure!(id.kind() == expected, IdTypeMismatchSnafu { expected, actual: id.kind() });
    Ok(())
}

/// Resolves the primary key of an ID without allocating.
///
/// Returns `None` for a non-integer ID that has no surrogate key yet.
fn resolve_key<R: Record, T: BucketRead>(
    txn: &T,
    descriptor: &StructDescriptor<R>,
    id: &Scalar,
) -> Result<Option<PrimaryKey>, Cause> {
    match &descriptor.id().surrogate {
        None => Ok(Some(bytesort::encode_primary(id).context(KeyEncodingSnafu)?)),
        Some(surrogate) => {
            let key = IndexKey::compute(
                surrogate,
                descriptor.index_bucket(surrogate),
                std::slice::from_ref(id),
            );
            index::lookup_unique(txn, surrogate, &key)
        },
    }
}

fn get_record<R: Record, T: BucketRead>(
    txn: &T,
    registry: &Registry,
    codec: Codec,
    id: &Scalar,
) -> Result<R, Cause> {
    let descriptor = registry.get::<R>()?;
    check_id_kind(&descriptor, id)?;
    let primary_key = resolve_key(txn, &descriptor, id)?.context(NotFoundSnafu)?;
    let bytes = txn
        .get(descriptor.data_bucket(), &primary_key)
        .context(StorageSnafu)?
        .context(NotFoundSnafu)?;
    codec.decode(&bytes).context(CodecSnafu)
}

fn find_records<R: Record, T: BucketRead>(
    txn: &T,
    registry: &Registry,
    codec: Codec,
    fields: &[&str],
    values: &[Scalar],
) -> Result<Vec<R>, Cause> {
    let descriptor = registry.get::<R>()?;
    let idx = descriptor.find_index(fields).ok_or_else(|| Cause::UnknownIndex {
        fields: fields.iter().map(|f| (*f).to_string()).collect(),
    })?;

    ensure!(
        values.len() == idx.fields().len(),
        ShapeMismatchSnafu {
            message: format!(
                "index {:?} has {} field(s), got {} value(s)",
                idx.full_name(),
                idx.fields().len(),
                values.len()
            )
        }
    );
    for (field, value) in idx.fields().iter().zip(values) {
        ensure!(
            field.kind == value.kind(),
            ShapeMismatchSnafu {
                message: format!(
                    "index field {:?} expects {}, got {}",
                    field.name,
                    field.kind,
                    value.kind()
                )
            }
        );
    }

    let key = IndexKey::compute(idx, descriptor.index_bucket(idx), values);
    let mut records = Vec::new();
    for primary_key in index::lookup(txn, idx, &key)? {
        if let Some(bytes) =
            txn.get(descriptor.data_bucket(), &primary_key).context(StorageSnafu)?
        {
            records.push(codec.decode(&bytes).context(CodecSnafu)?);
        }
    }
    Ok(records)
}

fn count_records<R: Record, T: BucketRead>(txn: &T, registry: &Registry) -> Result<usize, Cause> {
    let descriptor = registry.get::<R>()?;
    txn.count(descriptor.data_bucket()).context(StorageSnafu)
}
