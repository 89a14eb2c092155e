//! The store: an engine handle plus the registered record types.

use std::path::Path;

use coffer_storage::{StorageEngine, StorageError, WriteTxn};
use coffer_types::{Codec, StoreConfig};
use snafu::ResultExt;
use tracing::{debug, info, warn};

use crate::{
    descriptor::StructDescriptor,
    error::{Action, Cause, ConfigSnafu, Error, Result, StorageSnafu},
    registry::Registry,
    schema::Record,
    tx::{ReadTx, Tx},
};

/// Typed, indexed record storage over a single database.
///
/// Record types must be [registered](Store::register) before use. All
/// access goes through [`Store::read`] and [`Store::write`].
pub struct Store {
    engine: StorageEngine,
    registry: Registry,
    config: StoreConfig,
}

impl Store {
    /// Opens or creates a file-backed store.
    ///
    /// # Errors
    ///
    /// Fails with [`Cause::Config`] if `config` is invalid, or
    /// [`Cause::Storage`] if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let fail = |cause| Error::new(Action::Open, None, cause);
        config.validate().context(ConfigSnafu).map_err(fail)?;
        let path = path.as_ref();
        let engine =
            StorageEngine::open(path, config.cache_size_bytes).context(StorageSnafu).map_err(fail)?;
        info!(path = %path.display(), codec = ?config.codec, "Opened store");
        Ok(Self::with_engine(engine, config))
    }

    /// Creates a store that lives in memory only.
    pub fn open_in_memory(config: StoreConfig) -> Result<Self> {
        let fail = |cause| Error::new(Action::Open, None, cause);
        config.validate().context(ConfigSnafu).map_err(fail)?;
        let engine =
            StorageEngine::in_memory(config.cache_size_bytes).context(StorageSnafu).map_err(fail)?;
        Ok(Self::with_engine(engine, config))
    }

    fn with_engine(engine: StorageEngine, config: StoreConfig) -> Self {
        Self { engine, registry: Registry::new(), config }
    }

    /// Registers record type `R`.
    ///
    /// Validates its schema and creates its buckets. Registration is per
    /// store handle and must be repeated after reopening.
    ///
    /// # Errors
    ///
    /// Fails with [`Cause::AlreadyRegistered`] if `R::NAME` is taken, or
    /// [`Cause::Schema`] if the schema is invalid.
    pub fn register<R: Record>(&self) -> Result<()> {
        let fail = |cause| Error::new(Action::Register, Some(R::NAME), cause);
        if self.registry.contains(R::NAME) {
            return Err(fail(Cause::AlreadyRegistered));
        }

        let descriptor = StructDescriptor::<R>::build(R::NAME, R::schema()).map_err(fail)?;

        let mut txn = self.engine.begin_write().context(StorageSnafu).map_err(fail)?;
        if let Err(source) = create_buckets(&mut txn, &descriptor.skeleton()) {
            abort(txn);
            return Err(fail(Cause::Storage { source: source.into() }));
        }
        txn.commit().context(StorageSnafu).map_err(fail)?;

        let indexes = descriptor.indexes().len();
        self.registry.insert(descriptor.into()).map_err(fail)?;
        debug!(record = R::NAME, indexes, "Registered record type");
        Ok(())
    }

    /// Returns true if `R` is registered.
    pub fn is_registered<R: Record>(&self) -> bool {
        self.registry.contains(R::NAME)
    }

    /// Names of every registered record type, sorted.
    pub fn registered_names(&self) -> Vec<&'static str> {
        self.registry.names()
    }

    /// Runs `f` against a consistent snapshot.
    pub fn read<T>(&self, f: impl FnOnce(&ReadTx<'_>) -> Result<T>) -> Result<T> {
        let txn = self
            .engine
            .begin_read()
            .context(StorageSnafu)
            .map_err(|cause| Error::new(Action::Read, None, cause))?;
        f(&ReadTx::new(&self.registry, self.config.codec, txn))
    }

    /// Runs `f` in a write transaction.
    ///
    /// Commits if `f` succeeds and no operation inside it failed. Otherwise
    /// rolls back and returns the error from `f`, or the failures the
    /// transaction recorded.
    pub fn write<T>(&self, f: impl FnOnce(&mut Tx<'_>) -> Result<T>) -> Result<T> {
        let fail = |cause| Error::new(Action::Commit, None, cause);
        let txn = self.engine.begin_write().context(StorageSnafu).map_err(fail)?;

        let mut tx = Tx::new(&self.registry, self.config.codec, txn);
        let result = f(&mut tx);
        let (txn, errors) = tx.into_parts();

        match result.and_then(|value| errors.into_result().map(|()| value)) {
            Ok(value) => {
                txn.commit().context(StorageSnafu).map_err(fail)?;
                Ok(value)
            },
            Err(error) => {
                warn!(error = %error, "Rolling back write transaction");
                abort(txn);
                Err(error)
            },
        }
    }

    /// The underlying storage engine.
    pub fn engine(&self) -> &StorageEngine {
        &self.engine
    }

    /// Codec used for record payloads.
    pub fn codec(&self) -> Codec {
        self.config.codec
    }
}

fn create_buckets(
    txn: &mut WriteTxn,
    buckets: &[coffer_storage::BucketPath],
) -> std::result::Result<(), StorageError> {
    for bucket in buckets {
        txn.create_bucket_if_not_exists(bucket)?;
    }
    Ok(())
}

fn abort(txn: WriteTxn) {
    if let Err(error) = txn.abort() {
        warn!(error = %error, "Failed to abort write transaction");
    }
}
