//! redb storage engine wrapper.
//!
//! Provides a thin wrapper around redb with:
//! - Database lifecycle management (file-backed and in-memory)
//! - Table bootstrap so read transactions never see missing tables
//! - Transaction constructors

use std::{path::Path, sync::Arc};

use redb::{Database, backends::InMemoryBackend};
use snafu::ResultExt;
use tracing::debug;

use crate::{
    error::{CommitSnafu, OpenSnafu, Result, TableSnafu, TransactionSnafu},
    tables::Tables,
    txn::{ReadTxn, WriteTxn},
};

/// Storage engine backed by redb.
///
/// Cheap to clone; clones share the same database handle.
#[derive(Clone)]
pub struct StorageEngine {
    db: Arc<Database>,
}

#[allow(clippy::result_large_err)]
impl StorageEngine {
    /// Open or create a database file at the given path.
    pub fn open(path: impl AsRef<Path>, cache_size_bytes: usize) -> Result<Self> {
        let path = path.as_ref();
        let db = Database::builder()
            .set_cache_size(cache_size_bytes)
            .create(path)
            .context(OpenSnafu { path: path.display().to_string() })?;
        debug!(path = %path.display(), "Opened database");
        Self::bootstrap(db)
    }

    /// Create a new in-memory database.
    pub fn in_memory(cache_size_bytes: usize) -> Result<Self> {
        let db = Database::builder()
            .set_cache_size(cache_size_bytes)
            .create_with_backend(InMemoryBackend::new())
            .context(OpenSnafu { path: ":memory:".to_string() })?;
        Self::bootstrap(db)
    }

    fn bootstrap(db: Database) -> Result<Self> {
        let txn = db.begin_write().context(TransactionSnafu)?;
        {
            txn.open_table(Tables::BUCKETS).context(TableSnafu)?;
            txn.open_table(Tables::SEQUENCES).context(TableSnafu)?;
        }
        txn.commit().context(CommitSnafu)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a snapshot read transaction.
    pub fn begin_read(&self) -> Result<ReadTxn> {
        let txn = self.db.begin_read().context(TransactionSnafu)?;
        Ok(ReadTxn::new(txn))
    }

    /// Begin the write transaction. Blocks while another writer is active.
    pub fn begin_write(&self) -> Result<WriteTxn> {
        let txn = self.db.begin_write().context(TransactionSnafu)?;
        Ok(WriteTxn::new(txn))
    }
}
