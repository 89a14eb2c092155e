//! Storage error types.

use snafu::Snafu;

/// Errors from the bucket storage layer.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    /// Opening or creating the database failed.
    #[snafu(display("Failed to open database at {path}: {source}"))]
    Open {
        /// Location of the database (`:memory:` for in-memory stores).
        path: String,
        /// The underlying redb error.
        source: redb::DatabaseError,
    },

    /// A read or write against a table failed.
    #[snafu(display("Storage error: {source}"))]
    Storage {
        /// The underlying redb error.
        source: redb::StorageError,
    },

    /// A table could not be opened.
    #[snafu(display("Table error: {source}"))]
    Table {
        /// The underlying redb error.
        source: redb::TableError,
    },

    /// A transaction could not be started.
    #[snafu(display("Transaction error: {source}"))]
    Transaction {
        /// The underlying redb error.
        source: redb::TransactionError,
    },

    /// A write transaction failed to commit.
    #[snafu(display("Commit error: {source}"))]
    Commit {
        /// The underlying redb error.
        source: redb::CommitError,
    },

    /// A write targeted a bucket that does not exist.
    #[snafu(display("bucket not found: {path}"))]
    BucketNotFound {
        /// Display form of the bucket path.
        path: String,
    },

    /// The empty path was used where a bucket is required.
    #[snafu(display("the root is not a bucket"))]
    RootBucket,

    /// A bucket sequence cannot advance further.
    #[snafu(display("sequence exhausted for bucket {path}"))]
    SequenceOverflow {
        /// Display form of the bucket path.
        path: String,
    },
}

/// Result type for storage operations.
pub type Result<T, E = StorageError> = std::result::Result<T, E>;
