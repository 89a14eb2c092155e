//! Error types for coffer.
//!
//! Every failure is reported as an [`Error`]: the [`Action`] that was
//! running, the record type involved (if any) and the underlying [`Cause`].
//! A write transaction collects the failures of its operations in an
//! [`ErrorList`]; a non-empty list means the transaction will roll back.

use std::{fmt, sync::Arc};

use coffer_storage::StorageError;
use coffer_types::{CodecError, ConfigError, KeyEncodingError, ScalarKind};
use snafu::Snafu;

/// The operation during which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Open,
    Register,
    Insert,
    Update,
    Upsert,
    Delete,
    Get,
    Find,
    Count,
    Truncate,
    Read,
    Commit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Open => "Open",
            Action::Register => "Register",
            Action::Insert => "Insert",
            Action::Update => "Update",
            Action::Upsert => "Upsert",
            Action::Delete => "Delete",
            Action::Get => "Get",
            Action::Find => "Find",
            Action::Count => "Count",
            Action::Truncate => "Truncate",
            Action::Read => "Read",
            Action::Commit => "Commit",
        };
        f.write_str(name)
    }
}

/// What went wrong.
#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Cause {
    /// The record schema is malformed.
    #[snafu(display("{message}"))]
    Schema {
        /// Description of the schema problem.
        message: String,
    },

    /// The record type was never registered with this store.
    #[snafu(display("unregistered record type {name:?}"))]
    Unregistered {
        /// Name of the record type.
        name: String,
    },

    /// A record type with this name is already registered.
    #[snafu(display("type is already registered"))]
    AlreadyRegistered,

    /// A value does not have the shape the operation expects.
    #[snafu(display("{message}"))]
    ShapeMismatch {
        /// The violated expectation.
        message: String,
    },

    /// No record exists for the given key.
    #[snafu(display("item not found"))]
    NotFound,

    /// An insert collided with an existing primary key.
    #[snafu(display("item with ID {id} already exists"))]
    DuplicateKey {
        /// Display form of the colliding ID.
        id: String,
    },

    /// A unique index already maps the value to a different record.
    #[snafu(display("unique index {index:?} already holds a different item"))]
    UniqueViolation {
        /// Full name of the index.
        index: String,
    },

    /// The caller aborted a write scope.
    #[snafu(display("{message}"))]
    Aborted {
        /// Reason given by the caller.
        message: String,
    },

    /// An earlier operation in the same transaction failed.
    #[snafu(display("abort early: previous error causes transaction rollback"))]
    BadTransaction,

    /// An ID of the wrong kind was supplied.
    #[snafu(display("incompatible type of ID: expected {expected}, got {actual}"))]
    IdTypeMismatch {
        /// Kind of the declared ID field.
        expected: ScalarKind,
        /// Kind of the supplied value.
        actual: ScalarKind,
    },

    /// An auto-increment value does not fit the ID field.
    #[snafu(display("next bucket sequence {sequence} overflows ID field of type {kind}"))]
    Overflow {
        /// The sequence value that did not fit.
        sequence: u64,
        /// Kind of the ID field.
        kind: ScalarKind,
    },

    /// No declared index covers exactly the requested fields.
    #[snafu(display("no index over fields {fields:?}"))]
    UnknownIndex {
        /// The requested field names.
        fields: Vec<String>,
    },

    /// A key could not be encoded or decoded.
    #[snafu(display("key encoding failed: {source}"))]
    KeyEncoding {
        /// The underlying encoder error.
        #[snafu(source(from(KeyEncodingError, Arc::new)))]
        source: Arc<KeyEncodingError>,
    },

    /// A payload could not be serialized or deserialized.
    #[snafu(display("{source}"))]
    Codec {
        /// The underlying codec error.
        #[snafu(source(from(CodecError, Arc::new)))]
        source: Arc<CodecError>,
    },

    /// The storage engine failed.
    #[snafu(display("{source}"))]
    Storage {
        /// The underlying storage error.
        #[snafu(source(from(StorageError, Arc::new)))]
        source: Arc<StorageError>,
    },

    /// The store configuration is invalid.
    #[snafu(display("{source}"))]
    Config {
        /// The underlying validation error.
        #[snafu(source(from(ConfigError, Arc::new)))]
        source: Arc<ConfigError>,
    },

    /// A write transaction was rolled back because several operations failed.
    #[snafu(display("{errors}"))]
    Rollback {
        /// Every failure recorded by the transaction.
        errors: ErrorList,
    },
}

/// A failure with the context it happened in.
#[derive(Debug, Clone)]
pub struct Error {
    action: Action,
    record: Option<&'static str>,
    cause: Cause,
}

impl Error {
    pub(crate) fn new(action: Action, record: Option<&'static str>, cause: Cause) -> Self {
        Self { action, record, cause }
    }

    /// The operation that failed.
    pub fn action(&self) -> Action {
        self.action
    }

    /// Name of the record type involved, if any.
    pub fn record(&self) -> Option<&'static str> {
        self.record
    }

    /// The underlying cause.
    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    /// Builds an error that a [`Store::write`](crate::Store::write) closure
    /// can return to roll back its transaction on purpose.
    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(Action::Commit, None, Cause::Aborted { message: message.into() })
    }

    /// Returns true if the cause is [`Cause::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self.cause, Cause::NotFound)
    }

    /// Returns true if the cause is [`Cause::Aborted`].
    pub fn is_aborted(&self) -> bool {
        matches!(self.cause, Cause::Aborted { .. })
    }

    /// Returns true if the cause is [`Cause::BadTransaction`].
    pub fn is_bad_transaction(&self) -> bool {
        matches!(self.cause, Cause::BadTransaction)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Cause::Rollback { errors } = &self.cause {
            return write!(f, "{errors}");
        }
        match self.record {
            Some(record) => write!(f, "{}: {}: {}", self.action, record, self.cause),
            None => write!(f, "{}: {}", self.action, self.cause),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Failures collected by one write transaction.
#[derive(Debug, Clone, Default)]
pub struct ErrorList {
    errors: Vec<Error>,
}

impl ErrorList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a failure.
    pub fn push(&mut self, error: Error) {
        self.errors.push(error);
    }

    /// Number of recorded failures.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if nothing failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterates over the failures in the order they were recorded.
    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.errors.iter()
    }

    /// Converts the list into a single result.
    ///
    /// A lone failure is returned as itself; several are wrapped in
    /// [`Cause::Rollback`].
    pub fn into_result(mut self) -> Result<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(Error::new(Action::Commit, None, Cause::Rollback { errors: self })),
        }
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [only] = self.errors.as_slice() {
            return write!(f, "{only}");
        }
        writeln!(f, "{} errors occurred:", self.errors.len())?;
        for error in &self.errors {
            writeln!(f, "* {error}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a Error;
    type IntoIter = std::slice::Iter<'a, Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Result type for coffer operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
