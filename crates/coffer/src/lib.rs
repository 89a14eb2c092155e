//! Typed, indexed records over an embedded transactional key-value store.
//!
//! This crate sits on top of the bucketed storage engine
//! (`coffer-storage`) and provides:
//!
//! - Record types declared with a [`Schema`] and annotated through tag strings
//! - Validation of primary keys and secondary indexes at registration time
//! - Insert, update, upsert, delete and lookups inside a single transaction
//! - Auto-incremented integer IDs with overflow detection
//! - Surrogate primary keys for non-integer IDs
//! - Transactions that refuse further writes after the first failure
//!
//! ```
//! use coffer::{Record, Scalar, Schema, Store, StoreConfig};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct User {
//!     id: u32,
//!     name: String,
//! }
//!
//! impl Record for User {
//!     const NAME: &'static str = "app.User";
//!
//!     fn schema() -> Schema<Self> {
//!         Schema::new()
//!             .field("ID", "inc", |u: &User| &u.id, |u: &mut User| &mut u.id)
//!             .field("Name", "index", |u: &User| &u.name, |u: &mut User| &mut u.name)
//!     }
//! }
//!
//! # fn main() -> coffer::Result<()> {
//! let store = Store::open_in_memory(StoreConfig::default())?;
//! store.register::<User>()?;
//!
//! let mut user = User { id: 0, name: "ada".to_string() };
//! store.write(|tx| tx.insert(&mut user))?;
//! assert_eq!(user.id, 1);
//!
//! let found: Vec<User> = store.read(|tx| tx.find(&["Name"], &[Scalar::from("ada")]))?;
//! assert_eq!(found.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod descriptor;
pub mod error;
mod index;
mod registry;
pub mod schema;
mod store;
pub mod tag;
mod tx;

pub use coffer_types::{Codec, Scalar, ScalarKind, ScalarType, StoreConfig};
pub use descriptor::{IdDescriptor, IndexDescriptor, IndexField, StructDescriptor};
pub use error::{Action, Cause, Error, ErrorList, Result};
pub use schema::{FieldKind, Record, Schema};
pub use store::Store;
pub use tx::{ReadTx, Tx};
