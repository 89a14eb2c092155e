//! Record types and their declared fields.
//!
//! A [`Record`] lists the fields the store must understand in
//! [`Record::schema`]. Scalar fields come with a pair of accessors, captured
//! once when the type is registered, so keys are read and generated IDs are
//! written back without any runtime introspection. Fields that are not
//! listed still travel in the serialized payload.
//!
//! ```
//! use coffer::{Record, Schema};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     id: u32,
//!     email: String,
//!     tags: Vec<String>,
//! }
//!
//! impl Record for User {
//!     const NAME: &'static str = "app.User";
//!
//!     fn schema() -> Schema<Self> {
//!         Schema::new()
//!             .field("ID", "inc", |u: &User| &u.id, |u: &mut User| &mut u.id)
//!             .field("Email", "index", |u: &User| &u.email, |u: &mut User| &mut u.email)
//!             .opaque::<Vec<String>>("Tags", "")
//!     }
//! }
//! ```

use std::sync::Arc;

use coffer_types::{Scalar, ScalarKind, ScalarType};
use serde::{Serialize, de::DeserializeOwned};

/// A type that can be stored.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable, globally unique name, e.g. `"app.User"`. Used as the name of
    /// the type's top-level bucket, so it must not change once data exists.
    const NAME: &'static str;

    /// The fields the store needs to know about.
    fn schema() -> Schema<Self>;
}

/// Reads a field as a scalar.
pub(crate) type Getter<R> = Arc<dyn Fn(&R) -> Scalar + Send + Sync>;

/// Writes a scalar into a field. Returns false if the kinds differ.
pub(crate) type Setter<R> = Arc<dyn Fn(&mut R, Scalar) -> bool + Send + Sync>;

/// The kind of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A field with a byte-sortable encoding.
    Scalar(ScalarKind),
    /// Any other field; carries the Rust type name for error messages.
    Opaque(&'static str),
}

pub(crate) struct FieldDef<R> {
    pub(crate) name: &'static str,
    pub(crate) tags: &'static str,
    pub(crate) kind: FieldKind,
    pub(crate) get: Option<Getter<R>>,
    pub(crate) set: Option<Setter<R>>,
}

/// Declared fields of a record type, in order.
pub struct Schema<R> {
    pub(crate) fields: Vec<FieldDef<R>>,
}

impl<R: 'static> Schema<R> {
    /// An empty schema.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declares a scalar field.
    ///
    /// * `name` - field name; `"ID"` marks the primary key when no field is tagged `id`.
    /// * `tags` - annotation string, see [`crate::tag`].
    #[must_use]
    pub fn field<T: ScalarType>(
        mut self,
        name: &'static str,
        tags: &'static str,
        get: fn(&R) -> &T,
        get_mut: fn(&mut R) -> &mut T,
    ) -> Self {
        let getter: Getter<R> = Arc::new(move |record: &R| get(record).to_scalar());
        let setter: Setter<R> = Arc::new(move |record: &mut R, value: Scalar| {
            match T::from_scalar(value) {
                Some(value) => {
                    *get_mut(record) = value;
                    true
                },
                None => false,
            }
        });
        self.fields.push(FieldDef {
            name,
            tags,
            kind: FieldKind::Scalar(T::KIND),
            get: Some(getter),
            set: Some(setter),
        });
        self
    }

    /// Declares a field without a byte-sortable encoding.
    ///
    /// Such fields cannot be the primary key or part of an index; declaring
    /// them lets registration report that instead of silently ignoring tags.
    #[must_use]
    pub fn opaque<T: ?Sized>(mut self, name: &'static str, tags: &'static str) -> Self {
        self.fields.push(FieldDef {
            name,
            tags,
            kind: FieldKind::Opaque(std::any::type_name::<T>()),
            get: None,
            set: None,
        });
        self
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field was declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Declared field names and kinds, in order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, FieldKind)> + '_ {
        self.fields.iter().map(|f| (f.name, f.kind))
    }
}

impl<R: 'static> Default for Schema<R> {
    fn default() -> Self {
        Self::new()
    }
}
