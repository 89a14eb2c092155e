//! Registered record types.
//!
//! Descriptors are keyed by [`Record::NAME`] and stored type-erased; lookups
//! downcast back to the requested record type.

use std::{any::Any, collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{descriptor::StructDescriptor, error::Cause, schema::Record};

struct Entry {
    type_name: &'static str,
    descriptor: Arc<dyn Any + Send + Sync>,
}

/// Map from record name to descriptor, shared by every transaction of a store.
#[derive(Default)]
pub struct Registry {
    types: RwLock<HashMap<&'static str, Entry>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a record type with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.read().contains_key(name)
    }

    /// Names of every registered record type, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.types.read().keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Looks up the descriptor of `R`.
    ///
    /// # Errors
    ///
    /// Returns [`Cause::Unregistered`] if no type is registered under
    /// `R::NAME`, or [`Cause::ShapeMismatch`] if a different Rust type was
    /// registered under that name.
    pub fn get<R: Record>(&self) -> Result<Arc<StructDescriptor<R>>, Cause> {
        let types = self.types.read();
        let entry = types
            .get(R::NAME)
            .ok_or_else(|| Cause::Unregistered { name: R::NAME.to_string() })?;
        Arc::clone(&entry.descriptor).downcast::<StructDescriptor<R>>().map_err(|_| {
            Cause::ShapeMismatch {
                message: format!(
                    "expected {}, but {:?} is registered as {}",
                    std::any::type_name::<R>(),
                    R::NAME,
                    entry.type_name
                ),
            }
        })
    }

    /// Records a new descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Cause::AlreadyRegistered`] if the name is taken.
    pub(crate) fn insert<R: Record>(&self, descriptor: Arc<StructDescriptor<R>>) -> Result<(), Cause> {
        let mut types = self.types.write();
        if types.contains_key(R::NAME) {
            return Err(Cause::AlreadyRegistered);
        }
        types.insert(
            R::NAME,
            Entry { type_name: std::any::type_name::<R>(), descriptor },
        );
        Ok(())
    }
}
