//! Schema descriptors.
//!
//! A [`StructDescriptor`] is built once per record type at registration and
//! never changes afterwards. It names the type's buckets, locates the
//! primary key field and lists every index to maintain.
//!
//! Bucket layout for a record type:
//!
//! ```text
//! <NAME>/
//!   data/                 primary key -> payload
//!   index/
//!     <index full name>/  unique:     key -> primary key
//!                         non-unique: key ‖ primary key -> empty
//! ```

use std::collections::BTreeMap;

use coffer_storage::BucketPath;
use coffer_types::{Scalar, ScalarKind};

use crate::{
    error::Cause,
    schema::{FieldDef, FieldKind, Getter, Schema, Setter},
    tag::{Annotation, TAG_ID, TagList},
};

const BUCKET_DATA: &str = "data";
const BUCKET_INDEX: &str = "index";
const IMPLICIT_ID_NAME: &str = "ID";

/// A field that is part of an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexField {
    /// Position of the field in the record's schema.
    pub position: usize,
    /// Kind of the field.
    pub kind: ScalarKind,
    /// Name of the field.
    pub name: &'static str,
}

/// A secondary index over one or more fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    full_name: String,
    unique: bool,
    fields: Vec<IndexField>,
}

impl IndexDescriptor {
    fn new(unique: bool, fields: Vec<IndexField>) -> Self {
        let mut full_name = String::from(if unique { "u" } else { "i" });
        for field in &fields {
            full_name.push_str(&format!(",{} {}", field.kind, field.name));
        }
        Self { full_name, unique, fields }
    }

    /// Bucket name of the index, e.g. `i,string Name`.
    ///
    /// Depends only on uniqueness and the ordered field kinds and names.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Returns true if each key maps to at most one record.
    pub fn unique(&self) -> bool {
        self.unique
    }

    /// Indexed fields in key order.
    pub fn fields(&self) -> &[IndexField] {
        &self.fields
    }

    /// Returns true if the index covers exactly these fields, in order.
    pub fn covers(&self, names: &[&str]) -> bool {
        self.fields.len() == names.len() && self.fields.iter().zip(names).all(|(f, n)| f.name == *n)
    }
}

/// The primary key field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdDescriptor {
    /// Position of the field in the record's schema.
    pub position: usize,
    /// Name of the field.
    pub name: &'static str,
    /// Kind of the field.
    pub kind: ScalarKind,
    /// Zero-valued IDs are replaced by the next sequence value.
    pub auto_increment: bool,
    /// Hidden unique index mapping non-integer IDs to surrogate keys.
    pub surrogate: Option<IndexDescriptor>,
}

/// Everything the store knows about one record type.
pub struct StructDescriptor<R> {
    full_name: &'static str,
    id: IdDescriptor,
    indexes: Vec<IndexDescriptor>,
    fields: Vec<FieldDef<R>>,
    bucket: BucketPath,
    data_bucket: BucketPath,
    index_bucket: BucketPath,
}

impl<R> std::fmt::Debug for StructDescriptor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructDescriptor")
            .field("full_name", &self.full_name)
            .field("id", &self.id)
            .field("indexes", &self.indexes)
            .finish_non_exhaustive()
    }
}

fn schema_error(message: impl Into<String>) -> Cause {
    Cause::Schema { message: message.into() }
}

impl<R: 'static> StructDescriptor<R> {
    /// Validates a schema and builds the descriptor for it.
    ///
    /// # Errors
    ///
    /// Returns [`Cause::Schema`] if the ID field is missing, ambiguous or not
    /// byte encodable, if `inc` is used on a non-integer ID, or if an index
    /// is malformed.
    pub fn build(full_name: &'static str, schema: Schema<R>) -> Result<Self, Cause> {
        let fields = schema.fields;
        let tags = TagList::parse(fields.iter().map(|f| f.tags));

        let id = Self::build_id(&fields, &tags)?;
        let mut indexes = Self::build_indexes(&fields, &tags)?;

        let id = if id.kind.is_integer() {
            id
        } else {
            let surrogate = IndexDescriptor::new(
                true,
                vec![IndexField { position: id.position, kind: id.kind, name: id.name }],
            );
            indexes.push(surrogate.clone());
            IdDescriptor { surrogate: Some(surrogate), ..id }
        };

        let bucket = BucketPath::new(full_name);
        let data_bucket = bucket.child(BUCKET_DATA);
        let index_bucket = bucket.child(BUCKET_INDEX);
        Ok(Self { full_name, id, indexes, fields, bucket, data_bucket, index_bucket })
    }

    fn build_id(fields: &[FieldDef<R>], tags: &TagList) -> Result<IdDescriptor, Cause> {
        let tagged = tags.filter(&Annotation::Id);
        let position = match tagged.as_slice() {
            [position] => *position,
            [] => fields.iter().position(|f| f.name == IMPLICIT_ID_NAME).ok_or_else(|| {
                schema_error(format!(
                    "unable to find ID field: field has to be named {IMPLICIT_ID_NAME:?} or tagged with {TAG_ID:?}"
                ))
            })?,
            _ => {
                return Err(schema_error(format!("must not have multiple fields with tag {TAG_ID:?}")));
            },
        };

        let field = &fields[position];
        let kind = match field.kind {
            FieldKind::Scalar(kind) => kind,
            FieldKind::Opaque(type_name) => {
                return Err(schema_error(format!(
                    "ID field {:?} is not byte encodable: no key encoding for {type_name}",
                    field.name
                )));
            },
        };

        let auto_increment = tags.contains(position, &Annotation::AutoIncrement);
        if auto_increment && !kind.is_integer() {
            return Err(schema_error(format!("autoincremented IDs must be integer, got {kind}")));
        }

        Ok(IdDescriptor { position, name: field.name, kind, auto_increment, surrogate: None })
    }

    fn build_indexes(fields: &[FieldDef<R>], tags: &TagList) -> Result<Vec<IndexDescriptor>, Cause> {
        let mut indexes = Vec::new();
        let mut groups: BTreeMap<&str, BTreeMap<usize, usize>> = BTreeMap::new();

        for (position, field) in fields.iter().enumerate() {
            for annotation in tags.field(position) {
                match annotation {
                    Annotation::Index => {
                        let kind = index_kind(field)?;
                        indexes.push(IndexDescriptor::new(
                            false,
                            vec![IndexField { position, kind, name: field.name }],
                        ));
                    },
                    Annotation::Member { group, position: raw } => {
                        let order: usize = raw.parse().map_err(|_| {
                            schema_error(format!(
                                "index {group:?}: field {:?} has invalid position {raw:?}",
                                field.name
                            ))
                        })?;
                        let members = groups.entry(group.as_str()).or_default();
                        if members.insert(order, position).is_some() {
                            return Err(schema_error(format!(
                                "index {group:?} has more than one field at position {order}"
                            )));
                        }
                    },
                    Annotation::Id | Annotation::AutoIncrement => {},
                }
            }
        }

        for (group, members) in groups {
            let count = members.len();
            let mut index_fields = Vec::with_capacity(count);
            for order in 0..count {
                let position = *members.get(&order).ok_or_else(|| {
                    schema_error(format!(
                        "index {group:?} has {count} field(s) and its field order must be 0..{}: field {order} is missing",
                        count - 1
                    ))
                })?;
                let field = &fields[position];
                index_fields.push(IndexField { position, kind: index_kind(field)?, name: field.name });
            }
            indexes.push(IndexDescriptor::new(false, index_fields));
        }

        Ok(indexes)
    }
}

fn index_kind<R>(field: &FieldDef<R>) -> Result<ScalarKind, Cause> {
    match field.kind {
        FieldKind::Scalar(kind) => Ok(kind),
        FieldKind::Opaque(type_name) => Err(schema_error(format!(
            "index field {:?} is not byte encodable: no key encoding for {type_name}",
            field.name
        ))),
    }
}

impl<R> StructDescriptor<R> {
    /// The record type's name, also its top-level bucket name.
    pub fn full_name(&self) -> &'static str {
        self.full_name
    }

    /// The primary key field.
    pub fn id(&self) -> &IdDescriptor {
        &self.id
    }

    /// Every maintained index, including the hidden surrogate index.
    pub fn indexes(&self) -> &[IndexDescriptor] {
        &self.indexes
    }

    /// The first index covering exactly `names`, in order.
    pub fn find_index(&self, names: &[&str]) -> Option<&IndexDescriptor> {
        self.indexes.iter().find(|index| index.covers(names))
    }

    /// Top-level bucket.
    pub fn bucket(&self) -> &BucketPath {
        &self.bucket
    }

    /// Bucket holding the serialized records.
    pub fn data_bucket(&self) -> &BucketPath {
        &self.data_bucket
    }

    /// Bucket holding the entries of one index.
    pub fn index_bucket(&self, index: &IndexDescriptor) -> BucketPath {
        self.index_bucket.child(index.full_name())
    }

    /// Every bucket that must exist for an empty record type.
    pub fn skeleton(&self) -> Vec<BucketPath> {
        let mut buckets = vec![self.bucket.clone(), self.data_bucket.clone(), self.index_bucket.clone()];
        buckets.extend(self.indexes.iter().map(|index| self.index_bucket(index)));
        buckets
    }

    /// Reads the scalar field at `position`.
    pub(crate) fn value(&self, record: &R, position: usize) -> Result<Scalar, Cause> {
        let get: &Getter<R> = self
            .fields
            .get(position)
            .and_then(|f| f.get.as_ref())
            .ok_or_else(|| Cause::ShapeMismatch {
                message: format!("field at position {position} of {} is not a scalar", self.full_name),
            })?;
        Ok(get(record))
    }

    /// Reads the primary key field.
    pub(crate) fn id_value(&self, record: &R) -> Result<Scalar, Cause> {
        self.value(record, self.id.position)
    }

    /// Writes the primary key field.
    pub(crate) fn set_id(&self, record: &mut R, value: Scalar) -> Result<(), Cause> {
        let kind = value.kind();
        let set: &Setter<R> = self
            .fields
            .get(self.id.position)
            .and_then(|f| f.set.as_ref())
            .ok_or_else(|| Cause::ShapeMismatch {
                message: format!("ID field {:?} is not writable", self.id.name),
            })?;
        if set(record, value) {
            Ok(())
        } else {
            Err(Cause::IdTypeMismatch { expected: self.id.kind, actual: kind })
        }
    }

    /// Reads the fields of `index` in key order.
    pub(crate) fn index_values(&self, index: &IndexDescriptor, record: &R) -> Result<Vec<Scalar>, Cause> {
        index.fields.iter().map(|field| self.value(record, field.position)).collect()
    }
}
