//! Field annotation parsing.
//!
//! A field's annotation string is a comma-separated list; each entry is
//! split on whitespace:
//!
//! | Annotation              | Meaning                                     |
//! |-------------------------|---------------------------------------------|
//! | `id`                    | primary key field                           |
//! | `inc`                   | auto-increment the primary key              |
//! | `index`                 | single-field secondary index                |
//! | `index <group> <pos>`   | member of a multi-field index at `pos`      |
//!
//! Unknown annotations are ignored.

/// Primary key annotation.
pub const TAG_ID: &str = "id";
/// Auto-increment annotation.
pub const TAG_AUTO_INCREMENT: &str = "inc";
/// Index annotation.
pub const TAG_INDEX: &str = "index";

/// One recognized annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Id,
    AutoIncrement,
    Index,
    /// Membership in a multi-field index. The position is kept verbatim so
    /// that malformed positions can be reported by the schema builder.
    Member { group: String, position: String },
}

/// Parses one field's annotation string.
pub fn parse(raw: &str) -> Vec<Annotation> {
    raw.split(',')
        .filter_map(|entry| {
            let words: Vec<&str> = entry.split_whitespace().collect();
            match words.as_slice() {
                [TAG_ID] => Some(Annotation::Id),
                [TAG_AUTO_INCREMENT] => Some(Annotation::AutoIncrement),
                [TAG_INDEX] => Some(Annotation::Index),
                [TAG_INDEX, group, position] => Some(Annotation::Member {
                    group: (*group).to_string(),
                    position: (*position).to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}

/// Parsed annotations for every field of a record, by field position.
#[derive(Debug, Clone, Default)]
pub struct TagList {
    fields: Vec<Vec<Annotation>>,
}

impl TagList {
    /// Parses the raw annotation strings of all fields, in field order.
    pub fn parse<'a>(raw: impl IntoIterator<Item = &'a str>) -> Self {
        Self { fields: raw.into_iter().map(parse).collect() }
    }

    /// Positions of the fields carrying `annotation`.
    pub fn filter(&self, annotation: &Annotation) -> Vec<usize> {
        (0..self.fields.len()).filter(|&i| self.contains(i, annotation)).collect()
    }

    /// Returns true if the field at `position` carries `annotation`.
    pub fn contains(&self, position: usize, annotation: &Annotation) -> bool {
        self.fields.get(position).is_some_and(|tags| tags.contains(annotation))
    }

    /// Annotations of the field at `position`.
    pub fn field(&self, position: usize) -> &[Annotation] {
        self.fields.get(position).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
