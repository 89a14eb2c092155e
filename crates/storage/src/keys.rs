//! Key encoding for nested buckets.
//!
//! A bucket is identified by its path from the top level. Each path
//! component is encoded as:
//!
//! ```text
//! {0x02}{escaped name}{0x00 0x01}
//! ```
//!
//! where escaping turns every `0x00` in the name into `0x00 0xFF`. Components
//! are therefore self-delimiting and one bucket's prefix is never a prefix
//! of an unrelated bucket. Under a bucket prefix `P`:
//!
//! - `P 0x00` marks that the bucket exists
//! - `P 0x01 key` stores an entry
//! - `P 0x02 ...` belongs to child buckets
//!
//! Deleting a bucket removes every key that starts with `P`.

use std::fmt;

const TAG_MARKER: u8 = 0x00;
const TAG_ENTRY: u8 = 0x01;
const TAG_CHILD: u8 = 0x02;
const ESCAPE: u8 = 0xFF;
const TERMINATOR: [u8; 2] = [0x00, 0x01];

/// Path of a (possibly nested) bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BucketPath {
    components: Vec<Vec<u8>>,
}

impl BucketPath {
    /// Path of a top-level bucket.
    pub fn new(name: impl AsRef<[u8]>) -> Self {
        Self { components: vec![name.as_ref().to_vec()] }
    }

    /// The empty path. Not a bucket itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns this path extended by one child component.
    #[must_use]
    pub fn child(&self, name: impl AsRef<[u8]>) -> Self {
        let mut components = self.components.clone();
        components.push(name.as_ref().to_vec());
        Self { components }
    }

    /// Returns the parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.components.split_last()?;
        Some(Self { components: rest.to_vec() })
    }

    /// Returns true for the empty path.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Number of components.
    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Path components, top level first.
    pub fn components(&self) -> &[Vec<u8>] {
        &self.components
    }

    /// Encoded prefix shared by every key belonging to this bucket.
    pub(crate) fn prefix(&self) -> Vec<u8> {
        let len = self.components.iter().map(|c| c.len() + 3).sum();
        let mut prefix = Vec::with_capacity(len);
        for component in &self.components {
            prefix.push(TAG_CHILD);
            for &byte in component {
                prefix.push(byte);
                if byte == 0x00 {
                    prefix.push(ESCAPE);
                }
            }
            prefix.extend_from_slice(&TERMINATOR);
        }
        prefix
    }
}

impl fmt::Display for BucketPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match std::str::from_utf8(component) {
                Ok(text) => f.write_str(text)?,
                Err(_) => {
                    for byte in component {
                        write!(f, "{byte:02x}")?;
                    }
                },
            }
        }
        Ok(())
    }
}

/// Key marking that the bucket with the given prefix exists.
pub(crate) fn marker_key(prefix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 1);
    key.extend_from_slice(prefix);
    key.push(TAG_MARKER);
    key
}

/// Key of an entry inside the bucket with the given prefix.
pub(crate) fn entry_key(prefix: &[u8], key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() + 1 + key.len());
    out.extend_from_slice(prefix);
    out.push(TAG_ENTRY);
    out.extend_from_slice(key);
    out
}

/// Length of the part of an entry key that precedes the user key.
pub(crate) fn entry_header_len(prefix: &[u8]) -> usize {
    prefix.len() + 1
}
