//! Core types for coffer.
//!
//! This crate provides the building blocks shared by the storage and
//! record layers:
//! - Scalar values and kinds for key fields
//! - Order-preserving key encoding (bytesort)
//! - Payload codecs (postcard, JSON)
//! - Store configuration using bon builders

pub mod bytesort;
pub mod codec;
pub mod config;
pub mod scalar;

pub use bytesort::{KeyEncodingError, PRIMARY_KEY_LEN};
pub use codec::{Codec, CodecError};
pub use config::{ConfigError, StoreConfig};
pub use scalar::{Scalar, ScalarKind, ScalarType};
