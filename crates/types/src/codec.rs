//! Record payload serialization.
//!
//! Payloads are opaque to the key layer: only whole records pass through
//! a [`Codec`]. Postcard is the default; JSON trades size for payloads that
//! can be inspected with ordinary tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use snafu::{ResultExt, Snafu};

/// Error type for codec operations.
#[derive(Debug, Snafu)]
pub enum CodecError {
    /// Postcard encoding failed.
    #[snafu(display("Encoding failed: {source}"))]
    Encode {
        /// The underlying postcard error.
        source: postcard::Error,
    },

    /// Postcard decoding failed.
    #[snafu(display("Decoding failed: {source}"))]
    Decode {
        /// The underlying postcard error.
        source: postcard::Error,
    },

    /// JSON encoding failed.
    #[snafu(display("JSON encoding failed: {source}"))]
    JsonEncode {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// JSON decoding failed.
    #[snafu(display("JSON decoding failed: {source}"))]
    JsonDecode {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },
}

/// Payload serialization format.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Codec {
    /// Compact binary encoding via postcard.
    #[default]
    Postcard,
    /// Human-readable encoding via serde_json.
    Json,
}

impl Codec {
    /// Encodes a value to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if serialization fails.
    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self {
            Codec::Postcard => postcard::to_allocvec(value).context(EncodeSnafu),
            Codec::Json => serde_json::to_vec(value).context(JsonEncodeSnafu),
        }
    }

    /// Decodes bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if deserialization fails.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, CodecError> {
        match self {
            Codec::Postcard => postcard::from_bytes(bytes).context(DecodeSnafu),
            Codec::Json => serde_json::from_slice(bytes).context(JsonDecodeSnafu),
        }
    }
}
