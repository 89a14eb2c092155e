//! Store configuration.
//!
//! Built through a validating builder, or deserialized and then checked
//! with [`StoreConfig::validate`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

use crate::codec::Codec;

/// Minimum cache size: 1 MB.
const MIN_CACHE_SIZE_BYTES: usize = 1024 * 1024;

/// Configuration validation error.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[snafu(display("invalid config: {message}"))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },
}

/// Store configuration.
///
/// # Validation Rules
///
/// - `cache_size_bytes` must be >= 1 MB (1,048,576 bytes)
///
/// # Example
///
/// ```no_run
/// # use coffer_types::{Codec, config::StoreConfig};
/// let config = StoreConfig::builder()
///     .codec(Codec::Json)
///     .cache_size_bytes(16 * 1024 * 1024)
///     .build()
///     .expect("valid store config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StoreConfig {
    /// Serialization format for record payloads.
    ///
    /// Must not change for an existing database file.
    #[serde(default)]
    pub codec: Codec,
    /// Page cache size handed to the storage engine, in bytes.
    #[serde(default = "default_cache_size")]
    pub cache_size_bytes: usize,
}

#[bon::bon]
impl StoreConfig {
    /// Creates a new store configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `cache_size_bytes` < 1 MB.
    #[builder]
    pub fn new(
        #[builder(default)] codec: Codec,
        #[builder(default = default_cache_size())] cache_size_bytes: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { codec, cache_size_bytes };
        config.validate()?;
        Ok(config)
    }
}

impl StoreConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_size_bytes < MIN_CACHE_SIZE_BYTES {
            return Err(ConfigError::Validation {
                message: format!(
                    "cache_size_bytes must be >= {} (1 MB), got {}",
                    MIN_CACHE_SIZE_BYTES, self.cache_size_bytes
                ),
            });
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { codec: Codec::default(), cache_size_bytes: default_cache_size() }
    }
}

fn default_cache_size() -> usize {
    64 * 1024 * 1024 // 64 MB
}
