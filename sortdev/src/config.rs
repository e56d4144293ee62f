//! Device configuration
//!
//! The parameters are fixed when a device set is initialised: the capacity of
//! every device buffer and how many devices to create. They can be supplied as
//! a JSON object, any missing key falls back to its default.
//!
//! ```
//! use sortdev::config::DeviceConfig;
//!
//! let config = DeviceConfig::from_json_str(r#"{"buffer_size": 64}"#).unwrap();
//! assert_eq!(config.buffer_size, 64);
//! assert_eq!(config.nr_devs, 1);
//! ```

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BUFFER_SIZE: usize = 4000;
pub const DEFAULT_NR_DEVS: usize = 1;

/// One byte is always held back by the free-space accounting, so a usable
/// buffer needs at least two.
pub const MIN_BUFFER_SIZE: usize = 2;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("buffer_size {0} is below the minimum of {MIN_BUFFER_SIZE}")]
    BufferTooSmall(usize),

    #[error("nr_devs must be at least 1")]
    NoDevices,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Capacity in bytes of each device buffer
    pub buffer_size: usize,
    /// Number of devices in a set
    pub nr_devs: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            nr_devs: DEFAULT_NR_DEVS,
        }
    }
}

impl DeviceConfig {
    /// Config with the given buffer size and default device count
    #[must_use]
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, has unknown keys, or holds
    /// values rejected by [`DeviceConfig::validate`].
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Same as [`DeviceConfig::from_json_str`], plus I/O errors of `reader`.
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Fails if the buffer cannot hold a single byte or no devices are requested.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(ConfigError::BufferTooSmall(self.buffer_size));
        }
        if self.nr_devs == 0 {
            return Err(ConfigError::NoDevices);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeviceConfig::default();
        assert_eq!(config.buffer_size, 4000);
        assert_eq!(config.nr_devs, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = DeviceConfig::from_json_str(r#"{"nr_devs": 3}"#).unwrap();
        assert_eq!(config.nr_devs, 3);
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_from_reader() {
        let input = std::io::Cursor::new(br#"{"buffer_size": 16, "nr_devs": 2}"#.to_vec());
        let config = DeviceConfig::from_reader(input).unwrap();
        assert_eq!(config, DeviceConfig { buffer_size: 16, nr_devs: 2 });
    }

    #[test]
    fn test_rejects_tiny_buffer() {
        let err = DeviceConfig::from_json_str(r#"{"buffer_size": 1}"#).unwrap_err();
        assert!(matches!(err, ConfigError::BufferTooSmall(1)));
    }

    #[test]
    fn test_rejects_zero_devices() {
        let err = DeviceConfig::from_json_str(r#"{"nr_devs": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NoDevices));
    }

    #[test]
    fn test_rejects_unknown_key() {
        let err = DeviceConfig::from_json_str(r#"{"quantum": 10}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
