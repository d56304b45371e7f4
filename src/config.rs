//! Session configuration
//!
//! Defaults match the native library's conventions: found-flag catching is
//! enabled and fault text is retrieved into buffers of the sizes the native
//! message routines document.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SpiceError};

/// Buffer sizes (terminator included) used when retrieving fault text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageLengths {
    /// Short error code, e.g. `SPICE(NOSUCHFILE)`
    pub short: usize,
    /// Explanation of the short code
    pub explain: usize,
    /// Long message
    pub long: usize,
    /// Traceback
    pub traceback: usize,
}

impl Default for MessageLengths {
    fn default() -> Self {
        Self {
            short: 26,
            explain: 100,
            long: 1841,
            traceback: 200,
        }
    }
}

/// Configuration for a [`crate::bridge::Session`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Initial found-catch state
    pub catch_false_founds: bool,
    /// Fault text buffer sizes
    pub message_lengths: MessageLengths,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            catch_false_founds: true,
            message_lengths: MessageLengths::default(),
        }
    }
}

impl SessionConfig {
    /// Create a configuration with the native defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial found-catch state
    pub fn with_catch_false_founds(mut self, enabled: bool) -> Self {
        self.catch_false_founds = enabled;
        self
    }

    /// Set the fault text buffer sizes
    pub fn with_message_lengths(mut self, lengths: MessageLengths) -> Self {
        self.message_lengths = lengths;
        self
    }

    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SpiceError::Serialization(e.to_string()))
    }

    /// Load a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::new();
        assert!(config.catch_false_founds);
        assert_eq!(config.message_lengths.short, 26);
        assert_eq!(config.message_lengths.long, 1841);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            SessionConfig::from_json_str(r#"{"message_lengths": {"traceback": 400}}"#).unwrap();
        assert!(config.catch_false_founds);
        assert_eq!(config.message_lengths.traceback, 400);
        assert_eq!(config.message_lengths.explain, 100);
    }

    #[test]
    fn test_builder() {
        let lengths = MessageLengths {
            long: 80,
            ..MessageLengths::default()
        };
        let config = SessionConfig::new()
            .with_catch_false_founds(false)
            .with_message_lengths(lengths);
        assert!(!config.catch_false_founds);
        assert_eq!(config.message_lengths.long, 80);
    }

    #[test]
    fn test_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"catch_false_founds": false}}"#).unwrap();
        let config = SessionConfig::from_json_file(file.path()).unwrap();
        assert!(!config.catch_false_founds);

        assert!(matches!(
            SessionConfig::from_json_file("/nonexistent/spicebind.json"),
            Err(SpiceError::Io(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SessionConfig::from_json_str("{not json"),
            Err(SpiceError::Serialization(_))
        ));
    }
}
