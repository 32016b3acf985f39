//! Processing configuration.

use serde::{Deserialize, Serialize};

use crate::error::{DialectError, Result};

/// The only layer height the tower generator supports (mm).
pub const SUPPORTED_LAYER_HEIGHT: f64 = 0.2;

/// Tunables for dialect processing.
///
/// Every field has a default, so a TOML file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Comment that ends the start G-code in the first layer.
    pub start_script_marker: String,
    /// Comment that precedes slicer-issued tool change commands.
    pub tool_change_marker: String,
    /// Wipe length assumed for tools with wipe enabled (mm).
    ///
    /// The slicer header only says whether wipe is on, not how long the wipe
    /// move is, so this is an estimate.
    pub wipe_estimate: f64,
    /// Outer perimeter feed rate stamped on every layer (mm filament / mm path).
    pub perimeter_feed_rate: f64,
    /// Z and height of the first layer before any layer marker is seen (mm).
    pub first_layer_height: f64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            start_script_marker: "START SCRIPT END".into(),
            tool_change_marker: "TOOL CHANGE".into(),
            wipe_estimate: 4.0,
            perimeter_feed_rate: 0.05,
            first_layer_height: SUPPORTED_LAYER_HEIGHT,
        }
    }
}

impl ProcessConfig {
    /// Validate config.
    pub fn validate(&self) -> Result<()> {
        if self.start_script_marker.trim().is_empty() {
            return Err(DialectError::InvalidConfig(
                "start_script_marker must not be empty".into(),
            ));
        }
        if self.tool_change_marker.trim().is_empty() {
            return Err(DialectError::InvalidConfig(
                "tool_change_marker must not be empty".into(),
            ));
        }
        if self.wipe_estimate <= 0.0 {
            return Err(DialectError::InvalidConfig(
                "wipe_estimate must be positive".into(),
            ));
        }
        if self.perimeter_feed_rate <= 0.0 {
            return Err(DialectError::InvalidConfig(
                "perimeter_feed_rate must be positive".into(),
            ));
        }
        if self.first_layer_height <= 0.0 {
            return Err(DialectError::InvalidConfig(
                "first_layer_height must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ProcessConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let config = ProcessConfig {
            wipe_estimate: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ProcessConfig {
            tool_change_marker: "  ".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
