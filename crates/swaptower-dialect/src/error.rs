//! Error types for dialect parsing.

use swaptower_gcode::GcodeError;
use thiserror::Error;

use crate::dialect::SlicerKind;

/// Errors that can occur while parsing a sliced file.
///
/// `UnsupportedLayerHeight`, `RelativeExtrusionDisabled` and
/// `MalformedAnnotation` are configuration errors: the file cannot be
/// processed and must be re-sliced.
#[derive(Error, Debug)]
pub enum DialectError {
    /// Layer height is missing or not the supported value.
    #[error("layer height must be {expected} mm, found {}", found.map(|h| format!("{} mm", h)).unwrap_or_else(|| "none".into()))]
    UnsupportedLayerHeight {
        /// Layer height found in the header, if any.
        found: Option<f64>,
        /// The only supported layer height.
        expected: f64,
    },

    /// Extrusion distances are absolute; tool change math needs relative E.
    #[error("relative E distances not enabled; enable use_relative_e_distances in the slicer")]
    RelativeExtrusionDisabled,

    /// A safety-relevant annotation has a value that cannot be parsed.
    #[error("malformed annotation {key}: {value:?}")]
    MalformedAnnotation {
        /// Annotation key.
        key: String,
        /// Raw annotation value.
        value: String,
    },

    /// The first layer has no start script end marker.
    #[error("cannot find '{0}' comment; add it to the end of the slicer's start G-code")]
    MissingStartScriptEnd(String),

    /// Segmentation produced no layers.
    #[error("no layers found")]
    NoLayers,

    /// No slicer signature was found in the file.
    #[error("could not detect the slicer that generated this file")]
    UnknownSlicer,

    /// The slicer was detected but has no dialect implementation.
    #[error("{0} files are not supported")]
    UnsupportedSlicer(SlicerKind),

    /// Invalid processing configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// G-code file error.
    #[error(transparent)]
    Gcode(#[from] GcodeError),
}

impl DialectError {
    /// Create a malformed annotation error.
    pub fn malformed(key: impl Into<String>, value: &[u8]) -> Self {
        Self::MalformedAnnotation {
            key: key.into(),
            value: String::from_utf8_lossy(value).into_owned(),
        }
    }

    /// True for errors caused by the slicer configuration embedded in the file.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedLayerHeight { .. }
                | Self::RelativeExtrusionDisabled
                | Self::MalformedAnnotation { .. }
        )
    }
}

/// Result type for dialect operations.
pub type Result<T> = std::result::Result<T, DialectError>;
