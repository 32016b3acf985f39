//! Print, machine and per-tool settings recovered from a sliced file.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Slicer version (major, minor, patch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlicerVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
}

impl fmt::Display for SlicerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Print bed kinematics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BedKind {
    /// Rectangular bed, origin at a corner.
    Cartesian,
    /// Round bed, origin at the center.
    Delta,
}

/// Printable area derived from the bed shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachineGeometry {
    /// Bed kinematics.
    pub kind: BedKind,
    /// Printable extent in X (mm).
    pub stroke_x: f64,
    /// Printable extent in Y (mm).
    pub stroke_y: f64,
    /// X offset from bed origin to machine origin (mm).
    pub origin_offset_x: f64,
    /// Y offset from bed origin to machine origin (mm).
    pub origin_offset_y: f64,
}

impl MachineGeometry {
    /// Derive geometry from bed shape corner points.
    ///
    /// Four points describe a rectangular (Cartesian) bed: the offset is the
    /// negated first corner and the stroke is the third corner plus offset.
    /// Any other count describes a delta bed polygon: the stroke is the span
    /// of all points and the origin sits at its center.
    pub fn from_bed_shape(points: &[(f64, f64)]) -> Option<Self> {
        if points.len() == 4 {
            let origin_offset_x = -points[0].0;
            let origin_offset_y = -points[0].1;
            return Some(Self {
                kind: BedKind::Cartesian,
                stroke_x: points[2].0 + origin_offset_x,
                stroke_y: points[2].1 + origin_offset_y,
                origin_offset_x,
                origin_offset_y,
            });
        }
        let (min_x, max_x) = span(points.iter().map(|p| p.0))?;
        let (min_y, max_y) = span(points.iter().map(|p| p.1))?;
        let stroke_x = max_x - min_x;
        let stroke_y = max_y - min_y;
        Some(Self {
            kind: BedKind::Delta,
            stroke_x,
            stroke_y,
            origin_offset_x: stroke_x / 2.0,
            origin_offset_y: stroke_y / 2.0,
        })
    }
}

fn span(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Wipe move length for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WipeSetting {
    /// Wipe length (mm).
    pub length: f64,
    /// True when `length` is an assumed value rather than read from the file.
    pub estimated: bool,
}

/// Settings of one tool (extruder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Tool index.
    pub tool: u8,
    /// Slicer extrusion multiplier.
    pub feed_rate_multiplier: f64,
    /// Filament type label (e.g. `PLA`).
    pub filament_type: Option<String>,
    /// Retract length (mm).
    pub retract: f64,
    /// Z lift on retract (mm).
    pub z_hop: f64,
    /// Retract speed (mm/min).
    pub retract_speed: f64,
    /// Wipe on retract, if enabled.
    pub wipe: Option<WipeSetting>,
    /// First layer nozzle temperature (°C).
    pub first_layer_temperature: Option<u16>,
    /// Nozzle temperature for the remaining layers (°C).
    pub temperature: Option<u16>,
    /// Z offset (mm).
    pub z_offset: f64,
}

impl ToolSettings {
    /// Settings for a newly discovered tool.
    pub fn new(tool: u8) -> Self {
        Self {
            tool,
            feed_rate_multiplier: 1.0,
            filament_type: None,
            retract: 0.0,
            z_hop: 0.0,
            retract_speed: 0.0,
            wipe: None,
            first_layer_temperature: None,
            temperature: None,
            z_offset: 0.0,
        }
    }
}

/// Global print settings. Speeds are in mm/min.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintSettings {
    /// Layer height (mm).
    pub layer_height: f64,
    /// Default print speed.
    pub default_speed: Option<f64>,
    /// Outer perimeter speed.
    pub outer_perimeter_speed: Option<f64>,
    /// First layer speed.
    pub first_layer_speed: Option<f64>,
    /// XY travel speed.
    pub travel_xy_speed: Option<f64>,
    /// Z travel speed.
    pub travel_z_speed: Option<f64>,
    /// Slicer version, if it could be detected.
    pub version: Option<SlicerVersion>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cartesian_bed() {
        let geom =
            MachineGeometry::from_bed_shape(&[(0.0, 0.0), (145.0, 0.0), (145.0, 148.0), (0.0, 148.0)])
                .unwrap();
        assert_eq!(geom.kind, BedKind::Cartesian);
        assert_relative_eq!(geom.origin_offset_x, 0.0);
        assert_relative_eq!(geom.origin_offset_y, 0.0);
        assert_relative_eq!(geom.stroke_x, 145.0);
        assert_relative_eq!(geom.stroke_y, 148.0);
    }

    #[test]
    fn test_cartesian_bed_negative_origin() {
        let geom = MachineGeometry::from_bed_shape(&[
            (-5.0, -10.0),
            (200.0, -10.0),
            (200.0, 190.0),
            (-5.0, 190.0),
        ])
        .unwrap();
        assert_relative_eq!(geom.origin_offset_x, 5.0);
        assert_relative_eq!(geom.origin_offset_y, 10.0);
        assert_relative_eq!(geom.stroke_x, 205.0);
        assert_relative_eq!(geom.stroke_y, 200.0);
    }

    #[test]
    fn test_delta_bed() {
        let points = [
            (-100.0, 0.0),
            (-50.0, 86.6),
            (50.0, 86.6),
            (100.0, 0.0),
            (50.0, -86.6),
            (-50.0, -86.6),
        ];
        let geom = MachineGeometry::from_bed_shape(&points).unwrap();
        assert_eq!(geom.kind, BedKind::Delta);
        assert_relative_eq!(geom.stroke_x, 200.0);
        assert_relative_eq!(geom.stroke_y, 173.2, epsilon = 1e-9);
        assert_relative_eq!(geom.origin_offset_x, 100.0);
        assert_relative_eq!(geom.origin_offset_y, 86.6, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_bed_shape() {
        assert!(MachineGeometry::from_bed_shape(&[]).is_none());
    }

    #[test]
    fn test_version_display() {
        let v = SlicerVersion {
            major: 1,
            minor: 41,
            patch: 2,
        };
        assert_eq!(v.to_string(), "1.41.2");
    }
}
