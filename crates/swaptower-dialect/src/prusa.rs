//! Slic3r Prusa Edition and PrusaSlicer dialect.

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::dialect::{contains, SlicerDialect, SlicerKind};
use crate::header::AnnotationKey;
use crate::segment::LayerMarker;
use crate::settings::SlicerVersion;

static LAYER_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^BEFORE_LAYER_CHANGE (\d+) (\d+\.?\d*)").expect("layer marker pattern")
});

/// `1.41.2-prusa3d-win64`
static SLIC3R_PE_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\.(\d+)\.(\d+)-prusa3d-").expect("Slic3r PE version pattern")
});

/// `PrusaSlicer 2.3.0+linux-x64`, `PrusaSlicer-2.4.0`
static PRUSASLICER_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"PrusaSlicer[- ](\d+)\.(\d+)\.(\d+)").expect("PrusaSlicer version pattern")
});

const SIGNATURES: [&str; 2] = ["generated by Slic3r", "generated by PrusaSlicer"];

const ANNOTATIONS: [(&str, AnnotationKey); 15] = [
    ("bed_shape", AnnotationKey::BedShape),
    ("extrusion_multiplier", AnnotationKey::ExtrusionMultiplier),
    ("filament_type", AnnotationKey::FilamentType),
    ("retract_length", AnnotationKey::RetractLength),
    ("retract_lift", AnnotationKey::RetractLift),
    ("retract_speed", AnnotationKey::RetractSpeed),
    ("use_relative_e_distances", AnnotationKey::RelativeExtrusion),
    ("wipe", AnnotationKey::Wipe),
    ("perimeter_speed", AnnotationKey::PerimeterSpeed),
    ("z_offset", AnnotationKey::ZOffset),
    ("first_layer_speed", AnnotationKey::FirstLayerSpeed),
    ("travel_speed", AnnotationKey::TravelSpeed),
    ("layer_height", AnnotationKey::LayerHeight),
    ("first_layer_temperature", AnnotationKey::FirstLayerTemperature),
    ("temperature", AnnotationKey::Temperature),
];

/// Dialect for files written by Slic3r PE and PrusaSlicer.
///
/// Layers start at `;BEFORE_LAYER_CHANGE <num> <z>` comments, which the
/// printer profile's before-layer-change G-code has to emit. Settings are
/// read from the `; key = value` block the slicer appends to the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrusaSlic3r;

fn version_from(re: &Regex, comment: &[u8]) -> Option<SlicerVersion> {
    let caps = re.captures(comment)?;
    let field = |i: usize| -> Option<u32> {
        std::str::from_utf8(caps.get(i)?.as_bytes()).ok()?.parse().ok()
    };
    Some(SlicerVersion {
        major: field(1)?,
        minor: field(2)?,
        patch: field(3)?,
    })
}

impl SlicerDialect for PrusaSlic3r {
    fn kind(&self) -> SlicerKind {
        SlicerKind::PrusaSlic3r
    }

    fn is_signature(&self, comment: &[u8]) -> bool {
        SIGNATURES.iter().any(|sig| contains(comment, sig.as_bytes()))
    }

    fn parse_version(&self, comment: &[u8]) -> Option<SlicerVersion> {
        version_from(&SLIC3R_PE_VERSION_RE, comment)
            .or_else(|| version_from(&PRUSASLICER_VERSION_RE, comment))
    }

    fn annotation_key(&self, key: &[u8]) -> Option<AnnotationKey> {
        ANNOTATIONS
            .iter()
            .find(|(name, _)| name.as_bytes() == key)
            .map(|&(_, key)| key)
    }

    fn layer_marker(&self, comment: &[u8]) -> Option<LayerMarker> {
        let start = comment.iter().position(|b| !b.is_ascii_whitespace())?;
        let caps = LAYER_MARKER_RE.captures(&comment[start..])?;
        let num = std::str::from_utf8(&caps[1]).ok()?.parse().ok()?;
        let z = std::str::from_utf8(&caps[2]).ok()?.parse().ok()?;
        Some(LayerMarker { num, z })
    }
}
