//! Header settings extraction.
//!
//! Slicers embed their configuration as `; key = value` comments. A dialect
//! maps its key names to [`AnnotationKey`]s; [`HeaderBuilder`] applies the
//! values and resolves the settings that depend on each other once the
//! whole file has been scanned, since annotation order is not stable across
//! slicer versions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{ProcessConfig, SUPPORTED_LAYER_HEIGHT};
use crate::dialect::SlicerDialect;
use crate::error::{DialectError, Result};
use crate::layer::Layer;
use crate::settings::{MachineGeometry, PrintSettings, SlicerVersion, ToolSettings, WipeSetting};

/// Settings a header annotation can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKey {
    /// Bed corner points, `AxB` pairs.
    BedShape,
    /// Per-tool extrusion multiplier.
    ExtrusionMultiplier,
    /// Per-tool filament type, `;`-separated.
    FilamentType,
    /// Per-tool retract length (mm).
    RetractLength,
    /// Per-tool retract Z lift (mm).
    RetractLift,
    /// Per-tool retract speed (mm/s).
    RetractSpeed,
    /// Relative extrusion distances flag.
    RelativeExtrusion,
    /// Per-tool wipe flag.
    Wipe,
    /// Perimeter speed (mm/s).
    PerimeterSpeed,
    /// Z offset (mm).
    ZOffset,
    /// First layer speed, percentage or mm/s.
    FirstLayerSpeed,
    /// Travel speed (mm/s).
    TravelSpeed,
    /// Layer height (mm).
    LayerHeight,
    /// Per-tool first layer temperature.
    FirstLayerTemperature,
    /// Per-tool temperature.
    Temperature,
}

impl AnnotationKey {
    /// Separator between per-tool values.
    pub fn list_separator(self) -> u8 {
        match self {
            AnnotationKey::FilamentType => b';',
            _ => b',',
        }
    }
}

impl fmt::Display for AnnotationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnnotationKey::BedShape => "bed shape",
            AnnotationKey::ExtrusionMultiplier => "extrusion multiplier",
            AnnotationKey::FilamentType => "filament type",
            AnnotationKey::RetractLength => "retract length",
            AnnotationKey::RetractLift => "retract lift",
            AnnotationKey::RetractSpeed => "retract speed",
            AnnotationKey::RelativeExtrusion => "relative E distances",
            AnnotationKey::Wipe => "wipe",
            AnnotationKey::PerimeterSpeed => "perimeter speed",
            AnnotationKey::ZOffset => "Z offset",
            AnnotationKey::FirstLayerSpeed => "first layer speed",
            AnnotationKey::TravelSpeed => "travel speed",
            AnnotationKey::LayerHeight => "layer height",
            AnnotationKey::FirstLayerTemperature => "first layer temperature",
            AnnotationKey::Temperature => "temperature",
        };
        f.write_str(name)
    }
}

/// Split a `key = value` comment into trimmed key and value.
pub fn split_annotation(comment: &[u8]) -> Option<(&[u8], &[u8])> {
    let at = comment.windows(3).position(|w| w == b" = ")?;
    let key = comment[..at].trim_ascii();
    let value = comment[at + 3..].trim_ascii();
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

fn parse_f64(raw: &[u8]) -> Option<f64> {
    std::str::from_utf8(raw).ok()?.trim().parse().ok()
}

fn parse_point(raw: &[u8]) -> Option<(f64, f64)> {
    let at = raw.iter().position(|&b| b == b'x')?;
    Some((parse_f64(&raw[..at])?, parse_f64(&raw[at + 1..])?))
}

/// First layer speed as written in the header.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FirstLayerSpeed {
    /// Percentage of the default speed.
    Percent(f64),
    /// Absolute speed (mm/s).
    Absolute(f64),
}

/// Everything the header scan recovers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderSettings {
    /// Global print settings.
    pub print: PrintSettings,
    /// Machine geometry, if the bed shape was annotated.
    pub machine: Option<MachineGeometry>,
    /// Per-tool settings by tool index.
    pub tools: BTreeMap<u8, ToolSettings>,
}

/// Accumulates header annotations; [`finish`](Self::finish) validates and
/// resolves them.
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    wipe_estimate: f64,
    tools: BTreeMap<u8, ToolSettings>,
    version: Option<SlicerVersion>,
    machine: Option<MachineGeometry>,
    default_speed: Option<f64>,
    first_layer_speed: Option<FirstLayerSpeed>,
    travel_speed: Option<f64>,
    layer_height: Option<f64>,
    relative_e: Option<bool>,
    z_offset: f64,
    malformed: Vec<(AnnotationKey, Vec<u8>)>,
}

impl HeaderBuilder {
    /// Create a builder. `wipe_estimate` is the length assumed for tools with wipe on.
    pub fn new(wipe_estimate: f64) -> Self {
        Self {
            wipe_estimate,
            tools: BTreeMap::new(),
            version: None,
            machine: None,
            default_speed: None,
            first_layer_speed: None,
            travel_speed: None,
            layer_height: None,
            relative_e: None,
            z_offset: 0.0,
            malformed: Vec::new(),
        }
    }

    /// Record the slicer version parsed from the signature line.
    pub fn record_version(&mut self, version: Option<SlicerVersion>, signature: &[u8]) {
        match version {
            Some(v) => self.version = Some(v),
            None => log::debug!(
                "unrecognized slicer version in {:?}",
                String::from_utf8_lossy(signature).trim()
            ),
        }
    }

    /// Apply one annotation.
    ///
    /// Malformed layer height and bed shape values are kept and reported by
    /// [`finish`](Self::finish); other malformed values are skipped with a
    /// warning.
    pub fn apply(&mut self, key: AnnotationKey, value: &[u8]) {
        match key {
            AnnotationKey::BedShape => {
                let machine = value
                    .split(|&b| b == b',')
                    .map(parse_point)
                    .collect::<Option<Vec<_>>>()
                    .and_then(|points| MachineGeometry::from_bed_shape(&points));
                match machine {
                    Some(machine) => self.machine = Some(machine),
                    None => self.malformed.push((key, value.to_vec())),
                }
            }
            AnnotationKey::LayerHeight => {
                match parse_f64(value) {
                    Some(height) => self.layer_height = Some(height),
                    None => self.malformed.push((key, value.to_vec())),
                }
            }
            AnnotationKey::RelativeExtrusion => {
                self.relative_e = Some(value == b"1");
            }
            AnnotationKey::PerimeterSpeed => {
                if let Some(speed) = self.scalar(key, value) {
                    self.default_speed = Some(speed * 60.0);
                }
            }
            AnnotationKey::ZOffset => {
                if let Some(offset) = self.scalar(key, value) {
                    self.z_offset = offset;
                }
            }
            AnnotationKey::TravelSpeed => {
                if let Some(speed) = self.scalar(key, value) {
                    self.travel_speed = Some(speed * 60.0);
                }
            }
            AnnotationKey::FirstLayerSpeed => {
                let speed = match value.strip_suffix(b"%") {
                    Some(percent) => self.scalar(key, percent).map(FirstLayerSpeed::Percent),
                    None => self.scalar(key, value).map(FirstLayerSpeed::Absolute),
                };
                if speed.is_some() {
                    self.first_layer_speed = speed;
                }
            }
            AnnotationKey::ExtrusionMultiplier => self.per_tool(key, value, |tool, raw| {
                parse_f64(raw).map(|v| tool.feed_rate_multiplier = v)
            }),
            AnnotationKey::FilamentType => self.per_tool(key, value, |tool, raw| {
                tool.filament_type = Some(String::from_utf8_lossy(raw).into_owned());
                Some(())
            }),
            AnnotationKey::RetractLength => self.per_tool(key, value, |tool, raw| {
                parse_f64(raw).map(|v| tool.retract = v)
            }),
            AnnotationKey::RetractLift => self.per_tool(key, value, |tool, raw| {
                parse_f64(raw).map(|v| tool.z_hop = v)
            }),
            AnnotationKey::RetractSpeed => self.per_tool(key, value, |tool, raw| {
                parse_f64(raw).map(|v| tool.retract_speed = v * 60.0)
            }),
            AnnotationKey::Wipe => {
                let wipe = WipeSetting {
                    length: self.wipe_estimate,
                    estimated: true,
                };
                self.per_tool(key, value, |tool, raw| {
                    if raw == b"1" {
                        tool.wipe = Some(wipe);
                    }
                    Some(())
                })
            }
            AnnotationKey::FirstLayerTemperature => self.per_tool(key, value, |tool, raw| {
                let text = std::str::from_utf8(raw).ok()?;
                text.parse().ok().map(|t| tool.first_layer_temperature = Some(t))
            }),
            AnnotationKey::Temperature => self.per_tool(key, value, |tool, raw| {
                let text = std::str::from_utf8(raw).ok()?;
                text.parse().ok().map(|t| tool.temperature = Some(t))
            }),
        }
    }

    fn scalar(&self, key: AnnotationKey, value: &[u8]) -> Option<f64> {
        let parsed = parse_f64(value);
        if parsed.is_none() {
            log::warn!(
                "ignoring malformed {} value {:?}",
                key,
                String::from_utf8_lossy(value)
            );
        }
        parsed
    }

    /// Apply a per-tool list, creating tool entries on first mention.
    fn per_tool<F>(&mut self, key: AnnotationKey, value: &[u8], mut set: F)
    where
        F: FnMut(&mut ToolSettings, &[u8]) -> Option<()>,
    {
        for (i, raw) in value.split(|&b| b == key.list_separator()).enumerate() {
            let Ok(index) = u8::try_from(i) else {
                log::warn!("ignoring {} values past tool {}", key, u8::MAX);
                break;
            };
            let tool = self
                .tools
                .entry(index)
                .or_insert_with(|| ToolSettings::new(index));
            if set(tool, raw.trim_ascii()).is_none() {
                log::warn!(
                    "ignoring malformed {} value {:?} for tool {}",
                    key,
                    String::from_utf8_lossy(raw),
                    index
                );
            }
        }
    }

    fn malformed_error(&self, key: AnnotationKey, name: &str) -> Option<DialectError> {
        self.malformed
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, raw)| DialectError::malformed(name, raw))
    }

    /// Validate and resolve the collected settings.
    ///
    /// Checks run in a fixed order: layer height, relative E, then bed shape.
    pub fn finish(mut self) -> Result<HeaderSettings> {
        if let Some(err) = self.malformed_error(AnnotationKey::LayerHeight, "layer_height") {
            return Err(err);
        }
        match self.layer_height {
            Some(h) if h == SUPPORTED_LAYER_HEIGHT => {}
            found => {
                return Err(DialectError::UnsupportedLayerHeight {
                    found,
                    expected: SUPPORTED_LAYER_HEIGHT,
                })
            }
        }
        if self.relative_e != Some(true) {
            return Err(DialectError::RelativeExtrusionDisabled);
        }
        if let Some(err) = self.malformed_error(AnnotationKey::BedShape, "bed_shape") {
            return Err(err);
        }

        match self.version {
            Some(v) => log::info!("slicer version {}", v),
            None => log::warn!("could not detect slicer version, use at your own risk"),
        }
        if self.machine.is_none() {
            log::warn!("no bed shape in header, machine geometry unknown");
        }

        let first_layer_speed = match (self.first_layer_speed, self.default_speed) {
            (Some(FirstLayerSpeed::Percent(p)), Some(default)) => Some(p / 100.0 * default),
            (Some(FirstLayerSpeed::Percent(_)), None) => {
                log::warn!("first layer speed is relative but perimeter speed is unknown");
                None
            }
            (Some(FirstLayerSpeed::Absolute(speed)), _) => Some(speed * 60.0),
            (None, _) => None,
        };

        for tool in self.tools.values_mut() {
            tool.z_offset = self.z_offset;
        }

        Ok(HeaderSettings {
            print: PrintSettings {
                layer_height: SUPPORTED_LAYER_HEIGHT,
                default_speed: self.default_speed,
                outer_perimeter_speed: self.default_speed,
                first_layer_speed,
                travel_xy_speed: self.travel_speed,
                travel_z_speed: self.travel_speed,
                version: self.version,
            },
            machine: self.machine,
            tools: self.tools,
        })
    }
}

/// Scan the comment-only lines of every layer for header annotations.
///
/// Slicers may write their configuration at the start or at the end of the
/// file, so the whole file is scanned.
pub fn extract_header<D>(
    dialect: &D,
    layers: &[Layer],
    config: &ProcessConfig,
) -> Result<HeaderSettings>
where
    D: SlicerDialect + ?Sized,
{
    let mut builder = HeaderBuilder::new(config.wipe_estimate);
    let comments = layers
        .iter()
        .flat_map(|layer| layer.lines.iter())
        .filter(|line| line.is_comment_only())
        .filter_map(|line| line.comment.as_deref());

    for comment in comments {
        if dialect.is_signature(comment) {
            builder.record_version(dialect.parse_version(comment), comment);
            continue;
        }
        let Some((key, value)) = split_annotation(comment) else {
            continue;
        };
        if let Some(key) = dialect.annotation_key(key) {
            builder.apply(key, value);
        }
    }

    builder.finish()
}
