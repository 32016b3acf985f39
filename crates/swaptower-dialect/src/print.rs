//! Processed print and its serializable summary.

use serde::{Deserialize, Serialize};
use swaptower_gcode::Line;

use crate::dialect::SlicerKind;
use crate::header::HeaderSettings;
use crate::layer::{Layer, LayerAction};
use crate::normalize::FirstToolChange;
use crate::scan::ToolUsage;
use crate::settings::{MachineGeometry, PrintSettings, ToolSettings};

/// A G-code file after segmentation, header resolution and slot allocation.
#[derive(Debug, Clone)]
pub struct ProcessedPrint {
    /// Detected slicer.
    pub slicer: SlicerKind,
    /// Recovered header settings.
    pub header: HeaderSettings,
    /// All layers in file order.
    pub layers: Vec<Layer>,
    /// Indices into `layers` of tagged layers, in layer order.
    pub filtered: Vec<usize>,
    /// Tower slot count at the bottom of the print.
    pub max_slots: usize,
    /// Tools used and their switch heights.
    pub tool_usage: ToolUsage,
    /// Outcome of first tool change normalization.
    pub first_tool_change: Option<FirstToolChange>,
}

impl ProcessedPrint {
    /// Tagged layers, in layer order.
    pub fn filtered_layers(&self) -> impl Iterator<Item = &Layer> + '_ {
        self.filtered.iter().map(move |&i| &self.layers[i])
    }

    /// Every line of the print, in file order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> + '_ {
        self.layers.iter().flat_map(|layer| layer.lines.iter())
    }

    /// Summary suitable for serialization.
    pub fn summary(&self) -> PrintSummary {
        PrintSummary {
            slicer: self.slicer,
            print: self.header.print.clone(),
            machine: self.header.machine,
            tools: self.header.tools.values().cloned().collect(),
            tool_order: self.tool_usage.tools.clone(),
            layer_count: self.layers.len(),
            max_slots: self.max_slots,
            last_switch_height: self.tool_usage.last_switch_height,
            layers: self.filtered_layers().map(LayerSummary::from).collect(),
        }
    }
}

/// Serializable overview of a processed print.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintSummary {
    /// Detected slicer.
    pub slicer: SlicerKind,
    /// Global print settings.
    pub print: PrintSettings,
    /// Machine geometry, if known.
    pub machine: Option<MachineGeometry>,
    /// Per-tool settings, by tool index.
    pub tools: Vec<ToolSettings>,
    /// Tools in order of first use.
    pub tool_order: Vec<u8>,
    /// Number of layers in the file.
    pub layer_count: usize,
    /// Tower slot count at the bottom of the print.
    pub max_slots: usize,
    /// Highest Z with a tool change.
    pub last_switch_height: f64,
    /// Tagged layers only.
    pub layers: Vec<LayerSummary>,
}

/// Serializable view of one tagged layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSummary {
    /// Layer number.
    pub num: u32,
    /// Z height (mm).
    pub z: f64,
    /// Layer height (mm).
    pub height: f64,
    /// Tower role.
    pub action: Option<LayerAction>,
    /// Tower slots at this Z.
    pub tower_slots: usize,
    /// Number of G-code lines.
    pub line_count: usize,
}

impl From<&Layer> for LayerSummary {
    fn from(layer: &Layer) -> Self {
        Self {
            num: layer.num,
            z: layer.z,
            height: layer.height,
            action: layer.action,
            tower_slots: layer.tower_slots,
            line_count: layer.lines.len(),
        }
    }
}
