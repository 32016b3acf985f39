//! Layer model: the lines printed at one Z height, plus tower bookkeeping.

use serde::{Deserialize, Serialize};
use swaptower_gcode::{tool_change_index, Line};

/// Role of a layer in the purge tower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerAction {
    /// Hosts a tool change and its purge.
    ToolSwitch,
    /// Prints sparse tower infill to keep the tower growing.
    Infill,
    /// Passes the tower untouched.
    Pass,
}

/// Distinguishes the first layer, which also carries the start G-code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// First layer of the print.
    First {
        /// Index of the start script end marker line, once found.
        start_gcode_end: Option<usize>,
    },
    /// Any other layer.
    Regular,
}

/// A printed layer.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Layer ordinal as reported by the slicer (0 = first layer).
    pub num: u32,
    /// Z height (mm).
    pub z: f64,
    /// Height above the previous layer (mm).
    pub height: f64,
    /// First or regular layer.
    pub kind: LayerKind,
    /// G-code lines of this layer.
    pub lines: Vec<Line>,
    /// Tower role; `None` until classified.
    pub action: Option<LayerAction>,
    /// Tool change slots the tower reserves at this layer's Z.
    pub tower_slots: usize,
    /// Outer perimeter speed (mm/min).
    pub outer_perimeter_speed: Option<f64>,
    /// Outer perimeter feed rate (mm filament / mm path).
    pub outer_perimeter_feed_rate: Option<f64>,
}

impl Layer {
    /// Create a regular layer.
    pub fn new(num: u32, z: f64, height: f64) -> Self {
        Self {
            num,
            z,
            height,
            kind: LayerKind::Regular,
            lines: Vec::new(),
            action: None,
            tower_slots: 0,
            outer_perimeter_speed: None,
            outer_perimeter_feed_rate: None,
        }
    }

    /// Create the first layer.
    pub fn first(z: f64, height: f64) -> Self {
        Self {
            kind: LayerKind::First {
                start_gcode_end: None,
            },
            ..Self::new(0, z, height)
        }
    }

    /// True for the first layer.
    pub fn is_first(&self) -> bool {
        matches!(self.kind, LayerKind::First { .. })
    }

    /// Index of the start script end marker, for the first layer.
    pub fn start_gcode_end(&self) -> Option<usize> {
        match self.kind {
            LayerKind::First { start_gcode_end } => start_gcode_end,
            LayerKind::Regular => None,
        }
    }

    /// Record the start script end index. Ignored for regular layers.
    pub fn set_start_gcode_end(&mut self, index: usize) {
        if let LayerKind::First { start_gcode_end } = &mut self.kind {
            *start_gcode_end = Some(index);
        }
    }

    /// Append a line.
    pub fn add_line(&mut self, line: Line) {
        self.lines.push(line);
    }

    /// Insert a line before `index`.
    pub fn insert_line(&mut self, index: usize, line: Line) {
        self.lines.insert(index, line);
    }

    /// Remove and return the line at `index`.
    pub fn delete_line(&mut self, index: usize) -> Line {
        self.lines.remove(index)
    }

    /// Slicer-issued tool changes in this layer as `(line index, tool)`.
    ///
    /// A tool change counts only when the command line directly follows a
    /// `marker` comment. Markers inside the first layer's start G-code are
    /// ignored.
    pub fn marked_tool_changes(&self, marker: &str) -> Vec<(usize, u8)> {
        let start_end = self.start_gcode_end().unwrap_or(0);
        let mut pending = false;
        let mut changes = Vec::new();
        for (index, line) in self.lines.iter().enumerate() {
            if line.comment_is(marker) {
                pending = !(self.is_first() && index < start_end);
            } else if let Some(cmd) = line.command.as_deref() {
                if pending {
                    if let Some(tool) = tool_change_index(cmd) {
                        changes.push((index, tool));
                    }
                }
                pending = false;
            } else {
                pending = false;
            }
        }
        changes
    }

    /// True if the layer contains a slicer-issued tool change.
    pub fn has_tool_changes(&self, marker: &str) -> bool {
        !self.marked_tool_changes(marker).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "TOOL CHANGE";

    fn layer_with(lines: &[&[u8]]) -> Layer {
        let mut layer = Layer::new(3, 0.8, 0.2);
        for raw in lines {
            layer.add_line(swaptower_gcode::classify(raw).unwrap());
        }
        layer
    }

    #[test]
    fn test_marked_tool_change() {
        let layer = layer_with(&[b"G1 Z0.8", b";TOOL CHANGE", b"T1", b"G1 X1 Y1 E1"]);
        assert_eq!(layer.marked_tool_changes(MARKER), vec![(2, 1)]);
        assert!(layer.has_tool_changes(MARKER));
    }

    #[test]
    fn test_unmarked_tool_change_ignored() {
        let layer = layer_with(&[b"G1 Z0.8", b"T1", b";TOOL CHANGE", b"G1 X1 Y1", b"T2"]);
        assert!(!layer.has_tool_changes(MARKER));
    }

    #[test]
    fn test_comment_between_marker_and_command() {
        let layer = layer_with(&[b";TOOL CHANGE", b";other", b"T1"]);
        assert!(!layer.has_tool_changes(MARKER));
    }

    #[test]
    fn test_first_layer_start_script_ignored() {
        let mut layer = Layer::first(0.2, 0.2);
        for raw in [&b";TOOL CHANGE"[..], b"T1", b";START SCRIPT END", b"G1 X1 Y1 E1"] {
            layer.add_line(swaptower_gcode::classify(raw).unwrap());
        }
        layer.set_start_gcode_end(2);
        assert_eq!(layer.start_gcode_end(), Some(2));
        assert!(!layer.has_tool_changes(MARKER));
    }

    #[test]
    fn test_insert_and_delete() {
        let mut layer = layer_with(&[b"G1 Z0.8", b"T1"]);
        layer.insert_line(1, Line::comment(&b"TOOL CHANGE"[..]));
        assert!(layer.has_tool_changes(MARKER));
        let removed = layer.delete_line(2);
        assert_eq!(removed, Line::command(&b"T1"[..]));
        assert_eq!(layer.lines.len(), 2);
    }

    #[test]
    fn test_regular_layer_has_no_start_script() {
        let mut layer = Layer::new(1, 0.4, 0.2);
        layer.set_start_gcode_end(5);
        assert_eq!(layer.start_gcode_end(), None);
        assert!(!layer.is_first());
    }
}
