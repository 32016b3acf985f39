//! First tool change normalization.

use swaptower_gcode::{tool_change_index, Line};

use crate::layer::Layer;

/// What happened to the first tool change of the print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstToolChange {
    /// `T0` was removed: tool 0 is already active after the start script.
    Removed,
    /// A tool change marker was inserted before the selection of this tool.
    Marked(u8),
}

/// Normalize the first tool change after the start script of the first layer.
///
/// Only the first tool change command is touched. Returns `None` if the
/// layer has no tool change after its start script.
pub fn normalize_first_tool_change(layer: &mut Layer, marker: &str) -> Option<FirstToolChange> {
    let from = layer.start_gcode_end().map_or(0, |end| end + 1);
    let (index, tool) = layer
        .lines
        .iter()
        .enumerate()
        .skip(from)
        .find_map(|(index, line)| {
            let tool = tool_change_index(line.command.as_deref()?)?;
            Some((index, tool))
        })?;

    if tool == 0 {
        log::debug!("removing redundant first tool change T0 at line {}", index);
        layer.delete_line(index);
        Some(FirstToolChange::Removed)
    } else {
        log::debug!("marking first tool change T{} at line {}", tool, index);
        layer.insert_line(index, Line::comment(marker));
        Some(FirstToolChange::Marked(tool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swaptower_gcode::parse_lines;

    const MARKER: &str = "TOOL CHANGE";

    fn first_layer(src: &str, start_end: usize) -> Layer {
        let mut layer = Layer::first(0.2, 0.2);
        for line in parse_lines(src.as_bytes()) {
            layer.add_line(line);
        }
        layer.set_start_gcode_end(start_end);
        layer
    }

    #[test]
    fn test_t0_removed() {
        let mut layer = first_layer("T0\n;START SCRIPT END\nT0\nG1 X1 Y1 E1\nT0\n", 1);
        assert_eq!(
            normalize_first_tool_change(&mut layer, MARKER),
            Some(FirstToolChange::Removed)
        );
        assert_eq!(layer.lines.len(), 4);
        assert_eq!(layer.lines[0], Line::command(&b"T0"[..]));
        assert_eq!(layer.lines[2], Line::command(&b"G1 X1 Y1 E1"[..]));
        assert_eq!(layer.lines[3], Line::command(&b"T0"[..]));
    }

    #[test]
    fn test_other_tool_marked() {
        let mut layer = first_layer(";START SCRIPT END\nG1 Z0.2\nT2\nG1 X1 Y1 E1\nT1\n", 0);
        assert_eq!(
            normalize_first_tool_change(&mut layer, MARKER),
            Some(FirstToolChange::Marked(2))
        );
        assert!(layer.lines[2].comment_is(MARKER));
        assert_eq!(layer.lines[3], Line::command(&b"T2"[..]));
        // The later tool change is left alone.
        assert_eq!(layer.lines.len(), 6);
        assert!(!layer.lines[4].comment_is(MARKER));
        assert_eq!(layer.marked_tool_changes(MARKER), vec![(3, 2)]);
    }

    #[test]
    fn test_no_tool_change() {
        let mut layer = first_layer(";START SCRIPT END\nG1 X1 Y1 E1\n", 0);
        assert_eq!(normalize_first_tool_change(&mut layer, MARKER), None);
        assert_eq!(layer.lines.len(), 2);
    }
}
