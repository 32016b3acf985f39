//! Print settings scan: start script end and tool usage.

use std::collections::BTreeMap;

use swaptower_gcode::ToolTracker;

use crate::config::ProcessConfig;
use crate::error::{DialectError, Result};
use crate::layer::Layer;

/// Tools selected by slicer-issued tool changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolUsage {
    /// Tools in order of first use.
    pub tools: Vec<u8>,
    /// Z of the last layer in which each tool was selected.
    pub switch_heights: BTreeMap<u8, f64>,
    /// Highest Z at which any tool change happens.
    pub last_switch_height: f64,
}

/// Locate the start script end in the first layer and collect tool usage.
pub fn scan_print_settings(layers: &mut [Layer], config: &ProcessConfig) -> Result<ToolUsage> {
    let first = layers.first_mut().ok_or(DialectError::NoLayers)?;
    let start_end = first
        .lines
        .iter()
        .position(|line| line.comment_is(&config.start_script_marker))
        .ok_or_else(|| DialectError::MissingStartScriptEnd(config.start_script_marker.clone()))?;
    first.set_start_gcode_end(start_end);

    let mut usage = ToolUsage::default();
    let mut tracker = ToolTracker::new(Some(0));
    for layer in layers.iter() {
        for (index, _) in layer.marked_tool_changes(&config.tool_change_marker) {
            let Some(cmd) = layer.lines[index].command.as_deref() else {
                continue;
            };
            let Some(tool) = tracker.observe(cmd) else {
                continue;
            };
            log::debug!(
                "layer {} (z {}): T{} -> T{}",
                layer.num,
                layer.z,
                tracker.previous().map_or_else(|| "?".to_string(), |t| t.to_string()),
                tool
            );
            if !usage.tools.contains(&tool) {
                usage.tools.push(tool);
            }
            usage.switch_heights.insert(tool, layer.z);
        }
    }

    usage.last_switch_height = usage
        .switch_heights
        .values()
        .copied()
        .fold(0.0, f64::max);
    Ok(usage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use swaptower_gcode::parse_lines;

    fn layer(num: u32, z: f64, src: &str) -> Layer {
        let mut layer = if num == 0 {
            Layer::first(z, 0.2)
        } else {
            Layer::new(num, z, 0.2)
        };
        for line in parse_lines(src.as_bytes()) {
            layer.add_line(line);
        }
        layer
    }

    #[test]
    fn test_missing_start_script_end() {
        let mut layers = vec![layer(0, 0.2, "G28\nG1 Z0.2\n")];
        let err = scan_print_settings(&mut layers, &ProcessConfig::default()).unwrap_err();
        assert!(matches!(err, DialectError::MissingStartScriptEnd(_)));
    }

    #[test]
    fn test_tool_usage() {
        let mut layers = vec![
            layer(0, 0.2, ";TOOL CHANGE\nT3\n;START SCRIPT END\nG1 X1 Y1 E1\n"),
            layer(1, 0.4, ";TOOL CHANGE\nT2\nG1 X1 Y1 E1\n;TOOL CHANGE\nT1\n"),
            layer(2, 0.6, ";TOOL CHANGE\nT2\nG1 X1 Y1 E1\n"),
            layer(3, 0.8, "T0\nG1 X1 Y1 E1\n"),
        ];
        let usage = scan_print_settings(&mut layers, &ProcessConfig::default()).unwrap();
        assert_eq!(layers[0].start_gcode_end(), Some(2));
        assert_eq!(usage.tools, vec![2, 1]);
        assert_relative_eq!(usage.switch_heights[&2], 0.6);
        assert_relative_eq!(usage.switch_heights[&1], 0.4);
        assert_relative_eq!(usage.last_switch_height, 0.6);
    }

    #[test]
    fn test_no_tool_changes() {
        let mut layers = vec![layer(0, 0.2, ";START SCRIPT END\nG1 X1 Y1 E1\n")];
        let usage = scan_print_settings(&mut layers, &ProcessConfig::default()).unwrap();
        assert!(usage.tools.is_empty());
        assert_relative_eq!(usage.last_switch_height, 0.0);
    }
}
