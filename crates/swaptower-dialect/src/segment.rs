//! Layer segmentation: split a line stream into layers at layer markers.

use swaptower_gcode::{is_z_move, Line};

use crate::layer::Layer;

/// A layer start marker: the slicer's layer number and Z height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerMarker {
    /// Layer number.
    pub num: u32,
    /// Layer Z height (mm).
    pub z: f64,
}

/// Split lines into layers.
///
/// A marker comment only arms the layer change; the layer closes at the
/// next Z move, because slicers can emit the marker several lines before
/// the move. Marker 0 gives the first layer its Z instead of opening a
/// second layer. Every line, including the Z move, goes to the layer that
/// is current when it is read.
///
/// A layer's height is its Z minus the previous layer's Z. A zero delta
/// (several blocks printed at one Z) reuses the last non-zero height.
pub fn segment_layers<F>(
    lines: impl IntoIterator<Item = Line>,
    marker: F,
    first_layer_height: f64,
) -> Vec<Layer>
where
    F: Fn(&[u8]) -> Option<LayerMarker>,
{
    let mut layers = Vec::new();
    let mut current = Layer::first(first_layer_height, first_layer_height);
    let mut last_height = first_layer_height;
    let mut pending: Option<LayerMarker> = None;

    for line in lines {
        if let Some(found) = line.comment.as_deref().and_then(&marker) {
            pending = Some(found);
        }

        if let (Some(cmd), Some(next)) = (line.command.as_deref(), pending) {
            if is_z_move(cmd) {
                pending = None;
                if current.is_first() && layers.is_empty() && next.num == 0 {
                    current.z = next.z;
                    current.height = next.z;
                    last_height = next.z;
                } else {
                    let mut height = next.z - current.z;
                    if height == 0.0 {
                        height = last_height;
                    } else {
                        last_height = height;
                    }
                    let next_layer = Layer::new(next.num, next.z, height);
                    let closed = std::mem::replace(&mut current, next_layer);
                    log::trace!("layer {} closed with {} lines", closed.num, closed.lines.len());
                    layers.push(closed);
                }
            }
        }

        current.add_line(line);
    }

    layers.push(current);
    layers
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use swaptower_gcode::parse_lines;

    fn marker(comment: &[u8]) -> Option<LayerMarker> {
        let text = std::str::from_utf8(comment).ok()?;
        let mut parts = text.strip_prefix("LAYER ")?.split(' ');
        Some(LayerMarker {
            num: parts.next()?.parse().ok()?,
            z: parts.next()?.parse().ok()?,
        })
    }

    fn segment(src: &str) -> Vec<Layer> {
        segment_layers(parse_lines(src.as_bytes()), marker, 0.2)
    }

    #[test]
    fn test_first_marker_sets_first_layer_z() {
        let layers = segment(
            "G28\n;START SCRIPT END\n;LAYER 0 0.3\nG1 Z0.3\nG1 X1 Y1 E1\n;LAYER 1 0.5\nG1 Z0.5\nG1 X2 Y2 E1\n",
        );
        assert_eq!(layers.len(), 2);
        assert!(layers[0].is_first());
        assert_relative_eq!(layers[0].z, 0.3);
        assert_eq!(layers[0].lines.len(), 6);
        assert_eq!(layers[1].num, 1);
        assert_relative_eq!(layers[1].z, 0.5);
        assert_relative_eq!(layers[1].height, 0.2, epsilon = 1e-9);
        assert_eq!(layers[1].lines.len(), 2);
    }

    #[test]
    fn test_transition_waits_for_z_move() {
        let layers = segment(
            ";LAYER 0 0.2\nG1 Z0.2\nG1 X1 Y1 E1\n;LAYER 1 0.4\nG1 X5 Y5\nG1 E-1\nG1 Z0.4\nG1 X1 Y1 E1\n",
        );
        assert_eq!(layers.len(), 2);
        // The travel and retract after the marker still belong to layer 0.
        assert_eq!(layers[0].lines.len(), 6);
        assert_eq!(layers[1].lines[0], Line::command(&b"G1 Z0.4"[..]));
    }

    #[test]
    fn test_duplicate_z_carries_height() {
        let layers = segment(
            ";LAYER 0 0.2\nG1 Z0.2\n;LAYER 1 0.4\nG1 Z0.4\n;LAYER 2 0.4\nG1 Z0.4\n;LAYER 3 0.6\nG1 Z0.6\n",
        );
        assert_eq!(layers.len(), 4);
        assert_relative_eq!(layers[0].height, 0.2);
        assert_relative_eq!(layers[1].height, 0.2, epsilon = 1e-9);
        assert_eq!(layers[2].height, layers[1].height);
        assert_relative_eq!(layers[3].height, 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_without_markers_single_layer() {
        let layers = segment("G28\nG1 Z5\nG1 X1 Y1 E1\n");
        assert_eq!(layers.len(), 1);
        assert!(layers[0].is_first());
        assert_relative_eq!(layers[0].z, 0.2);
        assert_eq!(layers[0].lines.len(), 3);
    }
}
