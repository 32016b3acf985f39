//! Outer perimeter rates used by the tower generator.

use crate::layer::Layer;

/// Stamp every layer with the outer perimeter speed and feed rate.
///
/// The rate is the same for every layer; per-layer values derived from
/// extrusion widths are not computed.
pub fn annotate_perimeter_rates(layers: &mut [Layer], speed: Option<f64>, feed_rate: f64) {
    for layer in layers {
        layer.outer_perimeter_speed = speed;
        layer.outer_perimeter_feed_rate = Some(feed_rate);
    }
}
