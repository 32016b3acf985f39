//! Purge tower slot allocation.
//!
//! Several layers can share one Z when the slicer prints objects or features
//! in separate blocks. Each tool change at a Z needs its own tower slot, but
//! widening the tower for a few isolated heights is wasteful, so the slot
//! count only grows after the demand has exceeded it at
//! [`PROMOTION_STREAK`] heights, scanning from the top of the print down.

use crate::layer::{Layer, LayerAction};

/// Number of heights whose demand must exceed the slot count before it grows.
pub const PROMOTION_STREAK: usize = 3;

/// Layers sharing one exact Z.
#[derive(Debug, Clone)]
struct ZGroup {
    z: f64,
    members: Vec<usize>,
}

/// Result of slot allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotPlan {
    /// Slot count reached at the bottom of the print.
    pub max_slots: usize,
    /// Indices of tagged layers, in layer order.
    pub filtered: Vec<usize>,
}

/// Slot count per Z group, for groups ordered from highest to lowest Z.
///
/// `required` holds the number of tool change layers in each group. The
/// slot count starts at 1; each group whose demand exceeds the current
/// count extends the streak, and the streak reaching [`PROMOTION_STREAK`]
/// raises the count to that group's demand. A promotion applies to the
/// group that triggered it and every group below.
pub fn plan_slots(required: &[usize]) -> Vec<usize> {
    let mut slots = 1;
    let mut streak = 0;
    required
        .iter()
        .map(|&demand| {
            if demand > slots {
                streak += 1;
            }
            if streak >= PROMOTION_STREAK {
                slots = demand;
                streak = 0;
            }
            slots
        })
        .collect()
}

/// Group layer indices by exact Z, highest Z first. Members keep layer order.
fn group_by_z(layers: &[Layer]) -> Vec<ZGroup> {
    let mut order: Vec<usize> = (0..layers.len()).collect();
    order.sort_by(|&a, &b| layers[b].z.total_cmp(&layers[a].z));

    let mut groups: Vec<ZGroup> = Vec::new();
    for index in order {
        let z = layers[index].z;
        match groups.last_mut() {
            Some(group) if group.z == z => group.members.push(index),
            _ => groups.push(ZGroup {
                z,
                members: vec![index],
            }),
        }
    }
    groups
}

/// Tag every layer with its tower role and slot count.
///
/// Within a Z group, tool change layers become [`LayerAction::ToolSwitch`];
/// the remaining layers fill the leftover slots with
/// [`LayerAction::Infill`] and the rest are [`LayerAction::Pass`].
pub fn allocate_slots(layers: &mut [Layer], tool_change_marker: &str) -> SlotPlan {
    let switches: Vec<bool> = layers
        .iter()
        .map(|layer| layer.has_tool_changes(tool_change_marker))
        .collect();

    let groups = group_by_z(layers);
    let required: Vec<usize> = groups
        .iter()
        .map(|g| g.members.iter().filter(|&&i| switches[i]).count())
        .collect();
    let slots = plan_slots(&required);

    for (group, &group_slots) in groups.iter().zip(&slots) {
        if group_slots == 0 {
            continue;
        }
        let mut filled = 0;
        for &i in &group.members {
            layers[i].tower_slots = group_slots;
            if switches[i] {
                layers[i].action = Some(LayerAction::ToolSwitch);
                filled += 1;
            }
        }
        for &i in group.members.iter().filter(|&&i| !switches[i]) {
            layers[i].action = if filled < group_slots {
                filled += 1;
                Some(LayerAction::Infill)
            } else {
                Some(LayerAction::Pass)
            };
        }
        log::trace!(
            "z {}: {} layers, {} slots",
            group.z,
            group.members.len(),
            group_slots
        );
    }

    let mut filtered: Vec<usize> = (0..layers.len())
        .filter(|&i| layers[i].action.is_some())
        .collect();
    filtered.sort_by_key(|&i| (layers[i].num, i));

    SlotPlan {
        max_slots: slots.last().copied().unwrap_or(1),
        filtered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swaptower_gcode::Line;

    const MARKER: &str = "TOOL CHANGE";

    fn layer(num: u32, z: f64, switch: bool) -> Layer {
        let mut layer = Layer::new(num, z, 0.2);
        layer.add_line(Line::command(format!("G1 Z{}", z)));
        if switch {
            layer.add_line(Line::comment(MARKER));
            layer.add_line(Line::command(&b"T1"[..]));
        }
        layer
    }

    #[test]
    fn test_plan_slots_needs_streak() {
        assert_eq!(plan_slots(&[1, 2, 2, 2, 1]), vec![1, 1, 1, 2, 2]);
    }

    #[test]
    fn test_plan_slots_isolated_spikes() {
        assert_eq!(plan_slots(&[3, 1, 0, 3, 1]), vec![1, 1, 1, 1, 1]);
        assert_eq!(plan_slots(&[]), Vec::<usize>::new());
    }

    #[test]
    fn test_plan_slots_streak_not_reset_by_low_demand() {
        assert_eq!(plan_slots(&[2, 0, 2, 1, 3, 3]), vec![1, 1, 1, 1, 3, 3]);
    }

    #[test]
    fn test_group_by_z_high_to_low() {
        let layers = vec![
            layer(0, 0.2, false),
            layer(1, 0.4, false),
            layer(2, 0.4, true),
            layer(3, 0.6, false),
        ];
        let groups = group_by_z(&layers);
        let members: Vec<Vec<usize>> = groups.iter().map(|g| g.members.clone()).collect();
        assert_eq!(members, vec![vec![3], vec![1, 2], vec![0]]);
    }

    #[test]
    fn test_allocate_tags_groups() {
        let mut layers = vec![
            layer(0, 0.2, false),
            layer(1, 0.4, true),
            layer(2, 0.4, false),
            layer(3, 0.4, false),
            layer(4, 0.6, false),
        ];
        let plan = allocate_slots(&mut layers, MARKER);

        assert_eq!(plan.max_slots, 1);
        assert_eq!(plan.filtered, vec![0, 1, 2, 3, 4]);
        assert_eq!(layers[1].action, Some(LayerAction::ToolSwitch));
        assert_eq!(layers[2].action, Some(LayerAction::Pass));
        assert_eq!(layers[3].action, Some(LayerAction::Pass));
        // No tool change at these heights, the slot is filled with infill.
        assert_eq!(layers[0].action, Some(LayerAction::Infill));
        assert_eq!(layers[4].action, Some(LayerAction::Infill));
        assert!(layers.iter().all(|l| l.tower_slots == 1));
    }

    #[test]
    fn test_allocate_promotes_to_two_slots() {
        // Two tool change blocks at each of the four lowest heights.
        let mut layers = Vec::new();
        let mut num = 0;
        for step in 1..=6 {
            let z = 0.2 * step as f64;
            let switches = if step <= 4 { 2 } else { 0 };
            for block in 0..3 {
                layers.push(layer(num, z, block < switches));
                num += 1;
            }
        }
        let plan = allocate_slots(&mut layers, MARKER);
        assert_eq!(plan.max_slots, 2);

        // Heights from the top: 6, 5 need 0; 4, 3 need 2 but the streak is
        // not yet long enough; 2 promotes; 1 keeps 2 slots.
        let slots_at = |step: usize| layers[(step - 1) * 3].tower_slots;
        assert_eq!(slots_at(6), 1);
        assert_eq!(slots_at(4), 1);
        assert_eq!(slots_at(3), 1);
        assert_eq!(slots_at(2), 2);
        assert_eq!(slots_at(1), 2);

        // Step 2 has two switches filling both slots, the third block passes.
        assert_eq!(layers[3].action, Some(LayerAction::ToolSwitch));
        assert_eq!(layers[4].action, Some(LayerAction::ToolSwitch));
        assert_eq!(layers[5].action, Some(LayerAction::Pass));
        // Step 5 has no switches: one infill block for its single slot.
        assert_eq!(layers[12].action, Some(LayerAction::Infill));
        assert_eq!(layers[13].action, Some(LayerAction::Pass));
    }

    #[test]
    fn test_filtered_restores_layer_order() {
        let mut layers = vec![
            layer(0, 0.2, false),
            layer(1, 0.6, true),
            layer(2, 0.4, false),
            layer(3, 0.6, false),
            layer(4, 0.2, true),
        ];
        let plan = allocate_slots(&mut layers, MARKER);
        let nums: Vec<u32> = plan.filtered.iter().map(|&i| layers[i].num).collect();
        assert_eq!(nums, vec![0, 1, 2, 3, 4]);
        assert!(nums.windows(2).all(|w| w[0] < w[1]));
    }
}
