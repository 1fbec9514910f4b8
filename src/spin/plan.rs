//! Landing computation
//!
//! Decides, before anything moves, which slice ends under the pointer and
//! how far the wheel turns to get there.

use crate::consts::{FULL_CIRCLE, ROTATIONS};
use crate::slice::{SliceId, SliceSet};

/// Result of the landing computation for one spin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinPlan {
    /// Degrees per slice
    pub slice_width: f64,
    /// 1-based position of the target slice, 0 when the id matched nothing
    pub target_index: usize,
    /// Total rotation snapped to a slice boundary (before centering)
    pub rotation: f64,
    /// Slice that ends under the pointer (0-based)
    pub picked_index: usize,
    /// Shift that rests the pointer mid-slice instead of on a boundary
    pub centering_offset: f64,
    /// Accumulated angle the wheel starts from
    pub from: f64,
    /// Accumulated angle the wheel ends at
    pub to: f64,
}

/// Slice that ends under the pointer for a snapped `rotation`
pub fn picked_index(slice_count: usize, rotation: f64) -> usize {
    let n = slice_count as f64;
    let slice_width = FULL_CIRCLE / n;
    let picked = (n - (rotation % FULL_CIRCLE) / slice_width).round().max(0.0) as usize;
    if picked >= slice_count { picked % slice_count } else { picked }
}

/// Plan a spin towards `model_value`, continuing from `previous_rotation`.
///
/// Returns `None` for an empty set. The new accumulated angle starts from the
/// next full turn at or after `previous_rotation`, so repeated spins always
/// move forward while landing exactly where a single spin from rest would.
pub fn plan_spin(slices: &SliceSet, model_value: SliceId, previous_rotation: f64) -> Option<SpinPlan> {
    if slices.is_empty() {
        return None;
    }

    let count = slices.len();
    let slice_width = FULL_CIRCLE / count as f64;
    let target_index = slices.position_one_based(model_value);

    let current_angle = FULL_CIRCLE - slice_width * (target_index as f64 - 1.0);
    let total_rotation = current_angle + FULL_CIRCLE * ROTATIONS;
    let rotation = (total_rotation / slice_width).round() * slice_width;

    let picked_index = picked_index(count, rotation);

    let slice_size = slice_width + slice_width / 2.0;
    let centering_offset = slice_size - (slice_width * 2.0).round();

    let base = (previous_rotation / FULL_CIRCLE).ceil() * FULL_CIRCLE;
    Some(SpinPlan {
        slice_width,
        target_index,
        rotation,
        picked_index,
        centering_offset,
        from: previous_rotation,
        to: base + rotation + centering_offset,
    })
}
