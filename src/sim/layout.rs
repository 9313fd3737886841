// layout.rs - Dish placement and blob sizing from the container size
//
// Pure functions, all sizes in container pixels.

use glam::Vec2;
use std::f32::consts::TAU;

use crate::config::ClusterTuning;
use crate::error::{BlobError, Result};
use crate::geometry::on_circle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DishLayout {
    pub origin: Vec2,
    pub radius: f32,
}

/// Reject containers that would give degenerate geometry
pub fn container_size(width: f32, height: f32) -> Result<Vec2> {
    if width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite() {
        Ok(Vec2::new(width, height))
    } else {
        Err(BlobError::InvalidContainer { width, height })
    }
}

/// Dish radius follows the container diagonal; the dish hugs the left edge
pub fn dish_layout(size: Vec2, tuning: &ClusterTuning) -> DishLayout {
    let radius = size.length() * tuning.dish_diagonal_ratio;
    let origin = Vec2::new(
        size.x * tuning.dish_left_ratio + radius,
        size.y * tuning.dish_top_ratio,
    );
    DishLayout { origin, radius }
}

/// Palette size for a slot, cycling
#[inline]
pub fn palette_size(slot: usize, tuning: &ClusterTuning) -> f32 {
    tuning.palette[slot % tuning.palette.len()]
}

pub fn rest_scale(dish_radius: f32, slot: usize, tuning: &ClusterTuning) -> f32 {
    dish_radius * tuning.blob_ratio * palette_size(slot, tuning) / tuning.scale_unit
}

/// Target scale of a highlighted blob
pub fn highlight_scale(dish_radius: f32, tuning: &ClusterTuning) -> f32 {
    dish_radius / tuning.scale_unit * tuning.highlight_ratio
}

/// Scale of a non-highlighted blob while `chosen_rest` grows to `highlight`.
/// Shrinks by half the inverse of the chosen blob's growth.
pub fn yield_scale(rest: f32, chosen_rest: f32, highlight: f32) -> f32 {
    let inverse = chosen_rest / highlight;
    rest * (1.0 - (1.0 - inverse) / 2.0)
}

/// Even spacing on a circle inside the dish
pub fn slot_position(layout: DishLayout, slot: usize, count: usize, tuning: &ClusterTuning) -> Vec2 {
    let angle = slot as f32 / count as f32 * TAU;
    on_circle(layout.origin, layout.radius * tuning.placement_ratio, angle)
}

/// Factor applied to blob rest scales when the dish goes from `old` to `new`
pub fn resize_factor(old_radius: f32, new_radius: f32, tuning: &ClusterTuning) -> f32 {
    let dish_scale = new_radius / old_radius;
    1.0 + (dish_scale - 1.0) * tuning.resize_damping
}
