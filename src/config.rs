//! Tuning parameters.
//!
//! Every magic number of the simulation lives here with its default. A page can
//! override any subset by passing JSON; missing fields fall back to defaults.

use serde::{Deserialize, Serialize};

use crate::error::{BlobError, Result};

/// Top-level tuning container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub physics: PhysicsTuning,
    pub blob: BlobTuning,
    pub dish: DishTuning,
    pub cluster: ClusterTuning,
    pub render: RenderTuning,
}

impl Config {
    /// Parse a (possibly partial) JSON object and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let b = &self.blob;
        let d = &self.dish;
        let c = &self.cluster;

        if b.segments < 3 {
            return invalid(format!("blob.segments must be at least 3, got {}", b.segments));
        }
        if d.segments < 3 {
            return invalid(format!("dish.segments must be at least 3, got {}", d.segments));
        }
        if c.blobs == 0 {
            return invalid("cluster.blobs must be at least 1".into());
        }
        if c.palette.is_empty() || c.palette.iter().any(|&s| !(s > 0.0)) {
            return invalid("cluster.palette needs at least one positive size".into());
        }
        for (name, value) in [
            ("blob.base_radius", b.base_radius),
            ("blob.initial_scale", b.initial_scale),
            ("blob.init_strength", b.init_strength),
            ("blob.grow_strength", b.grow_strength),
            ("blob.min_strength", b.min_strength),
            ("blob.scale_epsilon", b.scale_epsilon),
            ("cluster.scale_unit", c.scale_unit),
            ("cluster.fps", c.fps),
            ("render.blow_up_rate", self.render.blow_up_rate),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return invalid(format!("{} must be positive, got {}", name, value));
            }
        }
        if c.rotation_min_ticks > c.rotation_max_ticks {
            return invalid(format!(
                "cluster.rotation_min_ticks ({}) exceeds rotation_max_ticks ({})",
                c.rotation_min_ticks, c.rotation_max_ticks
            ));
        }
        if !(d.ease > 0.0 && d.ease <= 1.0) {
            return invalid(format!("dish.ease must be in (0, 1], got {}", d.ease));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> Result<()> {
    Err(BlobError::InvalidConfig(msg))
}

/// Physics world integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    /// Constraint solver passes per step
    pub constraint_iterations: usize,
    /// Contact resolution passes per step
    pub position_iterations: usize,
    /// Fraction of velocity lost to air per step, ring nodes
    pub node_friction_air: f32,
    /// Fraction of velocity lost to air per step, anchor
    pub anchor_friction_air: f32,
    /// Thickness of static dish segments
    pub segment_thickness: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            constraint_iterations: 2,
            position_iterations: 2,
            node_friction_air: 0.5,
            anchor_friction_air: 0.5,
            segment_thickness: 1.0,
        }
    }
}

/// Soft body and growth model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobTuning {
    /// Ring nodes per blob
    pub segments: usize,
    /// Ring radius at scale 1.0 (px)
    pub base_radius: f32,
    /// Scale every blob starts from before its INIT growth
    pub initial_scale: f32,

    pub ring_stiffness: f32,
    pub ring_damping: f32,
    /// Next-but-one ring springs
    pub skip_stiffness: f32,
    pub skip_damping: f32,

    /// Anchor springs while growing or shrinking
    pub anchor_stiffness_tight: f32,
    /// Anchor springs at rest
    pub anchor_stiffness_loose: f32,
    pub anchor_damping: f32,
    /// Fraction of the remaining stiffness gap closed per resting tick
    pub loosen_rate: f32,

    /// Responsiveness of the INIT growth (larger = slower)
    pub init_strength: f32,
    /// Responsiveness of scaleTo/reset growth (larger = slower)
    pub grow_strength: f32,
    /// Lower clamp applied to any strength
    pub min_strength: f32,
    /// A scale this close to its target counts as arrived
    pub scale_epsilon: f32,
    /// Smallest relative change a growth step makes
    pub min_step: f32,

    /// Length of a rotation bout
    pub rotation_ticks: u32,
    /// Anchor displacement per rotation tick (px)
    pub rotation_step: f32,
    /// Nodes escaping the dish are pulled back to this fraction of its radius
    pub dish_shell: f32,
}

impl Default for BlobTuning {
    fn default() -> Self {
        Self {
            segments: 24,
            base_radius: 14.0,
            initial_scale: 1.0,
            ring_stiffness: 0.01,
            ring_damping: 0.1,
            skip_stiffness: 0.01,
            skip_damping: 0.001,
            anchor_stiffness_tight: 0.05,
            anchor_stiffness_loose: 0.005,
            anchor_damping: 0.05,
            loosen_rate: 0.1,
            init_strength: 24.0,
            grow_strength: 32.0,
            min_strength: 1.0,
            scale_epsilon: 0.01,
            min_step: 0.001,
            rotation_ticks: 180,
            rotation_step: 0.5,
            dish_shell: 0.98,
        }
    }
}

/// Container ring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DishTuning {
    pub segments: usize,
    /// Fraction of the remaining distance covered per tick
    pub ease: f32,
    /// Position snap distance (px)
    pub position_epsilon: f32,
    /// Relative radius snap threshold
    pub radius_epsilon: f32,
    /// Outer dish is this much wider (px)
    pub outer_gap: f32,
}

impl Default for DishTuning {
    fn default() -> Self {
        Self {
            segments: 24,
            ease: 0.1,
            position_epsilon: 0.5,
            radius_epsilon: 0.001,
            outer_gap: 4.0,
        }
    }
}

/// Layout and interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterTuning {
    pub blobs: usize,
    /// Relative rest sizes, cycled over slots
    pub palette: Vec<f32>,

    pub dish_diagonal_ratio: f32,
    pub dish_left_ratio: f32,
    pub dish_top_ratio: f32,
    /// Blob placement radius as a fraction of the dish radius
    pub placement_ratio: f32,
    pub blob_ratio: f32,
    /// Dish radius units per scale step
    pub scale_unit: f32,
    pub highlight_ratio: f32,
    /// How much of a dish resize is passed on to blob rest scales
    pub resize_damping: f32,

    /// Simulation ticks per second
    pub fps: f32,
    pub pointer_interval_ms: f64,
    pub resize_interval_ms: f64,

    pub rotation_min_ticks: u32,
    pub rotation_max_ticks: u32,
    pub nudge_strength: f32,

    /// Fixed RNG seed; random when absent
    pub seed: Option<u64>,
}

impl Default for ClusterTuning {
    fn default() -> Self {
        Self {
            blobs: 4,
            palette: vec![1.0, 0.8, 0.7, 0.5],
            dish_diagonal_ratio: 0.4,
            dish_left_ratio: 0.05,
            dish_top_ratio: 0.45,
            placement_ratio: 0.5,
            blob_ratio: 0.6,
            scale_unit: 24.0,
            highlight_ratio: 0.65,
            resize_damping: 0.66667,
            fps: 60.0,
            pointer_interval_ms: 200.0,
            resize_interval_ms: 200.0,
            rotation_min_ticks: 300,
            rotation_max_ticks: 600,
            nudge_strength: 0.1,
            seed: None,
        }
    }
}

/// Curve output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderTuning {
    /// Push curve points outward by the node radius
    pub curve_outset_enabled: bool,
    /// Emit spring and dish wireframes
    pub debug_render_enabled: bool,
    /// K in the blow-up multiplier 1 + t^2 / K
    pub blow_up_rate: f32,
    /// Distance beyond the viewport a blow-up must reach (px)
    pub blow_up_margin: f32,
}

impl Default for RenderTuning {
    fn default() -> Self {
        Self {
            curve_outset_enabled: true,
            debug_render_enabled: false,
            blow_up_rate: 30.0,
            blow_up_margin: 50.0,
        }
    }
}
