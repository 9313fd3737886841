// blob.rs - Soft body ring and its growth state machine
//
// A blob is a ring of circular nodes around one anchor node. Every node is
// tied to its next and next-but-one neighbour and to the anchor. Scale only
// changes through `grow_step`, so the silhouette never jumps.

use glam::Vec2;
use std::f32::consts::{PI, TAU};
use tracing::debug;

use crate::config::{BlobTuning, PhysicsTuning};
use crate::geometry::{centroid, direction, on_circle, point_in_polygon};
use crate::physics::{BodyId, ConstraintId, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlobState {
    Init = 0,
    Rest = 1,
    Resetting = 10,
    Growing = 20,
    Shrinking = 21,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpringKind {
    /// Node to next node
    Ring,
    /// Node to next-but-one node
    Skip,
    /// Node to anchor
    Anchor,
}

struct Spring {
    id: ConstraintId,
    kind: SpringKind,
    // Length per unit of scale, fixed once INIT settles
    rest_length: f32,
}

struct SoftBody {
    nodes: Vec<BodyId>,
    anchor: BodyId,
    springs: Vec<Spring>,
}

struct Rotation {
    direction: f32,
    tick: u32,
}

/// Where the blob lives this tick
#[derive(Debug, Clone, Copy)]
pub struct DishFrame {
    pub origin: Vec2,
    pub radius: f32,
}

pub struct Blob {
    slot: usize,
    position: Vec2,
    num: usize,

    curr_scale: f32,
    dest_scale: f32,
    rest_scale: f32,
    state: BlobState,
    reached_rest: bool,

    body: Option<SoftBody>,
    rotation: Option<Rotation>,
    tuning: BlobTuning,
}

impl Blob {
    pub fn new(slot: usize, position: Vec2, rest_scale: f32, tuning: &BlobTuning) -> Self {
        Self {
            slot,
            position,
            num: tuning.segments,
            curr_scale: tuning.initial_scale,
            dest_scale: rest_scale,
            rest_scale,
            state: BlobState::Init,
            reached_rest: false,
            body: None,
            rotation: None,
            tuning: tuning.clone(),
        }
    }

    /// Create nodes, anchor and springs in the world
    pub fn init(&mut self, world: &mut World, physics: &PhysicsTuning) {
        if self.body.is_some() {
            return;
        }

        let t = &self.tuning;
        let group = -(self.slot as i32) - 1;
        let ring_radius = t.base_radius * self.curr_scale;
        let node_radius = t.base_radius * (PI / self.num as f32).sin() * self.curr_scale;

        let anchor = world.add_circle(self.position, node_radius, physics.anchor_friction_air, group);
        let nodes: Vec<BodyId> = (0..self.num)
            .map(|i| {
                let angle = i as f32 / self.num as f32 * TAU;
                let pos = on_circle(self.position, ring_radius, angle);
                world.add_circle(pos, node_radius, physics.node_friction_air, group)
            })
            .collect();

        let mut springs = Vec::with_capacity(self.num * 3);
        for i in 0..self.num {
            let j = (i + 1) % self.num;
            let k = (i + 2) % self.num;

            let kinds = [
                (nodes[j], SpringKind::Ring, t.ring_stiffness, t.ring_damping),
                (nodes[k], SpringKind::Skip, t.skip_stiffness, t.skip_damping),
                (anchor, SpringKind::Anchor, t.anchor_stiffness_tight, t.anchor_damping),
            ];
            for (other, kind, stiffness, damping) in kinds {
                let id = world.add_constraint(nodes[i], other, stiffness, damping);
                let rest_length = world.constraint(id).length / self.curr_scale;
                springs.push(Spring { id, kind, rest_length });
            }
        }

        self.body = Some(SoftBody { nodes, anchor, springs });
        debug!(slot = self.slot, nodes = self.num, rest_scale = self.rest_scale, "blob initialised");
    }

    /// One tick of the state machine, then dish containment
    pub fn update(&mut self, world: &mut World, dish: DishFrame) {
        if self.body.is_none() {
            return;
        }

        match self.state {
            BlobState::Init => {
                self.dest_scale = self.rest_scale;
                if self.grow_step(world, self.tuning.init_strength) {
                    self.snapshot_rest_lengths(world);
                    self.set_anchor_stiffness(world, self.tuning.anchor_stiffness_loose);
                    self.enter_rest();
                }
            }
            BlobState::Rest => {
                self.loosen(world);
                if self.rotation.is_some() {
                    self.rotate(world, dish.origin);
                }
            }
            BlobState::Resetting => {
                self.dest_scale = self.rest_scale;
                if self.arrived() {
                    self.settle(world);
                } else {
                    self.start_scaling(world);
                }
            }
            BlobState::Growing | BlobState::Shrinking => {
                if self.grow_step(world, self.tuning.grow_strength) {
                    self.settle(world);
                }
            }
        }

        self.keep_inside_dish(world, dish.origin, dish.radius);
    }

    /// Ease toward `dest_scale`. Returns true once within epsilon.
    ///
    /// amount = 1 + (dest - curr) / strength, kept at least `min_step` away
    /// from 1 and never past the target. Always positive because the target
    /// is positive.
    fn grow_step(&mut self, world: &mut World, strength: f32) -> bool {
        if self.arrived() {
            return true;
        }

        let amount = growth_amount(
            self.curr_scale,
            self.dest_scale,
            strength.max(self.tuning.min_strength),
            self.tuning.min_step,
        );
        self.apply_scale(world, amount);
        self.arrived()
    }

    fn apply_scale(&mut self, world: &mut World, amount: f32) {
        let Some(body) = &self.body else { return };

        for &node in &body.nodes {
            world.scale(node, amount);
        }
        for spring in &body.springs {
            world.constraint_mut(spring.id).length *= amount;
        }
        world.scale(body.anchor, amount);

        self.curr_scale *= amount;
    }

    #[inline]
    fn arrived(&self) -> bool {
        (self.dest_scale - self.curr_scale).abs() < self.tuning.scale_epsilon
    }

    fn start_scaling(&mut self, world: &mut World) {
        self.state = if self.dest_scale > self.curr_scale {
            BlobState::Growing
        } else {
            BlobState::Shrinking
        };
        self.set_anchor_stiffness(world, self.tuning.anchor_stiffness_tight);
    }

    fn settle(&mut self, world: &mut World) {
        // Re-derive enforced lengths so repeated scaling doesn't drift
        if let Some(body) = &self.body {
            for spring in &body.springs {
                world.constraint_mut(spring.id).length = spring.rest_length * self.curr_scale;
            }
        }
        self.enter_rest();
    }

    fn enter_rest(&mut self) {
        if !self.reached_rest {
            debug!(slot = self.slot, scale = self.curr_scale, "blob reached rest");
        }
        self.state = BlobState::Rest;
        self.reached_rest = true;
    }

    /// Lock in the relaxed shape INIT produced
    fn snapshot_rest_lengths(&mut self, world: &mut World) {
        let Some(body) = &mut self.body else { return };
        for spring in &mut body.springs {
            let c = world.constraint(spring.id);
            let measured = world.distance(c.a, c.b);
            world.constraint_mut(spring.id).length = measured;
            spring.rest_length = measured / self.curr_scale;
        }
    }

    fn set_anchor_stiffness(&self, world: &mut World, stiffness: f32) {
        let Some(body) = &self.body else { return };
        for spring in body.springs.iter().filter(|s| s.kind == SpringKind::Anchor) {
            world.constraint_mut(spring.id).stiffness = stiffness;
        }
    }

    /// Anchor springs drift back to their loose setting while resting
    fn loosen(&self, world: &mut World) {
        let Some(body) = &self.body else { return };
        let target = self.tuning.anchor_stiffness_loose;
        for spring in body.springs.iter().filter(|s| s.kind == SpringKind::Anchor) {
            let c = world.constraint_mut(spring.id);
            c.stiffness += (target - c.stiffness) * self.tuning.loosen_rate;
        }
    }

    /// Set a new target scale
    pub fn scale_to(&mut self, scale: f32, world: &mut World) {
        if !(scale > 0.0) || !scale.is_finite() {
            debug!(slot = self.slot, scale, "ignoring invalid target scale");
            return;
        }
        // INIT owns the target until the blob first settles
        if self.state == BlobState::Init {
            return;
        }

        self.dest_scale = scale;
        if self.arrived() {
            if self.state != BlobState::Rest {
                self.settle(world);
            }
        } else {
            self.start_scaling(world);
        }
    }

    /// Head back to the rest scale
    pub fn reset(&mut self) {
        if self.state == BlobState::Init {
            return;
        }
        self.dest_scale = self.rest_scale;
        self.state = BlobState::Resetting;
    }

    /// Viewport changed: rescale the rest size and move toward it
    pub fn resize(&mut self, factor: f32, world: &mut World) {
        if !(factor > 0.0) || !factor.is_finite() {
            return;
        }
        self.rest_scale *= factor;
        if self.state == BlobState::Init {
            self.dest_scale = self.rest_scale;
        } else {
            self.scale_to(self.rest_scale, world);
        }
    }

    /// Begin a rotation bout around the dish origin; +1 or -1
    pub fn start_rotation(&mut self, direction: f32) {
        self.rotation = Some(Rotation { direction: direction.signum(), tick: 0 });
    }

    pub fn is_rotating(&self) -> bool {
        self.rotation.is_some()
    }

    /// Step the anchor along the tangent of the dish. Full speed for the
    /// first three quarters of the bout, then a linear ramp to zero.
    fn rotate(&mut self, world: &mut World, origin: Vec2) {
        let (Some(body), Some(rotation)) = (&self.body, &mut self.rotation) else { return };

        let budget = self.tuning.rotation_ticks;
        if rotation.tick >= budget {
            self.rotation = None;
            return;
        }

        let ease_from = budget * 3 / 4;
        let factor = if rotation.tick >= ease_from {
            (budget - rotation.tick) as f32 / (budget - ease_from).max(1) as f32
        } else {
            1.0
        };

        let anchor = world.position(body.anchor);
        let tangent = direction(origin, anchor, Vec2::X).perp() * rotation.direction;
        world.translate(body.anchor, tangent * self.tuning.rotation_step * factor);

        rotation.tick += 1;
    }

    /// One-shot push of the anchor, perpendicular to the direction of `center`
    pub fn add_movement(&self, world: &mut World, center: Vec2, strength: f32, clockwise: bool) {
        let Some(body) = &self.body else { return };
        let anchor = world.position(body.anchor);
        let side = if clockwise { 1.0 } else { -1.0 };
        let push = direction(anchor, center, Vec2::X).perp() * side * strength * self.curr_scale;
        world.apply_force(body.anchor, push);
    }

    /// Pointer hit test against the ring polygon
    pub fn is_inside(&self, world: &World, point: Vec2) -> bool {
        point_in_polygon(point, &self.ring_positions(world))
    }

    /// Pull escaped nodes back just inside the dish
    pub fn keep_inside_dish(&self, world: &mut World, origin: Vec2, radius: f32) {
        let Some(body) = &self.body else { return };
        let shell = radius * self.tuning.dish_shell;

        for &node in body.nodes.iter().chain(std::iter::once(&body.anchor)) {
            let offset = world.position(node) - origin;
            if offset.length() > radius {
                world.set_position(node, origin + offset.normalize() * shell);
            }
        }
    }

    /// Ring node positions in angular order
    pub fn ring_positions(&self, world: &World) -> Vec<Vec2> {
        match &self.body {
            Some(body) => body.nodes.iter().map(|&n| world.position(n)).collect(),
            None => Vec::new(),
        }
    }

    /// Mean of the ring nodes
    pub fn center(&self, world: &World) -> Vec2 {
        match &self.body {
            Some(_) => centroid(&self.ring_positions(world)),
            None => self.position,
        }
    }

    pub fn anchor_position(&self, world: &World) -> Option<Vec2> {
        self.body.as_ref().map(|b| world.position(b.anchor))
    }

    /// Current node radius, zero before init
    pub fn node_radius(&self, world: &World) -> f32 {
        self.body
            .as_ref()
            .and_then(|b| b.nodes.first())
            .map_or(0.0, |&n| world.radius(n))
    }

    /// Spring end points, for wireframe output
    pub fn spring_lines(&self, world: &World) -> Vec<(Vec2, Vec2, SpringKind)> {
        let Some(body) = &self.body else { return Vec::new() };
        body.springs
            .iter()
            .map(|s| {
                let c = world.constraint(s.id);
                (world.position(c.a), world.position(c.b), s.kind)
            })
            .collect()
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn state(&self) -> BlobState {
        self.state
    }

    pub fn curr_scale(&self) -> f32 {
        self.curr_scale
    }

    pub fn dest_scale(&self) -> f32 {
        self.dest_scale
    }

    pub fn rest_scale(&self) -> f32 {
        self.rest_scale
    }

    /// True once the blob has settled into REST at least once
    pub fn reached_rest(&self) -> bool {
        self.reached_rest
    }
}

/// Multiplier for one growth step from `curr` toward `dest`
pub fn growth_amount(curr: f32, dest: f32, strength: f32, min_step: f32) -> f32 {
    let amount = 1.0 + (dest - curr) / strength;
    let exact = dest / curr;
    if dest > curr {
        amount.max(1.0 + min_step).min(exact)
    } else {
        amount.min(1.0 - min_step).max(exact)
    }
}
