// physics/ - Soft body world
//
// Owns every body and spring of the cluster. Blobs and dishes keep ids into
// it and never store positions themselves. One `step` per simulation tick.

mod body;
mod constraint;
mod contact;

pub use body::BodyId;
pub use constraint::{Constraint, ConstraintId};

use body::{Bodies, Shape, circle_inv_mass};
use glam::Vec2;

use crate::config::PhysicsTuning;

pub struct World {
    bodies: Bodies,
    constraints: Vec<Constraint>,
    constraint_iterations: usize,
    position_iterations: usize,
    segment_thickness: f32,
}

impl World {
    pub fn new(tuning: &PhysicsTuning) -> Self {
        Self {
            bodies: Bodies::new(),
            constraints: Vec::new(),
            constraint_iterations: tuning.constraint_iterations.max(1),
            position_iterations: tuning.position_iterations,
            segment_thickness: tuning.segment_thickness,
        }
    }

    pub fn add_circle(&mut self, pos: Vec2, radius: f32, friction_air: f32, group: i32) -> BodyId {
        self.bodies.push(pos, radius, circle_inv_mass(radius), friction_air, group, Shape::Circle)
    }

    /// Static bar, `angle` is the direction of its long side
    pub fn add_segment(&mut self, center: Vec2, angle: f32, length: f32) -> BodyId {
        let shape = Shape::Segment { angle, length };
        self.bodies.push(center, self.segment_thickness * 0.5, 0.0, 0.0, 0, shape)
    }

    /// Spring whose length is the current distance between `a` and `b`
    pub fn add_constraint(&mut self, a: BodyId, b: BodyId, stiffness: f32, damping: f32) -> ConstraintId {
        let length = self.distance(a, b);
        let id = ConstraintId(self.constraints.len());
        self.constraints.push(Constraint { a, b, stiffness, damping, length });
        id
    }

    #[inline]
    pub fn position(&self, id: BodyId) -> Vec2 {
        self.bodies.pos[id.0]
    }

    #[inline]
    pub fn velocity(&self, id: BodyId) -> Vec2 {
        self.bodies.pos[id.0] - self.bodies.prev[id.0]
    }

    /// Teleport keeping the current velocity
    pub fn set_position(&mut self, id: BodyId, pos: Vec2) {
        let delta = pos - self.bodies.pos[id.0];
        self.bodies.shift(id.0, delta);
    }

    pub fn translate(&mut self, id: BodyId, delta: Vec2) {
        self.bodies.shift(id.0, delta);
    }

    pub fn apply_force(&mut self, id: BodyId, force: Vec2) {
        self.bodies.force[id.0] += force;
    }

    #[inline]
    pub fn radius(&self, id: BodyId) -> f32 {
        self.bodies.radius[id.0]
    }

    /// Uniform scale of a circle; mass follows area
    pub fn scale(&mut self, id: BodyId, factor: f32) {
        let i = id.0;
        if self.bodies.is_static(i) {
            return;
        }
        self.bodies.radius[i] *= factor;
        self.bodies.inv_mass[i] = circle_inv_mass(self.bodies.radius[i]);
    }

    /// Move and resize a static segment
    pub fn set_segment(&mut self, id: BodyId, center: Vec2, length: f32) {
        let i = id.0;
        if let Shape::Segment { angle, .. } = self.bodies.shape[i] {
            self.bodies.shape[i] = Shape::Segment { angle, length };
            self.bodies.pos[i] = center;
            self.bodies.prev[i] = center;
        }
    }

    /// End points of a segment, `None` for circles
    pub fn segment_ends(&self, id: BodyId) -> Option<(Vec2, Vec2)> {
        match self.bodies.shape[id.0] {
            Shape::Segment { angle, length } => {
                let half = Vec2::new(angle.cos(), angle.sin()) * length * 0.5;
                let c = self.bodies.pos[id.0];
                Some((c - half, c + half))
            }
            Shape::Circle => None,
        }
    }

    pub fn constraint(&self, id: ConstraintId) -> &Constraint {
        &self.constraints[id.0]
    }

    pub fn constraint_mut(&mut self, id: ConstraintId) -> &mut Constraint {
        &mut self.constraints[id.0]
    }

    #[inline]
    pub fn distance(&self, a: BodyId, b: BodyId) -> f32 {
        self.bodies.pos[a.0].distance(self.bodies.pos[b.0])
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Advance one tick: integrate, satisfy springs, resolve overlaps
    pub fn step(&mut self) {
        self.bodies.integrate();

        for _ in 0..self.constraint_iterations {
            for c in &self.constraints {
                c.solve(&mut self.bodies);
            }
        }

        for _ in 0..self.position_iterations {
            contact::resolve(&mut self.bodies);
        }
    }

    /// Drop every body and spring. Ids handed out before are dead afterwards.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.constraints.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        World::new(&PhysicsTuning::default())
    }

    #[test]
    fn body_at_rest_stays_put() {
        let mut w = world();
        let id = w.add_circle(Vec2::new(3.0, 4.0), 2.0, 0.1, 0);
        for _ in 0..10 {
            w.step();
        }
        assert_eq!(w.position(id), Vec2::new(3.0, 4.0));
    }

    #[test]
    fn force_moves_body_and_air_slows_it() {
        let mut w = world();
        let id = w.add_circle(Vec2::ZERO, 10.0, 0.5, 0);
        w.apply_force(id, Vec2::new(1.0, 0.0));
        w.step();
        let first = w.velocity(id).x;
        assert!(first > 0.0);
        w.step();
        assert!(w.velocity(id).x < first);
    }

    #[test]
    fn set_position_keeps_velocity() {
        let mut w = world();
        let id = w.add_circle(Vec2::ZERO, 10.0, 0.0, 0);
        w.apply_force(id, Vec2::new(0.0, 1.0));
        w.step();
        let v = w.velocity(id);
        w.set_position(id, Vec2::new(50.0, 50.0));
        assert!(w.velocity(id).distance(v) < 1e-4);
    }

    #[test]
    fn scaling_changes_radius_only_for_circles() {
        let mut w = world();
        let c = w.add_circle(Vec2::ZERO, 2.0, 0.0, 0);
        let s = w.add_segment(Vec2::new(100.0, 0.0), 0.0, 10.0);
        w.scale(c, 1.5);
        w.scale(s, 1.5);
        assert!((w.radius(c) - 3.0).abs() < 1e-6);
        assert!((w.radius(s) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn stretched_spring_contracts() {
        let mut w = world();
        let a = w.add_circle(Vec2::ZERO, 1.0, 0.5, -1);
        let b = w.add_circle(Vec2::new(10.0, 0.0), 1.0, 0.5, -1);
        let c = w.add_constraint(a, b, 0.2, 0.0);
        w.constraint_mut(c).length = 5.0;
        for _ in 0..100 {
            w.step();
        }
        assert!((w.distance(a, b) - 5.0).abs() < 0.1);
    }

    #[test]
    fn segment_ends_span_length() {
        let mut w = world();
        let s = w.add_segment(Vec2::new(5.0, 5.0), std::f32::consts::FRAC_PI_2, 8.0);
        let (p, q) = w.segment_ends(s).unwrap();
        assert!((p.distance(q) - 8.0).abs() < 1e-4);
        w.set_segment(s, Vec2::ZERO, 4.0);
        let (p, q) = w.segment_ends(s).unwrap();
        assert!((p.distance(q) - 4.0).abs() < 1e-4);
    }

    #[test]
    fn clear_disposes_everything() {
        let mut w = world();
        let a = w.add_circle(Vec2::ZERO, 1.0, 0.0, 0);
        let b = w.add_circle(Vec2::X * 3.0, 1.0, 0.0, 0);
        w.add_constraint(a, b, 0.1, 0.0);
        w.clear();
        assert_eq!(w.body_count(), 0);
        assert_eq!(w.constraint_count(), 0);
    }
}
