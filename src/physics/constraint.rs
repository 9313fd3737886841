// constraint.rs - Distance springs between two bodies
//
// Position-based: each pass pulls both ends toward `length`, split by
// inverse mass. Damping removes relative velocity along the spring axis.

use super::body::{Bodies, BodyId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub a: BodyId,
    pub b: BodyId,
    /// Fraction of the length error corrected per pass, 0..=1
    pub stiffness: f32,
    /// Fraction of the relative axial velocity removed per pass, 0..=1
    pub damping: f32,
    /// Length the solver enforces
    pub length: f32,
}

impl Constraint {
    pub fn solve(&self, bodies: &mut Bodies) {
        let (a, b) = (self.a.0, self.b.0);
        let (wa, wb) = (bodies.inv_mass[a], bodies.inv_mass[b]);
        let total = wa + wb;
        if total == 0.0 {
            return;
        }

        let delta = bodies.pos[b] - bodies.pos[a];
        let current = delta.length();
        if current < 1e-6 {
            return;
        }

        let (share_a, share_b) = (wa / total, wb / total);
        let normal = delta / current;

        let correction = normal * (current - self.length) * self.stiffness;
        bodies.pos[a] += correction * share_a;
        bodies.pos[b] -= correction * share_b;

        if self.damping > 0.0 {
            let va = bodies.pos[a] - bodies.prev[a];
            let vb = bodies.pos[b] - bodies.prev[b];
            let axial = (vb - va).dot(normal) * self.damping;

            // Raising velocity means lowering the previous position
            bodies.prev[a] -= normal * axial * share_a;
            bodies.prev[b] += normal * axial * share_b;
        }
    }
}
