// body.rs - Rigid point bodies
//
// Structure-of-Arrays storage. A body is an index into every column.

use glam::Vec2;

/// Mass per unit area, same as matter-js
pub const DENSITY: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle,
    /// Thin static bar centred on the body position
    Segment { angle: f32, length: f32 },
}

pub struct Bodies {
    pub pos: Vec<Vec2>,
    pub prev: Vec<Vec2>,
    pub force: Vec<Vec2>,

    // For segments `radius` is half the thickness
    pub radius: Vec<f32>,
    pub inv_mass: Vec<f32>,
    pub friction_air: Vec<f32>,

    // Bodies sharing a negative group never collide
    pub group: Vec<i32>,
    pub shape: Vec<Shape>,
}

impl Bodies {
    pub fn new() -> Self {
        Self {
            pos: Vec::new(),
            prev: Vec::new(),
            force: Vec::new(),
            radius: Vec::new(),
            inv_mass: Vec::new(),
            friction_air: Vec::new(),
            group: Vec::new(),
            shape: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.pos.len()
    }

    pub fn clear(&mut self) {
        self.pos.clear();
        self.prev.clear();
        self.force.clear();
        self.radius.clear();
        self.inv_mass.clear();
        self.friction_air.clear();
        self.group.clear();
        self.shape.clear();
    }

    pub fn push(
        &mut self,
        pos: Vec2,
        radius: f32,
        inv_mass: f32,
        friction_air: f32,
        group: i32,
        shape: Shape,
    ) -> BodyId {
        let id = BodyId(self.len());
        self.pos.push(pos);
        self.prev.push(pos);
        self.force.push(Vec2::ZERO);
        self.radius.push(radius);
        self.inv_mass.push(inv_mass);
        self.friction_air.push(friction_air);
        self.group.push(group);
        self.shape.push(shape);
        id
    }

    #[inline]
    pub fn is_static(&self, i: usize) -> bool {
        self.inv_mass[i] == 0.0
    }

    /// Move by `delta` without touching velocity
    #[inline]
    pub fn shift(&mut self, i: usize, delta: Vec2) {
        self.pos[i] += delta;
        self.prev[i] += delta;
    }

    /// Verlet integration with air friction. Forces are consumed.
    pub fn integrate(&mut self) {
        for i in 0..self.len() {
            if self.is_static(i) {
                self.force[i] = Vec2::ZERO;
                continue;
            }

            let velocity = (self.pos[i] - self.prev[i]) * (1.0 - self.friction_air[i])
                + self.force[i] * self.inv_mass[i];

            self.prev[i] = self.pos[i];
            self.pos[i] += velocity;
            self.force[i] = Vec2::ZERO;
        }
    }
}

/// Inverse mass of a circle of `radius`
#[inline]
pub fn circle_inv_mass(radius: f32) -> f32 {
    let mass = DENSITY * std::f32::consts::PI * radius * radius;
    if mass > 0.0 { 1.0 / mass } else { 0.0 }
}
