// dish.rs - Circular container
//
// A ring of static bars tiling the circumference. Segment count and angular
// spacing never change; centre and radius ease toward their targets.

use glam::Vec2;
use std::f32::consts::{FRAC_PI_2, TAU};

use crate::config::DishTuning;
use crate::geometry::{chord_length, on_circle};
use crate::physics::{BodyId, World};

pub struct Dish {
    position: Vec2,
    target_position: Vec2,
    radius: f32,
    target_radius: f32,

    num: usize,
    segments: Vec<BodyId>,

    ease: f32,
    position_epsilon: f32,
    radius_epsilon: f32,
}

impl Dish {
    pub fn new(world: &mut World, position: Vec2, num: usize, radius: f32, tuning: &DishTuning) -> Self {
        let width = chord_length(radius, num);
        let segments = (0..num)
            .map(|i| {
                let angle = Self::angle_of(i, num);
                world.add_segment(on_circle(position, radius, angle), angle + FRAC_PI_2, width)
            })
            .collect();

        Self {
            position,
            target_position: position,
            radius,
            target_radius: radius,
            num,
            segments,
            ease: tuning.ease,
            position_epsilon: tuning.position_epsilon,
            radius_epsilon: tuning.radius_epsilon,
        }
    }

    #[inline]
    fn angle_of(i: usize, num: usize) -> f32 {
        i as f32 * TAU / num as f32
    }

    pub fn move_to(&mut self, target: Vec2) {
        self.target_position = target;
    }

    pub fn resize_to(&mut self, target: f32) {
        self.target_radius = target;
    }

    /// Ease a fixed fraction of the remaining distance; snap when close
    pub fn update(&mut self, world: &mut World) {
        let offset = self.target_position - self.position;
        let scale_gap = self.target_radius / self.radius - 1.0;

        if offset.length() <= self.position_epsilon && scale_gap.abs() <= self.radius_epsilon {
            self.target_position = self.position;
            self.target_radius = self.radius;
            return;
        }

        self.position += offset * self.ease;
        self.radius += (self.target_radius - self.radius) * self.ease;
        self.place_segments(world);
    }

    fn place_segments(&self, world: &mut World) {
        let width = self.segment_width();
        for (i, &id) in self.segments.iter().enumerate() {
            let center = on_circle(self.position, self.radius, Self::angle_of(i, self.num));
            world.set_segment(id, center, width);
        }
    }

    pub fn is_settled(&self) -> bool {
        self.target_position == self.position && self.target_radius == self.radius
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn target_radius(&self) -> f32 {
        self.target_radius
    }

    pub fn segments(&self) -> &[BodyId] {
        &self.segments
    }

    /// Angle covered by one segment
    pub fn segment_span(&self) -> f32 {
        TAU / self.num as f32
    }

    /// Chord between adjacent vertices at the current radius
    pub fn segment_width(&self) -> f32 {
        chord_length(self.radius, self.num)
    }
}
