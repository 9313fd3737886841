// contact.rs - Overlap resolution
//
// Circles push each other apart; circles are pushed off static segments.
// Pure position correction, the integrator turns it into velocity.

use glam::Vec2;

use super::body::{Bodies, Shape};

#[inline]
fn collides(bodies: &Bodies, i: usize, j: usize) -> bool {
    let (gi, gj) = (bodies.group[i], bodies.group[j]);
    !(gi < 0 && gi == gj)
}

pub fn resolve(bodies: &mut Bodies) {
    let n = bodies.len();
    for i in 0..n {
        if bodies.is_static(i) {
            continue;
        }
        for j in 0..n {
            if i == j || !collides(bodies, i, j) {
                continue;
            }
            match bodies.shape[j] {
                // Dynamic pairs are handled once, from the lower index
                Shape::Circle if j > i => circle_circle(bodies, i, j),
                Shape::Segment { angle, length } => circle_segment(bodies, i, j, angle, length),
                _ => {}
            }
        }
    }
}

fn circle_circle(bodies: &mut Bodies, i: usize, j: usize) {
    let delta = bodies.pos[j] - bodies.pos[i];
    let min = bodies.radius[i] + bodies.radius[j];
    let dist_sq = delta.length_squared();
    if dist_sq >= min * min || dist_sq < 1e-12 {
        return;
    }

    let (wi, wj) = (bodies.inv_mass[i], bodies.inv_mass[j]);
    let total = wi + wj;
    if total == 0.0 {
        return;
    }

    let dist = dist_sq.sqrt();
    let push = delta / dist * (min - dist);
    bodies.pos[i] -= push * (wi / total);
    bodies.pos[j] += push * (wj / total);
}

fn circle_segment(bodies: &mut Bodies, i: usize, j: usize, angle: f32, length: f32) {
    let along = Vec2::new(angle.cos(), angle.sin());
    let half = length * 0.5;
    let offset = bodies.pos[i] - bodies.pos[j];
    let t = offset.dot(along).clamp(-half, half);
    let closest = bodies.pos[j] + along * t;

    let away = bodies.pos[i] - closest;
    let min = bodies.radius[i] + bodies.radius[j];
    let dist = away.length();
    if dist >= min {
        return;
    }

    let normal = if dist > 1e-6 { away / dist } else { along.perp() };
    bodies.pos[i] += normal * (min - dist);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_circles_separate() {
        let mut bodies = Bodies::new();
        bodies.push(Vec2::ZERO, 5.0, 1.0, 0.0, 0, Shape::Circle);
        bodies.push(Vec2::new(6.0, 0.0), 5.0, 1.0, 0.0, 0, Shape::Circle);
        resolve(&mut bodies);
        assert!(bodies.pos[0].distance(bodies.pos[1]) >= 10.0 - 1e-4);
    }

    #[test]
    fn same_negative_group_passes_through() {
        let mut bodies = Bodies::new();
        bodies.push(Vec2::ZERO, 5.0, 1.0, 0.0, -3, Shape::Circle);
        bodies.push(Vec2::new(6.0, 0.0), 5.0, 1.0, 0.0, -3, Shape::Circle);
        resolve(&mut bodies);
        assert_eq!(bodies.pos[1], Vec2::new(6.0, 0.0));
    }

    #[test]
    fn circle_is_pushed_off_segment() {
        let mut bodies = Bodies::new();
        let bar = Shape::Segment { angle: 0.0, length: 100.0 };
        bodies.push(Vec2::ZERO, 0.5, 0.0, 0.0, 0, bar);
        bodies.push(Vec2::new(10.0, 2.0), 4.0, 1.0, 0.0, 0, Shape::Circle);
        resolve(&mut bodies);
        assert!((bodies.pos[1].y - 4.5).abs() < 1e-4);
        assert_eq!(bodies.pos[0], Vec2::ZERO);
    }
}
