// geometry.rs - Plain 2D helpers
//
// No state, no allocation beyond what callers hand in.

use glam::Vec2;
use std::f32::consts::TAU;

/// Point on a circle at `angle` radians
#[inline]
pub fn on_circle(center: Vec2, radius: f32, angle: f32) -> Vec2 {
    center + Vec2::new(angle.cos(), angle.sin()) * radius
}

/// Length of the chord between two adjacent vertices of a regular n-gon
#[inline]
pub fn chord_length(radius: f32, n: usize) -> f32 {
    let step = TAU / n as f32;
    on_circle(Vec2::ZERO, radius, step).distance(on_circle(Vec2::ZERO, radius, step * 2.0))
}

/// Average of a point set, zero for an empty set
pub fn centroid(points: &[Vec2]) -> Vec2 {
    if points.is_empty() {
        return Vec2::ZERO;
    }
    points.iter().copied().sum::<Vec2>() / points.len() as f32
}

/// Even-odd ray cast. Works for any simple polygon, winding irrelevant.
pub fn point_in_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > point.y) != (b.y > point.y) {
            let x = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Snap to one decimal, rounding down, so subpixel noise doesn't flicker
#[inline]
pub fn pixel_perfect(v: Vec2) -> Vec2 {
    Vec2::new((v.x * 10.0).floor() * 0.1, (v.y * 10.0).floor() * 0.1)
}

/// Unit vector from `from` to `to`; `fallback` when the points coincide
#[inline]
pub fn direction(from: Vec2, to: Vec2, fallback: Vec2) -> Vec2 {
    (to - from).try_normalize().unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ]
    }

    #[test]
    fn polygon_contains_center() {
        assert!(point_in_polygon(Vec2::new(5.0, 5.0), &square()));
    }

    #[test]
    fn polygon_rejects_far_point() {
        assert!(!point_in_polygon(Vec2::new(500.0, -300.0), &square()));
        assert!(!point_in_polygon(Vec2::new(11.0, 5.0), &square()));
    }

    #[test]
    fn polygon_winding_does_not_matter() {
        let mut reversed = square();
        reversed.reverse();
        assert!(point_in_polygon(Vec2::new(2.0, 8.0), &reversed));
    }

    #[test]
    fn degenerate_polygon_contains_nothing() {
        assert!(!point_in_polygon(Vec2::ZERO, &[Vec2::ZERO, Vec2::X]));
    }

    #[test]
    fn chord_matches_closed_form() {
        let expected = 2.0 * 240.0 * (std::f32::consts::PI / 24.0).sin();
        assert!((chord_length(240.0, 24) - expected).abs() < 1e-3);
    }

    #[test]
    fn pixel_perfect_floors_to_tenths() {
        let v = pixel_perfect(Vec2::new(12.3456, -0.04));
        assert!((v.x - 12.3).abs() < 1e-4);
        assert!((v.y + 0.1).abs() < 1e-4);
    }

    #[test]
    fn direction_falls_back_on_coincident_points() {
        assert_eq!(direction(Vec2::ONE, Vec2::ONE, Vec2::Y), Vec2::Y);
    }
}
