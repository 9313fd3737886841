// render.rs - Blob silhouettes as smooth closed curves
//
// Each ring node is pushed outward from the blob centre by the outset, then
// the curve runs through the midpoints of neighbouring points using the
// points themselves as quadratic control points. Output is an SVG path
// string per slot plus optional wireframe lines for debugging.

use glam::Vec2;
use std::fmt::Write;

use crate::config::RenderTuning;
use crate::geometry::{direction, pixel_perfect};
use crate::physics::World;
use crate::sim::{Blob, Dish};

/// Closed quadratic spline: start point plus (control, end) pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurvePath {
    pub start: Vec2,
    pub segments: Vec<(Vec2, Vec2)>,
}

impl CurvePath {
    /// Smooth closed curve around `points` (angular order). Empty for fewer
    /// than three points.
    pub fn through(points: &[Vec2], center: Vec2, outset: f32) -> Self {
        let n = points.len();
        if n < 3 {
            return Self::default();
        }

        let projected: Vec<Vec2> = points
            .iter()
            .map(|&p| pixel_perfect(p + direction(center, p, Vec2::ZERO) * outset))
            .collect();

        let start = pixel_perfect((projected[0] + projected[1]) * 0.5);
        let mut segments = Vec::with_capacity(n);
        let mut v1 = projected[1];
        for i in 2..n + 2 {
            let v2 = projected[i % n];
            segments.push((v1, pixel_perfect((v1 + v2) * 0.5)));
            v1 = v2;
        }

        Self { start, segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// `M x y Q cx cy x y ... Z`
    pub fn to_svg(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut d = String::with_capacity(self.segments.len() * 32);
        let _ = write!(d, "M{:.1} {:.1}", self.start.x, self.start.y);
        for (c, e) in &self.segments {
            let _ = write!(d, " Q{:.1} {:.1} {:.1} {:.1}", c.x, c.y, e.x, e.y);
        }
        d.push_str(" Z");
        d
    }

    /// Flat [x, y, cx, cy, x, y, ...] starting with the start point
    pub fn to_flat(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(2 + self.segments.len() * 4);
        out.extend_from_slice(&[self.start.x, self.start.y]);
        for (c, e) in &self.segments {
            out.extend_from_slice(&[c.x, c.y, e.x, e.y]);
        }
        out
    }

    /// Every control and end point
    pub fn points(&self) -> impl Iterator<Item = Vec2> + '_ {
        std::iter::once(self.start).chain(self.segments.iter().flat_map(|&(c, e)| [c, e]))
    }
}

/// Terminal expand-and-exit animation of the activated blob
pub struct BlowUp {
    slot: usize,
    center: Vec2,
    points: Vec<Vec2>,
    outset: f32,
    frame: u32,
    rate: f32,
    margin: f32,
    done: bool,
}

impl BlowUp {
    pub fn new(slot: usize, center: Vec2, points: Vec<Vec2>, outset: f32, tuning: &RenderTuning) -> Self {
        // Nodes sitting on the centre would never leave
        let n = points.len().max(1) as f32;
        let points = points
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                if p.distance(center) < 1.0 {
                    let angle = i as f32 / n * std::f32::consts::TAU;
                    center + Vec2::new(angle.cos(), angle.sin())
                } else {
                    p
                }
            })
            .collect();

        Self {
            slot,
            center,
            points,
            outset,
            frame: 0,
            rate: tuning.blow_up_rate,
            margin: tuning.blow_up_margin,
            done: false,
        }
    }

    /// Next frame of the curve, `None` once every point has left the viewport
    pub fn advance(&mut self, viewport: Vec2) -> Option<CurvePath> {
        if self.done {
            return None;
        }

        self.frame += 1;
        let t = self.frame as f32;
        let multiplier = 1.0 + t * t / self.rate;
        let pushed: Vec<Vec2> = self
            .points
            .iter()
            .map(|&p| self.center + (p - self.center) * multiplier)
            .collect();

        let path = CurvePath::through(&pushed, self.center, self.outset);
        if path.points().all(|p| self.outside(p, viewport)) {
            self.done = true;
        }
        Some(path)
    }

    #[inline]
    fn outside(&self, p: Vec2, viewport: Vec2) -> bool {
        let m = self.margin;
        p.x < -m || p.y < -m || p.x > viewport.x + m || p.y > viewport.y + m
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }
}

/// Node radius pushes the curve out to the visible rim of the ring
fn outset(tuning: &RenderTuning, blob: &Blob, world: &World) -> f32 {
    if tuning.curve_outset_enabled { blob.node_radius(world) } else { 0.0 }
}

/// What the page shows for one blob slot
pub struct Layer {
    pub pattern: String,
    pub image: Option<String>,
    pub path: CurvePath,
}

pub struct Renderer {
    layers: Vec<Layer>,
    blow_up: Option<BlowUp>,
    debug_lines: Vec<[f32; 4]>,
    tuning: RenderTuning,
}

impl Renderer {
    pub fn new(patterns: &[String], tuning: &RenderTuning) -> Self {
        Self {
            layers: patterns
                .iter()
                .map(|p| Layer { pattern: p.clone(), image: None, path: CurvePath::default() })
                .collect(),
            blow_up: None,
            debug_lines: Vec::new(),
            tuning: tuning.clone(),
        }
    }

    /// Rebuild every slot's curve from the world. The blown up slot is left
    /// to its own animation.
    pub fn draw(&mut self, blobs: &[Blob], dishes: &[&Dish], world: &World) {
        let frozen = self.blow_up.as_ref().map(|b| b.slot());

        for (layer, blob) in self.layers.iter_mut().zip(blobs) {
            if Some(blob.slot()) == frozen {
                continue;
            }
            let outset = outset(&self.tuning, blob, world);
            layer.path = CurvePath::through(&blob.ring_positions(world), blob.center(world), outset);
        }

        if self.tuning.debug_render_enabled {
            self.debug_lines.clear();
            for blob in blobs {
                for (a, b, _) in blob.spring_lines(world) {
                    self.debug_lines.push([a.x, a.y, b.x, b.y]);
                }
            }
            for dish in dishes {
                for &id in dish.segments() {
                    if let Some((a, b)) = world.segment_ends(id) {
                        self.debug_lines.push([a.x, a.y, b.x, b.y]);
                    }
                }
            }
        }
    }

    /// Freeze `blob` and start its blow-up
    pub fn blow_up(&mut self, blob: &Blob, world: &World) {
        if self.blow_up.is_some() {
            return;
        }
        let outset = outset(&self.tuning, blob, world);
        self.blow_up = Some(BlowUp::new(
            blob.slot(),
            blob.center(world),
            blob.ring_positions(world),
            outset,
            &self.tuning,
        ));
    }

    /// Advance the blow-up one frame. True while it still needs frames.
    pub fn advance_blow_up(&mut self, viewport: Vec2) -> bool {
        let Some(blow_up) = &mut self.blow_up else { return false };
        let slot = blow_up.slot();
        match blow_up.advance(viewport) {
            Some(path) => {
                if let Some(layer) = self.layers.get_mut(slot) {
                    layer.path = path;
                }
                !blow_up.is_done()
            }
            None => false,
        }
    }

    pub fn blow_up_state(&self) -> Option<&BlowUp> {
        self.blow_up.as_ref()
    }

    /// Bind an item image to a slot; `None` leaves the slot on its pattern
    pub fn set_image(&mut self, slot: usize, image: Option<&str>) {
        if let Some(layer) = self.layers.get_mut(slot) {
            layer.image = image.map(str::to_string);
        }
    }

    /// Drop every bound item image
    pub fn reset(&mut self) {
        for layer in &mut self.layers {
            layer.image = None;
        }
    }

    pub fn layer(&self, slot: usize) -> Option<&Layer> {
        self.layers.get(slot)
    }

    pub fn debug_lines(&self) -> &[[f32; 4]] {
        &self.debug_lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(center: Vec2, radius: f32, n: usize) -> Vec<Vec2> {
        (0..n)
            .map(|i| {
                let a = i as f32 / n as f32 * std::f32::consts::TAU;
                center + Vec2::new(a.cos(), a.sin()) * radius
            })
            .collect()
    }

    #[test]
    fn curve_closes_on_its_start() {
        let center = Vec2::new(200.0, 200.0);
        let path = CurvePath::through(&ring(center, 50.0, 12), center, 0.0);
        assert_eq!(path.segments.len(), 12);
        let last = path.segments.last().unwrap().1;
        assert!(last.distance(path.start) < 0.2);
    }

    #[test]
    fn outset_pushes_curve_outward() {
        let center = Vec2::new(200.0, 200.0);
        let points = ring(center, 50.0, 12);
        let plain = CurvePath::through(&points, center, 0.0);
        let bulged = CurvePath::through(&points, center, 5.0);
        let r = |p: &CurvePath| p.segments[0].0.distance(center);
        assert!((r(&bulged) - r(&plain) - 5.0).abs() < 0.2);
    }

    #[test]
    fn coordinates_are_snapped_to_tenths() {
        let center = Vec2::new(10.0, 10.0);
        let path = CurvePath::through(&ring(center, 7.77, 8), center, 1.234);
        for p in path.points() {
            for v in [p.x, p.y] {
                let tenths = v * 10.0;
                assert!((tenths - tenths.round()).abs() < 1e-2, "{} not snapped", v);
            }
        }
    }

    #[test]
    fn svg_path_shape() {
        let center = Vec2::new(100.0, 100.0);
        let svg = CurvePath::through(&ring(center, 30.0, 6), center, 0.0).to_svg();
        assert!(svg.starts_with('M'));
        assert!(svg.ends_with('Z'));
        assert_eq!(svg.matches('Q').count(), 6);
    }

    #[test]
    fn too_few_points_give_empty_path() {
        assert!(CurvePath::through(&[Vec2::ZERO, Vec2::X], Vec2::ZERO, 1.0).is_empty());
        assert_eq!(CurvePath::default().to_svg(), "");
    }

    fn drawn_radius(curve_outset_enabled: bool) -> f32 {
        use crate::config::{BlobTuning, PhysicsTuning};

        let mut world = World::new(&PhysicsTuning::default());
        let center = Vec2::new(300.0, 300.0);
        let mut blob = Blob::new(0, center, 4.0, &BlobTuning::default());
        blob.init(&mut world, &PhysicsTuning::default());

        let tuning = RenderTuning { curve_outset_enabled, ..RenderTuning::default() };
        let mut renderer = Renderer::new(&["p".to_string()], &tuning);
        renderer.draw(std::slice::from_ref(&blob), &[], &world);
        renderer.layer(0).unwrap().path.segments[0].0.distance(blob.center(&world))
    }

    #[test]
    fn renderer_outset_follows_tuning() {
        let bulge = drawn_radius(true) - drawn_radius(false);
        let node_radius = 14.0 * (std::f32::consts::PI / 24.0).sin();
        assert!((bulge - node_radius).abs() < 0.3, "bulge {}", bulge);
    }

    #[test]
    fn blow_up_leaves_viewport_and_stops() {
        let viewport = Vec2::new(1000.0, 800.0);
        let center = Vec2::new(500.0, 400.0);
        let mut blow_up = BlowUp::new(0, center, ring(center, 60.0, 24), 4.0, &RenderTuning::default());

        let mut frames = 0;
        while blow_up.advance(viewport).is_some() {
            frames += 1;
            assert!(frames < 200, "blow-up never left the viewport");
        }
        assert!(blow_up.is_done());
        assert!(blow_up.advance(viewport).is_none());
    }

    #[test]
    fn blow_up_handles_points_on_center() {
        let viewport = Vec2::new(1000.0, 800.0);
        let center = Vec2::new(500.0, 400.0);
        let mut points = ring(center, 60.0, 12);
        points[3] = center;
        let mut blow_up = BlowUp::new(0, center, points, 0.0, &RenderTuning::default());
        let mut frames = 0;
        while blow_up.advance(viewport).is_some() {
            frames += 1;
            assert!(frames < 1000);
        }
    }
}
