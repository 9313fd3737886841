// sim/ - Blob cluster simulation
//
// The cluster owns the physics world, both dish rings and every blob. The
// host drives it with `frame(now)` once per animation frame; pointer and
// resize input arrive through throttles and take effect on later frames.
// Each entity type in its own module.

mod blob;
mod dish;
mod layout;
mod throttle;

pub use blob::{growth_amount, Blob, BlobState, DishFrame, SpringKind};
pub use dish::Dish;
pub use layout::{container_size, dish_layout, highlight_scale, rest_scale, DishLayout};
pub use throttle::{FrameLimiter, Throttle};

use std::collections::HashSet;

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{BlobError, Result};
use crate::physics::World;
use crate::render::Renderer;

const DEFAULT_SEED: u64 = 0xDEADBEEF;

/// Content that can be bound to a blob slot
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Item {
    #[serde(alias = "slug")]
    pub id: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Notifications for the host page
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterEvent {
    /// Every blob settled and every item image loaded. Fires once.
    Initialized,
    /// The highlighted blob was activated; carries the bound item id
    Activated { id: Option<String> },
    /// Pointer entered a different blob
    Hover { slot: usize },
}

impl ClusterEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClusterEvent::Initialized => "initialized",
            ClusterEvent::Activated { .. } => "activated",
            ClusterEvent::Hover { .. } => "hover",
        }
    }
}

/// Blob cluster controller
pub struct Cluster {
    config: Config,
    size: Vec2,

    // Entities
    world: World,
    dish: Dish,
    outer_dish: Dish,
    blobs: Vec<Blob>,

    // Output
    renderer: Renderer,

    // Content
    items: Vec<Item>,
    bindings: Vec<Option<usize>>,
    loaded: HashSet<String>,

    // Interaction
    current: Option<usize>,
    overblob: Option<usize>,
    nudged: Option<usize>,
    pointer: Throttle<Vec2>,
    resize: Throttle<Vec2>,
    frames: FrameLimiter,

    // Lifecycle
    started: bool,
    blobs_initialized: bool,
    initialized: bool,
    running: bool,
    listening: bool,
    disposed: bool,

    ticker: u64,
    next_rotation: u64,
    events: Vec<ClusterEvent>,
    rng: SmallRng,
}

impl Cluster {
    pub fn new(config: Config, width: f32, height: f32, items: Vec<Item>, patterns: Vec<String>) -> Result<Self> {
        config.validate()?;
        let size = container_size(width, height)?;

        let c = &config.cluster;
        if patterns.len() < c.blobs {
            return Err(BlobError::MissingPattern { blobs: c.blobs, patterns: patterns.len() });
        }

        let layout = dish_layout(size, c);
        let mut world = World::new(&config.physics);
        let dish = Dish::new(&mut world, layout.origin, config.dish.segments, layout.radius, &config.dish);
        let outer_dish = Dish::new(
            &mut world,
            layout.origin,
            config.dish.segments,
            layout.radius + config.dish.outer_gap,
            &config.dish,
        );

        let blobs = (0..c.blobs)
            .map(|slot| {
                let position = layout::slot_position(layout, slot, c.blobs, c);
                Blob::new(slot, position, rest_scale(layout.radius, slot, c), &config.blob)
            })
            .collect();

        let mut rng = SmallRng::seed_from_u64(c.seed.unwrap_or(DEFAULT_SEED));
        let next_rotation = rng.gen_range(c.rotation_min_ticks..=c.rotation_max_ticks) as u64;

        Ok(Self {
            size,
            world,
            dish,
            outer_dish,
            blobs,
            renderer: Renderer::new(&patterns[..c.blobs], &config.render),
            items,
            bindings: vec![None; c.blobs],
            loaded: HashSet::new(),
            current: None,
            overblob: None,
            nudged: None,
            pointer: Throttle::new(c.pointer_interval_ms),
            resize: Throttle::new(c.resize_interval_ms),
            frames: FrameLimiter::new(c.fps),
            started: false,
            blobs_initialized: false,
            initialized: false,
            running: false,
            listening: false,
            disposed: false,
            ticker: 0,
            next_rotation,
            events: Vec::new(),
            rng,
            config,
        })
    }

    /// Build the soft bodies, start listening to input and start ticking
    pub fn init(&mut self) {
        if self.started || self.disposed {
            return;
        }
        for blob in &mut self.blobs {
            blob.init(&mut self.world, &self.config.physics);
        }
        self.started = true;
        self.listening = true;
        self.running = true;
        info!(
            blobs = self.blobs.len(),
            bodies = self.world.body_count(),
            springs = self.world.constraint_count(),
            radius = self.dish.radius(),
            "cluster started"
        );
    }

    /// Host animation frame. Returns true while more frames are wanted.
    pub fn frame(&mut self, now: f64) -> bool {
        if self.renderer.blow_up_state().is_some() {
            return self.renderer.advance_blow_up(self.size);
        }
        if !self.running {
            return false;
        }

        if let Some(point) = self.pointer.poll(now) {
            self.handle_pointer(point);
        }
        if let Some(size) = self.resize.poll(now) {
            self.handle_resize(size);
        }
        if self.frames.ready(now) {
            self.tick();
        }
        true
    }

    /// One simulation step: dishes, blobs, world, then curves
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        self.ticker += 1;

        self.dish.update(&mut self.world);
        self.outer_dish.update(&mut self.world);

        let frame = DishFrame { origin: self.dish.position(), radius: self.dish.radius() };
        for blob in &mut self.blobs {
            blob.update(&mut self.world, frame);
        }

        self.check_ready();
        self.rotate_when_due();

        self.world.step();
        self.renderer.draw(&self.blobs, &[&self.dish, &self.outer_dish], &self.world);
    }

    fn check_ready(&mut self) {
        if !self.blobs_initialized && self.blobs.iter().all(Blob::reached_rest) {
            self.blobs_initialized = true;
            debug!(tick = self.ticker, "all blobs at rest");
        }
        if self.blobs_initialized && !self.initialized && self.images_loaded() {
            self.initialized = true;
            info!(tick = self.ticker, "cluster initialized");
            self.events.push(ClusterEvent::Initialized);
        }
    }

    fn images_loaded(&self) -> bool {
        self.items
            .iter()
            .filter(|item| item.image.is_some())
            .all(|item| self.loaded.contains(&item.id))
    }

    /// Every few seconds the whole cluster drifts around the dish
    fn rotate_when_due(&mut self) {
        if !self.blobs_initialized || self.ticker < self.next_rotation {
            return;
        }
        let c = &self.config.cluster;
        let direction = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        for blob in &mut self.blobs {
            blob.start_rotation(direction);
        }
        self.next_rotation = self.ticker + self.rng.gen_range(c.rotation_min_ticks..=c.rotation_max_ticks) as u64;
        debug!(direction, next = self.next_rotation, "rotation started");
    }

    /// Grow a blob for the item with `id` and shrink the rest. False until
    /// the cluster is initialized or when the id is unknown.
    pub fn highlight(&mut self, id: &str) -> bool {
        if !self.initialized || self.disposed || self.renderer.blow_up_state().is_some() {
            debug!(id, "highlight ignored");
            return false;
        }
        let Some(item) = self.items.iter().position(|item| item.id == id) else {
            debug!(id, "highlight of unknown item");
            return false;
        };

        let slot = pick_other(&mut self.rng, self.blobs.len(), self.current);
        let scale = highlight_scale(self.dish.target_radius(), &self.config.cluster);
        self.scale_blob(slot, scale);

        self.renderer.set_image(slot, self.items[item].image.as_deref());
        self.bindings[slot] = Some(item);
        self.current = Some(slot);
        debug!(id, slot, scale, "highlight");
        true
    }

    fn scale_blob(&mut self, slot: usize, scale: f32) {
        let chosen_rest = self.blobs[slot].rest_scale();
        for blob in &mut self.blobs {
            if blob.slot() == slot {
                blob.scale_to(scale, &mut self.world);
            } else {
                let target = layout::yield_scale(blob.rest_scale(), chosen_rest, scale);
                blob.scale_to(target, &mut self.world);
            }
        }
    }

    /// Blow up the highlighted blob and shut the cluster down
    pub fn activate(&mut self) -> bool {
        let Some(slot) = self.current else {
            debug!("activate without a highlighted blob");
            return false;
        };
        if self.disposed || self.renderer.blow_up_state().is_some() {
            return false;
        }

        self.stop();
        self.detach();
        self.renderer.blow_up(&self.blobs[slot], &self.world);

        let id = self.bindings[slot].map(|i| self.items[i].id.clone());
        info!(slot, id = id.as_deref().unwrap_or(""), "activated");
        self.events.push(ClusterEvent::Activated { id });
        true
    }

    /// Return every blob to its rest scale and forget the bound items
    pub fn reset(&mut self) {
        if self.disposed || self.renderer.blow_up_state().is_some() {
            return;
        }
        for blob in &mut self.blobs {
            blob.reset();
        }
        self.renderer.reset();
        self.bindings.fill(None);
        self.current = None;
        debug!("reset");
    }

    /// Nudge a blob around the dish, never the same one twice in a row
    pub fn hover(&mut self) -> bool {
        if !self.initialized || !self.running {
            return false;
        }
        let slot = pick_other(&mut self.rng, self.blobs.len(), self.nudged);
        let clockwise = self.rng.gen_bool(0.5);
        self.blobs[slot].add_movement(
            &mut self.world,
            self.dish.position(),
            self.config.cluster.nudge_strength,
            clockwise,
        );
        self.nudged = Some(slot);
        true
    }

    /// Pointer moved to `point` (container pixels)
    pub fn pointer_move(&mut self, point: Vec2, now: f64) {
        if !self.listening {
            return;
        }
        if let Some(point) = self.pointer.offer(point, now) {
            self.handle_pointer(point);
        }
    }

    fn handle_pointer(&mut self, point: Vec2) {
        if !self.initialized {
            return;
        }
        let Some(slot) = self.blobs.iter().position(|b| b.is_inside(&self.world, point)) else {
            return;
        };
        if self.overblob == Some(slot) {
            return;
        }
        self.overblob = Some(slot);
        self.randomize_scales(slot);
        self.events.push(ClusterEvent::Hover { slot });
    }

    /// Hovered blob takes the largest rest size, the others share the rest
    /// of the sizes in random order
    fn randomize_scales(&mut self, hovered: usize) {
        let mut sizes: Vec<f32> = self.blobs.iter().map(Blob::rest_scale).collect();
        sizes.sort_by(|a, b| b.total_cmp(a));
        let largest = sizes.remove(0);
        sizes.shuffle(&mut self.rng);

        let mut rest = sizes.into_iter();
        for blob in &mut self.blobs {
            let scale = if blob.slot() == hovered { largest } else { rest.next().unwrap_or(largest) };
            blob.scale_to(scale, &mut self.world);
        }
        debug!(hovered, "scales shuffled");
    }

    /// Container resized
    pub fn container_resize(&mut self, width: f32, height: f32, now: f64) {
        if !self.listening {
            return;
        }
        if let Some(size) = self.resize.offer(Vec2::new(width, height), now) {
            self.handle_resize(size);
        }
    }

    fn handle_resize(&mut self, size: Vec2) {
        let size = match container_size(size.x, size.y) {
            Ok(size) => size,
            Err(e) => {
                warn!(error = %e, "resize ignored");
                return;
            }
        };
        self.size = size;
        if !self.initialized {
            return;
        }

        let c = &self.config.cluster;
        let layout = dish_layout(size, c);
        let factor = layout::resize_factor(self.dish.radius(), layout.radius, c);
        for blob in &mut self.blobs {
            blob.resize(factor, &mut self.world);
        }

        self.dish.move_to(layout.origin);
        self.dish.resize_to(layout.radius);
        self.outer_dish.move_to(layout.origin);
        self.outer_dish.resize_to(layout.radius + self.config.dish.outer_gap);
        debug!(width = size.x, height = size.y, radius = layout.radius, factor, "resize");
    }

    /// An item image finished loading on the page
    pub fn image_loaded(&mut self, id: &str) -> bool {
        let known = self.items.iter().any(|item| item.id == id && item.image.is_some());
        if known {
            self.loaded.insert(id.to_string());
        }
        known
    }

    /// Resume ticking
    pub fn run(&mut self) {
        if !self.started || self.disposed || self.renderer.blow_up_state().is_some() {
            return;
        }
        self.running = true;
    }

    /// Pause ticking; the state is kept
    pub fn stop(&mut self) {
        self.running = false;
    }

    fn detach(&mut self) {
        self.listening = false;
        self.pointer.cancel();
        self.resize.cancel();
    }

    /// Stop everything and release the physics world
    pub fn destroy(&mut self) {
        if self.disposed {
            return;
        }
        self.stop();
        self.detach();
        self.world.clear();
        self.disposed = true;
        info!("cluster destroyed");
    }

    pub fn drain_events(&mut self) -> Vec<ClusterEvent> {
        std::mem::take(&mut self.events)
    }

    // Accessors
    pub fn blobs(&self) -> &[Blob] { &self.blobs }
    pub fn dish(&self) -> &Dish { &self.dish }
    pub fn outer_dish(&self) -> &Dish { &self.outer_dish }
    pub fn world(&self) -> &World { &self.world }
    pub fn renderer(&self) -> &Renderer { &self.renderer }
    pub fn current(&self) -> Option<usize> { self.current }
    pub fn size(&self) -> Vec2 { self.size }
    pub fn ticks(&self) -> u64 { self.ticker }
    pub fn is_initialized(&self) -> bool { self.initialized }
    pub fn is_running(&self) -> bool { self.running }
    pub fn is_listening(&self) -> bool { self.listening }
    pub fn is_disposed(&self) -> bool { self.disposed }

    /// Item bound to `slot`
    pub fn bound_item(&self, slot: usize) -> Option<&Item> {
        self.bindings.get(slot).copied().flatten().map(|i| &self.items[i])
    }
}

/// Uniform pick among `count` slots, excluding `previous` when possible
pub fn pick_other<R: Rng>(rng: &mut R, count: usize, previous: Option<usize>) -> usize {
    match previous {
        Some(prev) if count > 1 && prev < count => {
            let pick = rng.gen_range(0..count - 1);
            if pick >= prev { pick + 1 } else { pick }
        }
        _ => rng.gen_range(0..count.max(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<Item> {
        (1..=3)
            .map(|i| Item { id: format!("item-{}", i), image: Some(format!("img/{}.png", i)) })
            .collect()
    }

    fn patterns() -> Vec<String> {
        (0..4).map(|i| format!("url(#pattern-{})", i)).collect()
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.cluster.seed = Some(7);
        config
    }

    fn ready_cluster() -> Cluster {
        let mut cluster = Cluster::new(config(), 1000.0, 800.0, items(), patterns()).unwrap();
        cluster.init();
        for item in items() {
            cluster.image_loaded(&item.id);
        }
        for _ in 0..600 {
            cluster.tick();
            if cluster.is_initialized() {
                break;
            }
        }
        assert!(cluster.is_initialized());
        cluster
    }

    #[test]
    fn pick_other_never_repeats() {
        let mut rng = SmallRng::seed_from_u64(1);
        for prev in 0..4 {
            for _ in 0..50 {
                let pick = pick_other(&mut rng, 4, Some(prev));
                assert_ne!(pick, prev);
                assert!(pick < 4);
            }
        }
        assert_eq!(pick_other(&mut rng, 1, Some(0)), 0);
    }

    #[test]
    fn pick_other_reaches_every_other_slot() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[pick_other(&mut rng, 4, Some(2))] = true;
        }
        assert_eq!(seen, [true, true, false, true]);
    }

    #[test]
    fn rejects_missing_patterns() {
        let err = Cluster::new(config(), 800.0, 600.0, items(), vec!["a".into()]);
        assert!(matches!(err, Err(BlobError::MissingPattern { blobs: 4, patterns: 1 })));
    }

    #[test]
    fn rejects_bad_container() {
        let err = Cluster::new(config(), 0.0, 600.0, items(), patterns());
        assert!(matches!(err, Err(BlobError::InvalidContainer { .. })));
    }

    #[test]
    fn readiness_waits_for_images() {
        let mut cluster = Cluster::new(config(), 1000.0, 800.0, items(), patterns()).unwrap();
        cluster.init();
        for _ in 0..600 {
            cluster.tick();
        }
        assert!(!cluster.is_initialized());
        assert!(!cluster.highlight("item-1"));

        for item in items() {
            assert!(cluster.image_loaded(&item.id));
        }
        assert!(!cluster.image_loaded("nope"));
        cluster.tick();
        assert!(cluster.is_initialized());

        let events = cluster.drain_events();
        assert_eq!(events, vec![ClusterEvent::Initialized]);
        cluster.tick();
        assert!(cluster.drain_events().is_empty());
    }

    #[test]
    fn items_without_images_do_not_block() {
        let items = vec![Item { id: "bare".into(), image: None }];
        let mut cluster = Cluster::new(config(), 1000.0, 800.0, items, patterns()).unwrap();
        cluster.init();
        for _ in 0..600 {
            cluster.tick();
        }
        assert!(cluster.is_initialized());
    }

    #[test]
    fn highlight_grows_one_and_shrinks_others() {
        let mut cluster = ready_cluster();
        assert!(cluster.highlight("item-2"));
        let slot = cluster.current().unwrap();
        for blob in cluster.blobs() {
            if blob.slot() == slot {
                assert!(blob.dest_scale() > blob.rest_scale());
            } else {
                assert!(blob.dest_scale() < blob.rest_scale());
            }
        }
        assert_eq!(cluster.bound_item(slot).unwrap().id, "item-2");
        assert_eq!(cluster.renderer().layer(slot).unwrap().image.as_deref(), Some("img/2.png"));
    }

    #[test]
    fn highlight_unknown_changes_nothing() {
        let mut cluster = ready_cluster();
        let before: Vec<f32> = cluster.blobs().iter().map(Blob::dest_scale).collect();
        assert!(!cluster.highlight("unknown"));
        let after: Vec<f32> = cluster.blobs().iter().map(Blob::dest_scale).collect();
        assert_eq!(before, after);
        assert_eq!(cluster.current(), None);
    }

    #[test]
    fn imageless_item_clears_previous_image() {
        let items = vec![
            Item { id: "a".into(), image: Some("a.png".into()) },
            Item { id: "b".into(), image: Some("b.png".into()) },
            Item { id: "bare".into(), image: None },
        ];
        let mut cluster = Cluster::new(config(), 1000.0, 800.0, items, patterns()).unwrap();
        cluster.init();
        cluster.image_loaded("a");
        cluster.image_loaded("b");
        while !cluster.is_initialized() {
            cluster.tick();
            assert!(cluster.ticks() < 600);
        }

        for round in 0..50 {
            let id = ["a", "b", "bare"][round % 3];
            assert!(cluster.highlight(id));
            for slot in 0..cluster.blobs().len() {
                let bound = cluster.bound_item(slot).and_then(|item| item.image.clone());
                let shown = cluster.renderer().layer(slot).unwrap().image.clone();
                assert_eq!(bound, shown, "round {} slot {}", round, slot);
            }
        }
    }

    #[test]
    fn highlight_during_resize_uses_final_dish_size() {
        let mut cluster = ready_cluster();
        cluster.container_resize(2000.0, 1600.0, 0.0);
        cluster.tick();
        assert!(cluster.dish().radius() < cluster.dish().target_radius());

        cluster.highlight("item-1");
        let slot = cluster.current().unwrap();
        let expected = highlight_scale(cluster.dish().target_radius(), &config().cluster);
        assert_eq!(cluster.blobs()[slot].dest_scale(), expected);
    }

    #[test]
    fn consecutive_highlights_move_to_another_slot() {
        let mut cluster = ready_cluster();
        cluster.highlight("item-1");
        let first = cluster.current().unwrap();
        cluster.highlight("item-3");
        let second = cluster.current().unwrap();
        assert_ne!(first, second);

        let grown = cluster.blobs().iter().filter(|b| b.dest_scale() > b.rest_scale()).count();
        assert_eq!(grown, 1);
    }

    #[test]
    fn reset_returns_to_rest_and_unbinds() {
        let mut cluster = ready_cluster();
        cluster.highlight("item-1");
        let slot = cluster.current().unwrap();
        cluster.reset();
        assert_eq!(cluster.current(), None);
        assert!(cluster.bound_item(slot).is_none());
        for blob in cluster.blobs() {
            assert_eq!(blob.dest_scale(), blob.rest_scale());
        }
        assert!(!cluster.activate());
    }

    #[test]
    fn activate_blows_up_and_detaches() {
        let mut cluster = ready_cluster();
        cluster.drain_events();
        cluster.highlight("item-3");
        assert!(cluster.activate());
        assert!(!cluster.is_running());
        assert!(!cluster.is_listening());
        assert_eq!(
            cluster.drain_events(),
            vec![ClusterEvent::Activated { id: Some("item-3".into()) }]
        );
        assert!(!cluster.activate());

        let mut now = 0.0;
        let mut frames = 0;
        while cluster.frame(now) {
            now += 16.0;
            frames += 1;
            assert!(frames < 500);
        }
        assert!(cluster.renderer().blow_up_state().unwrap().is_done());
    }

    #[test]
    fn hover_never_nudges_same_blob_twice() {
        let mut cluster = ready_cluster();
        let mut previous = None;
        for _ in 0..20 {
            assert!(cluster.hover());
            assert_ne!(cluster.nudged, previous);
            previous = cluster.nudged;
        }
    }

    #[test]
    fn pointer_shuffle_gives_hovered_blob_the_largest_size() {
        let mut cluster = ready_cluster();
        cluster.drain_events();
        let target = cluster.blobs()[2].center(cluster.world());
        cluster.pointer_move(target, 0.0);

        let events = cluster.drain_events();
        let Some(ClusterEvent::Hover { slot }) = events.first().cloned() else {
            panic!("no hover event: {:?}", events);
        };
        let largest = cluster.blobs().iter().map(Blob::rest_scale).fold(0.0, f32::max);
        assert_eq!(cluster.blobs()[slot].dest_scale(), largest);

        // Same blob again: no new shuffle
        cluster.pointer_move(target, 1000.0);
        assert!(cluster.drain_events().is_empty());
    }

    #[test]
    fn resize_before_ready_only_records_size() {
        let mut cluster = Cluster::new(config(), 1000.0, 800.0, items(), patterns()).unwrap();
        cluster.init();
        let radius = cluster.dish().target_radius();
        cluster.container_resize(500.0, 400.0, 0.0);
        assert_eq!(cluster.size(), Vec2::new(500.0, 400.0));
        assert_eq!(cluster.dish().target_radius(), radius);
    }

    #[test]
    fn resize_moves_dish_and_scales_blobs() {
        let mut cluster = ready_cluster();
        let before: Vec<f32> = cluster.blobs().iter().map(Blob::rest_scale).collect();
        cluster.container_resize(2000.0, 1600.0, 0.0);
        assert!(cluster.dish().target_radius() > cluster.dish().radius());
        for (blob, old) in cluster.blobs().iter().zip(before) {
            assert!(blob.rest_scale() > old);
            assert!(blob.rest_scale() < old * 2.0);
        }
    }

    #[test]
    fn destroy_stops_everything() {
        let mut cluster = ready_cluster();
        cluster.destroy();
        assert!(cluster.is_disposed());
        assert_eq!(cluster.world().body_count(), 0);
        assert!(!cluster.highlight("item-1"));
        assert!(!cluster.hover());
        cluster.run();
        assert!(!cluster.is_running());
        assert!(!cluster.frame(0.0));
    }
}
