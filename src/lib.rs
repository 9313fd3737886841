use glam::Vec2;
use js_sys::{Float32Array, Function};
use wasm_bindgen::prelude::*;

pub mod config;
pub mod error;
pub mod geometry;
pub mod physics;
pub mod render;
pub mod sim;

use config::Config;
use sim::{Cluster, ClusterEvent, Item};

// ============================================================================
// BLOB CLUSTER - Soft body blobs in a dish, drawn as SVG paths by the page
// ============================================================================

#[wasm_bindgen]
pub struct BlobApp {
    cluster: Cluster,
    listener: Option<Function>,
}

#[wasm_bindgen]
impl BlobApp {
    /// `items`: JSON array of `{ id, image? }`. `patterns`: JSON array of
    /// fill references, one per blob. `config`: optional partial tuning JSON.
    #[wasm_bindgen(constructor)]
    pub fn new(
        width: f32,
        height: f32,
        items: &str,
        patterns: &str,
        config: Option<String>,
    ) -> Result<BlobApp, JsError> {
        let mut config = match config {
            Some(json) => Config::from_json(&json)?,
            None => Config::default(),
        };
        if config.cluster.seed.is_none() {
            config.cluster.seed = Some((js_sys::Math::random() * u32::MAX as f64) as u64);
        }

        let items: Vec<Item> = serde_json::from_str(items).map_err(error::BlobError::from)?;
        let patterns: Vec<String> = serde_json::from_str(patterns).map_err(error::BlobError::from)?;

        Ok(Self {
            cluster: Cluster::new(config, width, height, items, patterns)?,
            listener: None,
        })
    }

    /// Called with `(name, payload)` for "initialized", "activated" (item id)
    /// and "hover" (slot)
    pub fn on_event(&mut self, callback: Function) {
        self.listener = Some(callback);
    }

    pub fn init(&mut self) {
        self.cluster.init();
    }

    /// Drive from requestAnimationFrame. False once no more frames are needed.
    pub fn frame(&mut self, now: f64) -> bool {
        let more = self.cluster.frame(now);
        self.dispatch();
        more
    }

    pub fn highlight(&mut self, id: &str) -> bool {
        self.cluster.highlight(id)
    }

    pub fn activate(&mut self) -> bool {
        let done = self.cluster.activate();
        self.dispatch();
        done
    }

    pub fn reset(&mut self) {
        self.cluster.reset();
    }

    pub fn hover(&mut self) -> bool {
        self.cluster.hover()
    }

    pub fn run(&mut self) {
        self.cluster.run();
    }

    pub fn stop(&mut self) {
        self.cluster.stop();
    }

    pub fn destroy(&mut self) {
        self.cluster.destroy();
        self.listener = None;
    }

    pub fn pointer_move(&mut self, x: f32, y: f32, now: f64) {
        self.cluster.pointer_move(Vec2::new(x, y), now);
        self.dispatch();
    }

    pub fn resize(&mut self, width: f32, height: f32, now: f64) {
        self.cluster.container_resize(width, height, now);
    }

    pub fn image_loaded(&mut self, id: &str) -> bool {
        self.cluster.image_loaded(id)
    }

    // Accessors for the page
    pub fn blob_count(&self) -> usize { self.cluster.blobs().len() }
    pub fn is_initialized(&self) -> bool { self.cluster.is_initialized() }
    pub fn is_running(&self) -> bool { self.cluster.is_running() }

    /// SVG `d` attribute for a slot
    pub fn path(&self, slot: usize) -> String {
        self.cluster.renderer().layer(slot).map(|l| l.path.to_svg()).unwrap_or_default()
    }

    /// Flat curve points for canvas drawing
    pub fn points(&self, slot: usize) -> Float32Array {
        let flat = self.cluster.renderer().layer(slot).map(|l| l.path.to_flat()).unwrap_or_default();
        Float32Array::from(flat.as_slice())
    }

    pub fn pattern(&self, slot: usize) -> Option<String> {
        self.cluster.renderer().layer(slot).map(|l| l.pattern.clone())
    }

    pub fn image(&self, slot: usize) -> Option<String> {
        self.cluster.renderer().layer(slot).and_then(|l| l.image.clone())
    }

    /// Wireframe as [x1, y1, x2, y2, ...], empty unless debug rendering is on
    pub fn debug_lines(&self) -> Float32Array {
        let flat: Vec<f32> = self.cluster.renderer().debug_lines().iter().flatten().copied().collect();
        Float32Array::from(flat.as_slice())
    }

    fn dispatch(&mut self) {
        let events = self.cluster.drain_events();
        let Some(listener) = &self.listener else { return };
        for event in events {
            let payload = match &event {
                ClusterEvent::Initialized => JsValue::UNDEFINED,
                ClusterEvent::Activated { id } => id.as_deref().map_or(JsValue::NULL, JsValue::from_str),
                ClusterEvent::Hover { slot } => JsValue::from(*slot as u32),
            };
            if let Err(e) = listener.call2(&JsValue::NULL, &JsValue::from_str(event.name()), &payload) {
                tracing::warn!(event = event.name(), error = ?e, "event listener threw");
            }
        }
    }
}
