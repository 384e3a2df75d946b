use crate::layer::ReflexLayer;
use glam::DVec2;
use std::sync::Arc;

/// Positions reflections by hand instead of (or on top of) device motion.
///
/// Slider and scroll input set the initial offset of every attached layer.
pub struct ManualOffsetControl {
    layers: Vec<Arc<ReflexLayer>>,
    value: DVec2,
    /// Sliders are clamped to `[-range, range]`.
    range: f64,
    /// Offset change per scroll unit.
    scroll_sensitivity: f64,
}

impl ManualOffsetControl {
    pub fn new(range: f64, scroll_sensitivity: f64) -> Self {
        Self {
            layers: Vec::new(),
            value: DVec2::ZERO,
            range: range.abs(),
            scroll_sensitivity,
        }
    }

    /// Start controlling `layer`. The control adopts the layer's current
    /// initial offset if it is the first one attached.
    pub fn attach(&mut self, layer: Arc<ReflexLayer>) {
        if self.layers.is_empty() {
            self.value = self.clamp(layer.initial_offset());
        }
        layer.set_initial_offset(self.value);
        tracing::debug!(layer = layer.name(), "Layer attached to manual control");
        self.layers.push(layer);
    }

    pub fn value(&self) -> DVec2 {
        self.value
    }

    pub fn set_slider_x(&mut self, x: f64) {
        self.set_value(DVec2::new(x, self.value.y));
    }

    pub fn set_slider_y(&mut self, y: f64) {
        self.set_value(DVec2::new(self.value.x, y));
    }

    pub fn set_value(&mut self, value: DVec2) {
        self.value = self.clamp(value);
        for layer in &self.layers {
            layer.set_initial_offset(self.value);
        }
    }

    /// Nudge the value by a scroll delta. Returns the new value.
    pub fn on_scroll(&mut self, delta: DVec2) -> DVec2 {
        self.set_value(self.value + delta * self.scroll_sensitivity);
        self.value
    }

    fn clamp(&self, value: DVec2) -> DVec2 {
        value.clamp(DVec2::splat(-self.range), DVec2::splat(self.range))
    }
}

impl Default for ManualOffsetControl {
    fn default() -> Self {
        Self::new(1.0, 0.01)
    }
}
