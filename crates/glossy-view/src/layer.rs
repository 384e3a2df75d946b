use crate::reflex::Reflex;
use glam::DVec2;
use glossy_broadcast::Offsetable;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// How a layer turns its offset into a reflection position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LayerKind {
    /// Image style: offset is scaled by the tile period and wrapped so the
    /// tiled reflection never runs out.
    #[default]
    Wrapped,
    /// Label style: offset is used as a direct displacement.
    Linear,
}

/// A glossy visual component's reflection layer.
///
/// Every setter re-lays out immediately; `position` always reflects the
/// latest inputs.
pub struct ReflexLayer {
    name: String,
    kind: LayerKind,
    state: Mutex<LayerState>,
}

struct LayerState {
    offset: DVec2,
    initial_offset: DVec2,
    reflex: Reflex,
    tile_size: DVec2,
    position: DVec2,
}

impl ReflexLayer {
    pub fn new(name: impl Into<String>, kind: LayerKind, reflex: Reflex, tile_size: DVec2) -> Self {
        let layer = Self {
            name: name.into(),
            kind,
            state: Mutex::new(LayerState {
                offset: DVec2::ZERO,
                initial_offset: DVec2::ZERO,
                reflex,
                tile_size,
                position: DVec2::ZERO,
            }),
        };
        layer.relayout(&mut layer.state());
        layer
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Set the offset directly, bypassing the broadcaster.
    pub fn set_offset(&self, offset: DVec2) {
        let mut state = self.state();
        state.offset = offset;
        self.relayout(&mut state);
    }

    /// Constant bias added to every offset.
    pub fn set_initial_offset(&self, initial_offset: DVec2) {
        let mut state = self.state();
        state.initial_offset = initial_offset;
        self.relayout(&mut state);
    }

    pub fn set_reflex(&self, reflex: Reflex) {
        let mut state = self.state();
        state.reflex = reflex;
        self.relayout(&mut state);
    }

    pub fn set_tile_size(&self, tile_size: DVec2) {
        let mut state = self.state();
        state.tile_size = tile_size;
        self.relayout(&mut state);
    }

    pub fn offset(&self) -> DVec2 {
        self.state().offset
    }

    pub fn initial_offset(&self) -> DVec2 {
        self.state().initial_offset
    }

    pub fn reflex(&self) -> Reflex {
        self.state().reflex
    }

    /// Displacement of the reflection centre from the layer centre.
    pub fn position(&self) -> DVec2 {
        self.state().position
    }

    fn relayout(&self, state: &mut LayerState) {
        let combined = state.offset + state.initial_offset;
        match self.kind {
            LayerKind::Linear => state.position = combined,
            LayerKind::Wrapped => {
                let period = state.reflex.period(state.tile_size);
                // Unsized layers keep their last position.
                if let Some(position) = wrap(combined * period, period) {
                    state.position = position;
                }
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, LayerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Offsetable for ReflexLayer {
    fn apply_offset(&self, offset: DVec2) {
        self.set_offset(offset);
    }
}

/// Fold `value` into `[-period, period]` per axis.
fn wrap(value: DVec2, period: DVec2) -> Option<DVec2> {
    if period.x <= 0.0 || period.y <= 0.0 {
        return None;
    }
    Some(DVec2::new(
        wrap_axis(value.x, period.x),
        wrap_axis(value.y, period.y),
    ))
}

fn wrap_axis(value: f64, period: f64) -> f64 {
    if value < -period {
        value + period * ((-period - value) / period).ceil()
    } else if value > period {
        value - period * ((value - period) / period).ceil()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: DVec2, b: DVec2) -> bool {
        a.abs_diff_eq(b, 1e-9)
    }

    fn wrapped(tile: f64, spacing: f64) -> ReflexLayer {
        ReflexLayer::new(
            "test",
            LayerKind::Wrapped,
            Reflex::default().with_spacing(spacing),
            DVec2::splat(tile),
        )
    }

    #[test]
    fn wrap_axis_folds_into_period() {
        assert_eq!(wrap_axis(50.0, 100.0), 50.0);
        assert_eq!(wrap_axis(100.0, 100.0), 100.0);
        assert_eq!(wrap_axis(-100.0, 100.0), -100.0);
        assert_eq!(wrap_axis(250.0, 100.0), 50.0);
        assert_eq!(wrap_axis(-250.0, 100.0), -50.0);
        assert_eq!(wrap_axis(-200.0, 100.0), -100.0);
        assert_eq!(wrap_axis(200.0, 100.0), 100.0);
    }

    #[test]
    fn wrap_survives_non_finite_input() {
        assert!(wrap_axis(f64::INFINITY, 100.0).is_nan());
        assert!(wrap_axis(f64::NAN, 100.0).is_nan());
    }

    #[test]
    fn wrapped_layer_scales_by_period() {
        let layer = wrapped(90.0, 10.0);
        layer.apply_offset(DVec2::new(0.5, -0.25));
        assert!(approx(layer.position(), DVec2::new(50.0, -25.0)));
    }

    #[test]
    fn wrapped_layer_adds_initial_offset_and_wraps() {
        let layer = wrapped(100.0, 0.0);
        layer.set_initial_offset(DVec2::new(0.0, -0.8));
        layer.apply_offset(DVec2::new(2.3, -1.0));
        // x: 230 -> 30, y: -180 -> -80
        assert!(approx(layer.position(), DVec2::new(30.0, -80.0)));
        assert_eq!(layer.offset(), DVec2::new(2.3, -1.0));
        assert_eq!(layer.initial_offset(), DVec2::new(0.0, -0.8));
    }

    #[test]
    fn unsized_layer_keeps_last_position() {
        let layer = wrapped(100.0, 0.0);
        layer.apply_offset(DVec2::new(0.5, 0.5));
        layer.set_tile_size(DVec2::ZERO);
        layer.apply_offset(DVec2::new(0.1, 0.1));
        assert!(approx(layer.position(), DVec2::new(50.0, 50.0)));
        assert_eq!(layer.offset(), DVec2::new(0.1, 0.1));

        layer.set_tile_size(DVec2::splat(100.0));
        assert!(approx(layer.position(), DVec2::new(10.0, 10.0)));
    }

    #[test]
    fn reflex_change_relays_out() {
        let layer = wrapped(100.0, 0.0);
        layer.apply_offset(DVec2::new(0.5, 0.0));
        layer.set_reflex(Reflex::default().with_spacing(100.0));
        assert!(approx(layer.position(), DVec2::new(100.0, 0.0)));
        assert_eq!(layer.reflex().spacing, 100.0);
    }

    #[test]
    fn linear_layer_is_a_plain_sum() {
        let layer = ReflexLayer::new("label", LayerKind::Linear, Reflex::default(), DVec2::ZERO);
        layer.set_initial_offset(DVec2::new(-0.01, -0.5));
        layer.apply_offset(DVec2::new(3.0, 1.0));
        assert!(approx(layer.position(), DVec2::new(2.99, 0.5)));
        assert_eq!(layer.kind(), LayerKind::Linear);
        assert_eq!(layer.name(), "label");
    }
}
