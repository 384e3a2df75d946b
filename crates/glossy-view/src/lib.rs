//! Reflection layers that react to the broadcast offset.

pub mod control;
pub mod layer;
pub mod reflex;

pub use control::ManualOffsetControl;
pub use layer::{LayerKind, ReflexLayer};
pub use reflex::{Reflex, ReflexStyle};
