//! Leptos DragDrop Utilities
//!
//! Drag-to-reorder for flat Leptos lists (sections, or items inside one section).
//! Uses a movement threshold to distinguish a tap/click from a drag.
//!
//! The gesture state itself ([`DragSession`]) and the [`reorder`] function are
//! plain Rust so they can be shared with non-UI code; the mouse and touch
//! bindings are compiled with the `dom` feature.

mod session;

#[cfg(feature = "dom")]
mod dom;

pub use session::{reorder, DragSession, DropOutcome};

#[cfg(feature = "dom")]
pub use dom::*;

/// Movement threshold in pixels to start dragging
pub const DRAG_THRESHOLD_PX: i32 = 5;

/// Whether a pointer moved far enough from its press position to count as a drag
pub fn exceeds_threshold(dx: i32, dy: i32) -> bool {
    dx.abs() > DRAG_THRESHOLD_PX || dy.abs() > DRAG_THRESHOLD_PX
}
