//! teledash-types: Shared data types for the teledash engine.
//!
//! This crate contains pure data types (frames, widget kinds, actions,
//! sample buffers) shared across the teledash crates. These types have no
//! engine or runtime dependencies, making them suitable as a foundation
//! layer.

pub mod action;
pub mod buffer;
pub mod frame;
pub mod widget;

// Re-export commonly used types at the crate root for convenience
pub use action::{Action, TimerMode};
pub use buffer::{Point3, RingBuffer};
pub use frame::{Dataset, Frame, Group};
pub use widget::WidgetKind;
