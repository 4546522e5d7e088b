//! Frame composition on the CPU via `vello_cpu`.

/// Background media preparation and per-frame lookup.
pub mod background;
/// The shared frame compositor and its geometry.
pub mod compositor;
pub(crate) mod color;
/// Rendered frame buffer type.
pub mod frame;
pub(crate) mod paint;

pub use background::{BackgroundFrame, BackgroundMedia};
pub use compositor::{Compositor, RenderGeometry};
pub use frame::FrameRGBA;
