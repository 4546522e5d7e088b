//! Shared primitives: error taxonomy, frame-rate arithmetic, pixel math.

pub mod core;
pub mod error;
pub(crate) mod math;
