//! Spectral analysis: windowed FFT magnitudes and the bar-height mapping.
//!
//! Both render modes share this module verbatim; the offline pipeline and the
//! realtime visualizer differ only in where their PCM slices come from and
//! which smoothing constant they pass.

/// Windowed FFT magnitude analysis.
pub mod analyzer;
/// Spectrum-to-bar-height mapping.
pub mod bars;

pub use analyzer::SpectrumAnalyzer;
pub use bars::{BAR_COUNT, BarSet, map_bars};
