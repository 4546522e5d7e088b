//! The two render pipelines: batched offline rendering with uploads to the
//! render server, and the realtime preview.
//!
//! Both feed the same analyzer, bar mapping, and compositor, so a preview
//! frame and an offline frame at the same timestamp and geometry are pixel
//! identical (smoothing constants aside).

/// Batched offline rendering with uploads to the render server.
pub mod offline;
/// Progress reporting seam.
pub mod progress;
/// Live preview rendering over a PCM tap.
pub mod realtime;

pub use offline::{OfflineRenderPipeline, RenderOutcome, RenderPhase};
pub use progress::{LogProgress, NullProgress, ProgressSink};
pub use realtime::{LivePcmWriter, LiveSpectrumSource, RealtimeVisualizer, SpectrumSource};
