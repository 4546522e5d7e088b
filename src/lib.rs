//! Videogen renders audio-reactive music videos: a spinning album disc ringed
//! by 180 frequency bars over the track's artwork, with scrolling synced
//! lyrics.
//!
//! The same compositor serves two modes:
//!
//! - A realtime preview driven by a live PCM tap ([`RealtimeVisualizer`])
//! - An offline render that encodes every frame as JPEG and uploads batches
//!   to a render server for muxing ([`OfflineRenderPipeline`])
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod foundation;

/// JPEG frame encoding for upload.
pub mod encode;
/// LRC lyric parsing and timing.
pub mod lyrics;
/// Render request model.
pub mod model;
/// Offline and realtime render pipelines.
pub mod pipeline;
/// Frame composition backend.
pub mod render;
/// Render server and lyric provider clients.
pub mod service;
/// FFT analysis and bar mapping.
pub mod spectrum;

pub use crate::foundation::core::Fps;
pub use crate::foundation::error::{VideogenError, VideogenResult};

pub use crate::assets::decode::{PreparedImage, decode_image};
pub use crate::assets::media::{ANALYSIS_SAMPLE_RATE, AudioPcm, VideoSourceInfo};
pub use crate::encode::encode_frame_data_uri;
pub use crate::lyrics::{LyricLine, active_line, parse_lrc};
pub use crate::model::{BackgroundSource, RenderRequest};
pub use crate::pipeline::{
    LivePcmWriter, LiveSpectrumSource, LogProgress, NullProgress, OfflineRenderPipeline,
    ProgressSink, RealtimeVisualizer, RenderOutcome, RenderPhase, SpectrumSource,
};
pub use crate::render::{BackgroundFrame, BackgroundMedia, Compositor, FrameRGBA, RenderGeometry};
pub use crate::service::{
    HttpLyricSource, HttpRenderService, InitSession, LyricSource, RenderService,
};
pub use crate::spectrum::{BAR_COUNT, BarSet, SpectrumAnalyzer, map_bars};
