//! Media preparation: image decode, audio/video decode via ffmpeg, text
//! layout.

pub mod decode;
pub mod media;
pub(crate) mod store;
