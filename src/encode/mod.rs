//! Frame encoding for upload.

/// JPEG data-URI encoding of rendered frames.
pub mod jpeg;

pub use jpeg::encode_frame_data_uri;
