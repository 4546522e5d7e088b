//! Collaborator seams: the render server that muxes uploaded frames into the
//! final video, and the lyric provider.
//!
//! The pipeline only sees these traits; tests drive it with in-memory fakes
//! and production uses the JSON-over-HTTP implementations in [`http`].

/// JSON-over-HTTP implementations of the collaborator traits.
pub mod http;

use crate::foundation::error::VideogenResult;

pub use http::{HttpLyricSource, HttpRenderService};

/// Session handle returned by a successful init.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitSession {
    /// Opaque server-issued session id, echoed on every subsequent call.
    pub session_id: String,
    /// Where to fetch the track's audio from.
    pub audio_url: String,
}

/// The render server the offline pipeline talks to.
///
/// Batches must arrive strictly in ascending, contiguous frame order; the
/// server appends them to the session as they come in.
pub trait RenderService {
    /// Open a render session for a track.
    fn init(&self, track_id: &str, source: &str) -> VideogenResult<InitSession>;

    /// Fetch the track audio bytes from the URL init returned.
    fn fetch_audio(&self, url: &str) -> VideogenResult<Vec<u8>>;

    /// Upload one batch of encoded frames starting at absolute index
    /// `start_idx`.
    fn upload_batch(
        &self,
        session_id: &str,
        frames: &[String],
        start_idx: u64,
    ) -> VideogenResult<()>;

    /// Close the session and mux the video; returns the download URL.
    fn finalize(&self, session_id: &str, title: &str) -> VideogenResult<String>;
}

/// Provider of raw LRC lyric text.
pub trait LyricSource {
    /// Fetch the LRC document for a track, empty when none exists.
    fn fetch_lyrics(&self, track_id: &str, source: &str) -> VideogenResult<String>;
}
