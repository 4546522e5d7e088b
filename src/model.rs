//! Render request description: what to render, not how.

use std::path::PathBuf;

use crate::foundation::core::Fps;
use crate::foundation::error::{VideogenError, VideogenResult};
use crate::lyrics::LyricLine;

/// Background artwork behind the disc and bar ring.
#[derive(Debug, Clone)]
pub enum BackgroundSource {
    /// Encoded image bytes (any format the `image` crate decodes).
    Image(Vec<u8>),
    /// Path to a video file, looped for the duration of the render.
    VideoFile(PathBuf),
    /// Flat dark clear color only.
    None,
}

/// Everything a render needs besides the decoded audio.
///
/// Immutable once a pipeline starts; the pipeline clones nothing out of it
/// mid-run, so there is no way for a caller to mutate a render in flight.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Track identifier understood by the collaborating server.
    pub track_id: String,
    /// Catalog source the track id belongs to.
    pub source: String,
    /// Track name, shown in the bottom caption and the output title.
    pub name: String,
    /// Artist name.
    pub artist: String,
    /// Background artwork, also shown inside the spinning disc.
    pub background: BackgroundSource,
    /// Timed lyrics, ascending by time.
    pub lyrics: Vec<LyricLine>,
    /// Render frame rate.
    pub fps: Fps,
}

impl RenderRequest {
    /// Check request invariants before a pipeline accepts it.
    pub fn validate(&self) -> VideogenResult<()> {
        if self.track_id.is_empty() {
            return Err(VideogenError::validation("track_id must not be empty"));
        }
        if self.source.is_empty() {
            return Err(VideogenError::validation("source must not be empty"));
        }
        for pair in self.lyrics.windows(2) {
            if pair[1].time < pair[0].time {
                return Err(VideogenError::validation(format!(
                    "lyrics must be ascending by time, got {} after {}",
                    pair[1].time, pair[0].time
                )));
            }
        }
        Ok(())
    }

    /// Output title in the server's expected `name - artist` form.
    pub fn output_title(&self) -> String {
        format!("{} - {}", self.name, self.artist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RenderRequest {
        RenderRequest {
            track_id: "t1".into(),
            source: "lib".into(),
            name: "Song".into(),
            artist: "Artist".into(),
            background: BackgroundSource::None,
            lyrics: Vec::new(),
            fps: Fps::FIXED_30,
        }
    }

    #[test]
    fn accepts_minimal_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn rejects_empty_ids_and_descending_lyrics() {
        let mut r = request();
        r.track_id.clear();
        assert!(r.validate().is_err());

        let mut r = request();
        r.lyrics = vec![
            LyricLine { time: 5.0, text: "b".into() },
            LyricLine { time: 1.0, text: "a".into() },
        ];
        assert!(r.validate().is_err());
    }

    #[test]
    fn title_formatting() {
        assert_eq!(request().output_title(), "Song - Artist");
    }
}
