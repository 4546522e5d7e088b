use std::path::PathBuf;

use tracing::{debug, info};

use crate::assets::media::{ANALYSIS_SAMPLE_RATE, AudioPcm, decode_audio_f32_mono};
use crate::encode::encode_frame_data_uri;
use crate::foundation::error::{VideogenError, VideogenResult};
use crate::model::RenderRequest;
use crate::pipeline::progress::ProgressSink;
use crate::render::{BackgroundMedia, Compositor, RenderGeometry};
use crate::service::RenderService;
use crate::spectrum::{SpectrumAnalyzer, map_bars};

/// FFT window used for every offline frame.
const WINDOW_SIZE: usize = 256;
/// Temporal smoothing for the offline analyzer.
const SMOOTHING: f32 = 0.4;
/// Frames rendered and encoded between uploads.
const BATCH_SIZE: usize = 30;

/// Lifecycle phase of a render session.
///
/// A failed run has no phase of its own: failure is the pipeline's error
/// return, carrying the phase it happened in through the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    /// Negotiating a session with the server.
    Init,
    /// Fetching and decoding the audio, preparing visuals.
    Decoding,
    /// Rendering and encoding the current batch.
    Rendering,
    /// Delivering the current batch.
    Uploading,
    /// Asking the server to mux the final video.
    Finalizing,
    /// Terminal: the video URL is available.
    Succeeded,
}

/// Per-run session bookkeeping: the server's id, the upload high-water mark,
/// and the frame target.
#[derive(Debug)]
pub(crate) struct SessionState {
    id: String,
    uploaded: u64,
    total: u64,
    phase: RenderPhase,
}

impl SessionState {
    fn new(id: String, total: u64) -> Self {
        Self {
            id,
            uploaded: 0,
            total,
            phase: RenderPhase::Decoding,
        }
    }

    fn enter(&mut self, phase: RenderPhase) {
        debug!(session = %self.id, ?phase, "phase transition");
        self.phase = phase;
    }

    /// Record a delivered batch; batches must be contiguous and in order.
    fn batch_uploaded(&mut self, start_idx: u64, count: u64) -> VideogenResult<()> {
        if start_idx != self.uploaded {
            return Err(VideogenError::upload(format!(
                "batch starts at frame {start_idx}, expected {}",
                self.uploaded
            )));
        }
        self.uploaded += count;
        if self.uploaded > self.total {
            return Err(VideogenError::upload(format!(
                "uploaded {} frames past the {}-frame target",
                self.uploaded - self.total,
                self.total
            )));
        }
        Ok(())
    }
}

/// Result of a completed offline render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Download URL returned by the server.
    pub url: String,
    /// Frames rendered and uploaded.
    pub frames_uploaded: u64,
}

/// Frame-by-frame offline renderer with batched uploads.
///
/// Runs on one thread: each batch of [`BATCH_SIZE`] frames is fully rendered
/// and encoded, then uploaded before the next batch starts, so at most one
/// encoded batch is ever held in memory and the server receives frames in
/// ascending contiguous order. Dropping the pipeline mid-run abandons the
/// session; the server reaps it.
pub struct OfflineRenderPipeline<S: RenderService> {
    service: S,
    geometry: RenderGeometry,
    font: Option<Vec<u8>>,
}

impl<S: RenderService> OfflineRenderPipeline<S> {
    /// Pipeline rendering at the standard offline 1.5x geometry.
    pub fn new(service: S) -> Self {
        Self {
            service,
            geometry: RenderGeometry::offline(),
            font: None,
        }
    }

    /// Override the render geometry.
    pub fn with_geometry(mut self, geometry: RenderGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Font for lyrics and captions; without one, text layers are skipped.
    pub fn with_font(mut self, font_bytes: Vec<u8>) -> Self {
        self.font = Some(font_bytes);
        self
    }

    /// The render service this pipeline uploads to.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Run a full render: init, fetch and decode the track audio, render,
    /// upload, finalize.
    pub fn run(
        &self,
        request: &RenderRequest,
        progress: &mut dyn ProgressSink,
    ) -> VideogenResult<RenderOutcome> {
        request.validate()?;

        progress.progress("Initializing", "requesting a render session", 5);
        let session = self
            .service
            .init(&request.track_id, &request.source)?;

        progress.progress("Downloading audio", "fetching and decoding the track", 15);
        let audio_bytes = self.service.fetch_audio(&session.audio_url)?;
        let pcm = decode_fetched_audio(&audio_bytes)?;

        self.render_session(request, &pcm, session.session_id, progress)
    }

    /// Run a render over already-decoded PCM.
    ///
    /// Used when the caller supplies its own audio (and by tests); still opens
    /// a session but skips the fetch/decode stage.
    pub fn run_with_decoded(
        &self,
        request: &RenderRequest,
        pcm: &AudioPcm,
        progress: &mut dyn ProgressSink,
    ) -> VideogenResult<RenderOutcome> {
        request.validate()?;

        progress.progress("Initializing", "requesting a render session", 5);
        let session = self
            .service
            .init(&request.track_id, &request.source)?;

        self.render_session(request, pcm, session.session_id, progress)
    }

    fn render_session(
        &self,
        request: &RenderRequest,
        pcm: &AudioPcm,
        session_id: String,
        progress: &mut dyn ProgressSink,
    ) -> VideogenResult<RenderOutcome> {
        let total = request.fps.secs_to_frames_floor(pcm.duration_secs());
        if total == 0 {
            return Err(VideogenError::validation(
                "decoded audio is shorter than one frame",
            ));
        }
        let samples_per_frame = request.fps.samples_per_frame(pcm.sample_rate);
        let mut session = SessionState::new(session_id, total);

        progress.progress("Preparing visuals", "decoding background artwork", 25);
        let mut background = BackgroundMedia::prepare(&request.background)?;
        let mut compositor = Compositor::new(self.geometry);
        if let Some(font) = &self.font {
            compositor.set_font(font.clone());
        }
        let mut analyzer = SpectrumAnalyzer::new();

        info!(
            total_frames = total,
            fps = request.fps.as_f64(),
            "starting offline render"
        );
        progress.progress("Rendering", "0%", 30);

        let mut frame_idx: u64 = 0;
        let mut batch = Vec::with_capacity(BATCH_SIZE);
        while frame_idx < total {
            session.enter(RenderPhase::Rendering);
            let batch_start = frame_idx;
            batch.clear();
            while batch.len() < BATCH_SIZE && frame_idx < total {
                let t = frame_idx as f64 * request.fps.frame_duration_secs();

                let start = (frame_idx as usize).saturating_mul(samples_per_frame);
                let end = start.saturating_add(WINDOW_SIZE).min(pcm.samples.len());
                let slice = pcm.samples.get(start..end).unwrap_or(&[]);

                let spectrum = analyzer.analyze(slice, WINDOW_SIZE, SMOOTHING)?;
                let bars = map_bars(spectrum);
                let bg = background.frame_at(t);
                let frame = compositor.draw_frame(
                    t,
                    &bars,
                    bg.as_ref(),
                    &request.lyrics,
                    &request.name,
                    &request.artist,
                )?;
                batch.push(encode_frame_data_uri(&frame)?);
                frame_idx += 1;
            }

            session.enter(RenderPhase::Uploading);
            self.service
                .upload_batch(&session.id, &batch, batch_start)?;
            session.batch_uploaded(batch_start, batch.len() as u64)?;

            let pct = frame_idx * 100 / total;
            progress.progress(
                "Rendering",
                &format!("{pct}% ({frame_idx}/{total} frames)"),
                (30.0 + pct as f64 * 0.65).round() as u8,
            );
        }

        session.enter(RenderPhase::Finalizing);
        progress.progress("Muxing", "combining audio with rendered frames", 98);
        let url = self.service.finalize(&session.id, &request.output_title())?;

        session.enter(RenderPhase::Succeeded);
        progress.progress("Done", &url, 100);
        Ok(RenderOutcome {
            url,
            frames_uploaded: session.uploaded,
        })
    }
}

/// Spill fetched audio bytes to a temp file and decode through ffmpeg.
fn decode_fetched_audio(bytes: &[u8]) -> VideogenResult<AudioPcm> {
    let path = std::env::temp_dir().join(format!(
        "videogen_audio_{}_{}.bin",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    ));
    std::fs::write(&path, bytes)
        .map_err(|e| VideogenError::decode(format!("write audio temp file: {e}")))?;
    let _guard = TempFileGuard(Some(path.clone()));
    decode_audio_f32_mono(&path, ANALYSIS_SAMPLE_RATE)
}

/// Removes the wrapped file on drop.
struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(p) = self.0.take() {
            let _ = std::fs::remove_file(&p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_state_enforces_contiguous_batches() {
        let mut s = SessionState::new("s1".into(), 75);
        s.batch_uploaded(0, 30).unwrap();
        s.batch_uploaded(30, 30).unwrap();
        // A gap or replay is rejected.
        assert!(s.batch_uploaded(70, 5).is_err());
        assert!(s.batch_uploaded(30, 15).is_err());
    }

    #[test]
    fn session_state_rejects_overrun() {
        let mut s = SessionState::new("s1".into(), 40);
        s.batch_uploaded(0, 30).unwrap();
        assert!(s.batch_uploaded(30, 30).is_err());
    }

    #[test]
    fn temp_file_guard_removes_file() {
        let path = std::env::temp_dir().join(format!(
            "videogen_guard_test_{}",
            std::process::id()
        ));
        std::fs::write(&path, b"x").unwrap();
        drop(TempFileGuard(Some(path.clone())));
        assert!(!path.exists());
    }
}
