use ringbuf::{HeapRb, traits::*};

use crate::foundation::error::VideogenResult;
use crate::lyrics::LyricLine;
use crate::render::{BackgroundMedia, Compositor, FrameRGBA, RenderGeometry};
use crate::spectrum::{SpectrumAnalyzer, map_bars};

/// FFT window used for the live preview.
const WINDOW_SIZE: usize = 256;
/// Temporal smoothing for the live analyzer; heavier than offline because the
/// preview samples whatever audio happens to be in flight at each tick.
const SMOOTHING: f32 = 0.65;
/// Ring capacity for the PCM tap, a comfortable multiple of the window.
const TAP_CAPACITY: usize = WINDOW_SIZE * 64;

/// Supplies one byte spectrum per preview tick.
pub trait SpectrumSource {
    /// Spectrum for the current tick.
    fn next_spectrum(&mut self) -> VideogenResult<Vec<u8>>;

    /// Clear any carried history; called on every visualizer start.
    fn reset(&mut self);
}

/// Producer half of a live PCM tap; feed it from the playback thread.
pub struct LivePcmWriter {
    producer: ringbuf::HeapProd<f32>,
}

impl LivePcmWriter {
    /// Push mono samples, dropping whatever the ring cannot take.
    ///
    /// Returns the number of samples accepted; the preview only ever needs
    /// the newest window, so lost samples under load are harmless.
    pub fn push(&mut self, samples: &[f32]) -> usize {
        self.producer.push_slice(samples)
    }
}

/// Live spectrum capture: a lock-free PCM ring drained into the shared
/// analyzer at preview smoothing.
///
/// The offline pipeline and this source run the exact same analysis code;
/// only the PCM origin and the smoothing constant differ.
pub struct LiveSpectrumSource {
    analyzer: SpectrumAnalyzer,
    consumer: ringbuf::HeapCons<f32>,
    /// Rolling window of the newest [`WINDOW_SIZE`] samples.
    window: Vec<f32>,
}

impl LiveSpectrumSource {
    /// Create the tap; hand the writer to whatever produces playback PCM.
    pub fn new() -> (LivePcmWriter, Self) {
        let ring = HeapRb::<f32>::new(TAP_CAPACITY);
        let (producer, consumer) = ring.split();
        (
            LivePcmWriter { producer },
            Self {
                analyzer: SpectrumAnalyzer::new(),
                consumer,
                window: vec![0.0; WINDOW_SIZE],
            },
        )
    }

    fn drain_into_window(&mut self) {
        let mut buf = [0.0f32; WINDOW_SIZE];
        loop {
            let n = self.consumer.pop_slice(&mut buf);
            if n == 0 {
                break;
            }
            if n >= WINDOW_SIZE {
                self.window.copy_from_slice(&buf[n - WINDOW_SIZE..n]);
            } else {
                self.window.copy_within(n.., 0);
                let tail = WINDOW_SIZE - n;
                self.window[tail..].copy_from_slice(&buf[..n]);
            }
        }
    }
}

impl SpectrumSource for LiveSpectrumSource {
    fn next_spectrum(&mut self) -> VideogenResult<Vec<u8>> {
        self.drain_into_window();
        let window = std::mem::take(&mut self.window);
        let out = self
            .analyzer
            .analyze(&window, WINDOW_SIZE, SMOOTHING)
            .map(|s| s.to_vec());
        self.window = window;
        out
    }

    fn reset(&mut self) {
        self.analyzer.reset();
        self.window.fill(0.0);
        // Discard stale PCM from before the restart.
        let mut buf = [0.0f32; WINDOW_SIZE];
        while self.consumer.pop_slice(&mut buf) > 0 {}
    }
}

/// Per-refresh preview renderer.
///
/// Runs the same bar mapping and compositor as the offline pipeline, fed by a
/// [`SpectrumSource`]. `start`/`stop` are explicit and symmetric: ticks
/// between them render frames, ticks outside them render nothing, and every
/// start clears the spectral history so a resume never inherits smoothing
/// from before the pause.
pub struct RealtimeVisualizer<S: SpectrumSource> {
    source: S,
    compositor: Compositor,
    background: Option<BackgroundMedia>,
    running: bool,
}

impl<S: SpectrumSource> RealtimeVisualizer<S> {
    /// Visualizer at the given geometry.
    pub fn new(geometry: RenderGeometry, source: S) -> Self {
        Self {
            source,
            compositor: Compositor::new(geometry),
            background: None,
            running: false,
        }
    }

    /// Font for lyrics and captions; without one, text layers are skipped.
    pub fn set_font(&mut self, font_bytes: Vec<u8>) {
        self.compositor.set_font(font_bytes);
    }

    /// Background media shown behind the disc and inside it.
    pub fn set_background(&mut self, background: BackgroundMedia) {
        self.background = Some(background);
    }

    /// Whether ticks currently render.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Begin rendering ticks, with fresh spectral history.
    pub fn start(&mut self) {
        self.source.reset();
        self.running = true;
    }

    /// Stop rendering ticks.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Render the frame for playback time `t`, or `None` while stopped.
    pub fn render_tick(
        &mut self,
        t: f64,
        lyrics: &[LyricLine],
        name: &str,
        artist: &str,
    ) -> VideogenResult<Option<FrameRGBA>> {
        if !self.running {
            return Ok(None);
        }
        let spectrum = self.source.next_spectrum()?;
        let bars = map_bars(&spectrum);
        let bg = self.background.as_mut().and_then(|b| b.frame_at(t));
        let frame = self
            .compositor
            .draw_frame(t, &bars, bg.as_ref(), lyrics, name, artist)?;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_feeds_the_rolling_window() {
        let (mut writer, mut source) = LiveSpectrumSource::new();
        // A quiet constant signal: the spectrum's DC bin should react while
        // silence leaves everything at zero.
        let silent = source.next_spectrum().unwrap();
        assert!(silent.iter().all(|&v| v == 0));

        let pushed = writer.push(&[0.05f32; WINDOW_SIZE]);
        assert_eq!(pushed, WINDOW_SIZE);
        let loud = source.next_spectrum().unwrap();
        assert!(loud[0] > 0, "dc bin should rise for a constant signal");
    }

    #[test]
    fn window_keeps_only_the_newest_samples() {
        let (mut writer, mut source) = LiveSpectrumSource::new();
        // Old loud samples fully displaced by fresh silence.
        writer.push(&[0.5f32; WINDOW_SIZE]);
        source.next_spectrum().unwrap();
        writer.push(&[0.0f32; WINDOW_SIZE]);
        source.reset();
        // After the displacement and reset, nothing remains of the burst.
        let spectrum = source.next_spectrum().unwrap();
        assert!(spectrum.iter().all(|&v| v == 0));
    }

    #[test]
    fn reset_clears_smoothing_history() {
        let (mut writer, mut source) = LiveSpectrumSource::new();
        writer.push(&[0.05f32; WINDOW_SIZE]);
        let first = source.next_spectrum().unwrap();

        source.reset();
        writer.push(&[0.05f32; WINDOW_SIZE]);
        let after_reset = source.next_spectrum().unwrap();
        assert_eq!(first, after_reset);
    }

    struct ScriptedSource {
        spectrum: Vec<u8>,
        resets: usize,
    }

    impl SpectrumSource for ScriptedSource {
        fn next_spectrum(&mut self) -> VideogenResult<Vec<u8>> {
            Ok(self.spectrum.clone())
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    #[test]
    fn ticks_render_only_between_start_and_stop() {
        let geometry = RenderGeometry::new(0.05).unwrap();
        let source = ScriptedSource {
            spectrum: vec![200; 128],
            resets: 0,
        };
        let mut vis = RealtimeVisualizer::new(geometry, source);

        assert!(vis.render_tick(0.0, &[], "", "").unwrap().is_none());

        vis.start();
        assert!(vis.is_running());
        let frame = vis.render_tick(0.0, &[], "", "").unwrap();
        assert!(frame.is_some());

        vis.stop();
        assert!(!vis.is_running());
        assert!(vis.render_tick(0.1, &[], "", "").unwrap().is_none());
    }

    #[test]
    fn every_start_resets_the_source() {
        let geometry = RenderGeometry::new(0.05).unwrap();
        let source = ScriptedSource {
            spectrum: vec![0; 128],
            resets: 0,
        };
        let mut vis = RealtimeVisualizer::new(geometry, source);
        vis.start();
        vis.stop();
        vis.start();
        assert_eq!(vis.source.resets, 2);
    }
}
