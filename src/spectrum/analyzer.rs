use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

use crate::foundation::error::{VideogenError, VideogenResult};

/// Number of dB below full scale mapped onto the 0..=255 output range.
const DB_RANGE: f32 = 70.0;
/// Offset applied before scaling, so -100 dB maps to 0.
const DB_FLOOR: f32 = 100.0;

/// Windowed FFT magnitude analyzer with temporal smoothing.
///
/// One analyzer owns one smoothing history; the offline pipeline and the
/// realtime visualizer each hold their own instance so their histories never
/// interleave. Identical PCM plus identical history yields byte-identical
/// output, which is what keeps the two render modes visually in lockstep.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f32>,
    fft: Option<Arc<dyn Fft<f32>>>,
    window_size: usize,
    scratch: Vec<Complex<f32>>,
    /// Smoothed linear magnitudes from the previous call (pre-dB).
    prev: Vec<f32>,
    out: Vec<u8>,
}

impl SpectrumAnalyzer {
    /// Create an analyzer with no planned window yet.
    ///
    /// The FFT plan is created (and cached) on the first `analyze` call and
    /// replanned whenever the window size changes.
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            fft: None,
            window_size: 0,
            scratch: Vec::new(),
            prev: Vec::new(),
            out: Vec::new(),
        }
    }

    /// Current window size, 0 before the first `analyze`.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Zero the smoothing history.
    ///
    /// Call on every pipeline or visualizer activation so the first frame of a
    /// run never inherits magnitudes from a previous track.
    pub fn reset(&mut self) {
        self.prev.fill(0.0);
    }

    /// Compute a `window_size / 2` byte spectrum for one PCM slice.
    ///
    /// `pcm` shorter than the window is zero-padded. `smoothing` blends the
    /// previous call's linear magnitudes in before the dB conversion:
    /// `mag = s * prev + (1 - s) * mag`. Output bytes are
    /// `(20*log10(mag + 1e-6) + 100) * 255/70`, clamped and truncated.
    pub fn analyze(
        &mut self,
        pcm: &[f32],
        window_size: usize,
        smoothing: f32,
    ) -> VideogenResult<&[u8]> {
        if window_size < 2 || !window_size.is_power_of_two() {
            return Err(VideogenError::validation(format!(
                "fft window size must be a power of two >= 2, got {window_size}"
            )));
        }
        self.ensure_window(window_size);

        let n = window_size;
        let denom = (n - 1) as f32;
        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let sample = pcm.get(i).copied().unwrap_or(0.0);
            let w = 0.5 * (1.0 - (std::f32::consts::TAU * i as f32 / denom).cos());
            *slot = Complex::new(sample * w, 0.0);
        }

        // Planned forward FFTs for the same size are cached by the planner.
        self.fft
            .as_ref()
            .ok_or_else(|| VideogenError::render("fft plan missing after ensure_window"))?
            .process(&mut self.scratch);

        let s = smoothing.clamp(0.0, 1.0);
        for i in 0..n / 2 {
            let mut mag = self.scratch[i].norm() / n as f32 * 2.0;
            mag = s * self.prev[i] + (1.0 - s) * mag;
            self.prev[i] = mag;

            let db = 20.0 * (mag + 1e-6).log10();
            let val = ((db + DB_FLOOR) * (255.0 / DB_RANGE)).clamp(0.0, 255.0);
            self.out[i] = val as u8;
        }

        Ok(&self.out)
    }

    fn ensure_window(&mut self, window_size: usize) {
        if self.window_size == window_size {
            return;
        }
        self.fft = Some(self.planner.plan_fft_forward(window_size));
        self.window_size = window_size;
        self.scratch = vec![Complex::new(0.0, 0.0); window_size];
        // A size change invalidates the history outright.
        self.prev = vec![0.0; window_size / 2];
        self.out = vec![0; window_size / 2];
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("window_size", &self.window_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low amplitude keeps the dB mapping out of the 255 clamp, so bin
    // comparisons below see real magnitudes.
    fn sine(freq_bin: usize, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| 0.05 * (std::f32::consts::TAU * freq_bin as f32 * i as f32 / n as f32).sin())
            .collect()
    }

    #[test]
    fn rejects_non_power_of_two() {
        let mut a = SpectrumAnalyzer::new();
        assert!(a.analyze(&[0.0; 100], 100, 0.0).is_err());
        assert!(a.analyze(&[0.0; 100], 0, 0.0).is_err());
        assert!(a.analyze(&[0.0; 100], 256, 0.0).is_ok());
    }

    #[test]
    fn output_length_is_half_window() {
        let mut a = SpectrumAnalyzer::new();
        let out = a.analyze(&[0.0; 256], 256, 0.4).unwrap();
        assert_eq!(out.len(), 128);
    }

    #[test]
    fn deterministic_for_identical_input_and_history() {
        let pcm = sine(8, 256);
        let mut a = SpectrumAnalyzer::new();
        let mut b = SpectrumAnalyzer::new();
        let first = a.analyze(&pcm, 256, 0.4).unwrap().to_vec();
        let second = b.analyze(&pcm, 256, 0.4).unwrap().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn tone_peaks_at_its_bin() {
        let pcm = sine(8, 256);
        let mut a = SpectrumAnalyzer::new();
        let out = a.analyze(&pcm, 256, 0.0).unwrap();
        let peak = out
            .iter()
            .enumerate()
            .max_by_key(|(_, v)| **v)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 8);
        assert!(out[8] > out[40]);
    }

    #[test]
    fn smoothing_carries_history_and_reset_clears_it() {
        let pcm = sine(8, 256);
        let mut a = SpectrumAnalyzer::new();

        let fresh = a.analyze(&pcm, 256, 0.65).unwrap().to_vec();
        // Second call blends in the previous magnitudes.
        let smoothed = a.analyze(&pcm, 256, 0.65).unwrap().to_vec();
        assert_ne!(fresh, smoothed);

        a.reset();
        let after_reset = a.analyze(&pcm, 256, 0.65).unwrap().to_vec();
        assert_eq!(fresh, after_reset);
    }

    #[test]
    fn window_change_reallocates_history() {
        let pcm = sine(8, 512);
        let mut a = SpectrumAnalyzer::new();
        a.analyze(&pcm, 256, 0.65).unwrap();
        let out = a.analyze(&pcm, 512, 0.65).unwrap();
        assert_eq!(out.len(), 256);

        // After the size change the history started from zero, so a fresh
        // analyzer at 512 must agree exactly.
        let expected = SpectrumAnalyzer::new()
            .analyze(&pcm, 512, 0.65)
            .unwrap()
            .to_vec();
        let mut b = SpectrumAnalyzer::new();
        b.analyze(&pcm, 256, 0.65).unwrap();
        assert_eq!(b.analyze(&pcm, 512, 0.65).unwrap(), &expected[..]);
    }

    #[test]
    fn silence_stays_near_the_floor() {
        let mut a = SpectrumAnalyzer::new();
        let out = a.analyze(&[0.0; 256], 256, 0.4).unwrap();
        // 20*log10(1e-6) = -120 dB, well under the -100 dB floor.
        assert!(out.iter().all(|&v| v == 0));
    }
}
