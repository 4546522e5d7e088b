use serde::{Deserialize, Serialize};

use crate::foundation::error::{VideogenError, VideogenResult};

/// Rational frames-per-second.
///
/// Renders run at a fixed 30/1, but the type keeps the rational form so frame
/// arithmetic never accumulates float error across long tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds).
    pub den: u32,
}

impl Fps {
    /// The fixed render rate used by both pipelines.
    pub const FIXED_30: Fps = Fps { num: 30, den: 1 };

    /// Create a validated rational fps.
    pub fn new(num: u32, den: u32) -> VideogenResult<Self> {
        if num == 0 || den == 0 {
            return Err(VideogenError::validation(format!(
                "fps must have nonzero numerator and denominator, got {num}/{den}"
            )));
        }
        Ok(Self { num, den })
    }

    /// Frames per second as a float.
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Duration of a single frame in seconds.
    pub fn frame_duration_secs(&self) -> f64 {
        self.den as f64 / self.num as f64
    }

    /// Total whole frames covering `secs` of media, truncated.
    ///
    /// Truncation (not rounding) keeps the last rendered frame inside the
    /// decoded audio.
    pub fn secs_to_frames_floor(&self, secs: f64) -> u64 {
        if secs <= 0.0 {
            return 0;
        }
        (secs * self.as_f64()).floor() as u64
    }

    /// PCM samples consumed per frame at `sample_rate`, truncated.
    pub fn samples_per_frame(&self, sample_rate: u32) -> usize {
        (sample_rate as f64 / self.as_f64()).floor() as usize
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self::FIXED_30
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_components() {
        assert!(Fps::new(0, 1).is_err());
        assert!(Fps::new(30, 0).is_err());
        assert!(Fps::new(30, 1).is_ok());
    }

    #[test]
    fn frame_count_truncates() {
        let fps = Fps::FIXED_30;
        // 12.3 s of audio at 30 fps is 369 frames, never 370.
        assert_eq!(fps.secs_to_frames_floor(12.3), 369);
        assert_eq!(fps.secs_to_frames_floor(0.0), 0);
        assert_eq!(fps.secs_to_frames_floor(-1.0), 0);
    }

    #[test]
    fn samples_per_frame_truncates() {
        assert_eq!(Fps::FIXED_30.samples_per_frame(44_100), 1470);
        assert_eq!(Fps::FIXED_30.samples_per_frame(44_101), 1470);
    }
}
