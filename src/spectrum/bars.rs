/// Number of radial bars in the visualizer ring.
pub const BAR_COUNT: usize = 180;

/// Height at which a bar idles when its band is below the activity threshold.
const FLOOR_HEIGHT: f32 = 2.0;
/// Hard cap on bar height in logical units.
const MAX_HEIGHT: f32 = 35.0;
/// Byte value a band must exceed before a bar starts to rise.
const ACTIVITY_THRESHOLD: f32 = 170.0;

/// Heights for one ring of bars, in logical canvas units.
///
/// Always [`BAR_COUNT`] entries, each within `[2.0, 35.0]`. Purely a function
/// of the supplied spectrum; carries no state between frames.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSet {
    heights: Vec<f32>,
}

impl BarSet {
    /// Bar heights in ring order.
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Number of bars.
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    /// Whether the set holds no bars. Sets built by [`map_bars`] always hold
    /// [`BAR_COUNT`] entries.
    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }
}

/// Map a byte spectrum onto [`BAR_COUNT`] bar heights.
///
/// Bars sample the spectrum on a logarithmic sweep from index 1 up to half the
/// spectrum length, interpolating between neighboring bins, so the ring spends
/// most of its arc on the low end where music lives. A mild position weight
/// lifts the treble side, then a cubic response curve above the activity
/// threshold turns loud bands into tall bars while quiet bands sit at the
/// 2-unit floor.
pub fn map_bars(spectrum: &[u8]) -> BarSet {
    let max_idx = (spectrum.len() / 2) as f32;
    let mut heights = Vec::with_capacity(BAR_COUNT);

    for i in 0..BAR_COUNT {
        let t = i as f32 / BAR_COUNT as f32;
        let idx = if max_idx > 0.0 {
            (max_idx.ln() * t).exp()
        } else {
            0.0
        };

        let lo = idx.floor() as usize;
        let hi = idx.ceil() as usize;
        let frac = idx - idx.floor();
        let a = spectrum.get(lo).copied().unwrap_or(0) as f32;
        let b = spectrum.get(hi).copied().unwrap_or(0) as f32;
        let mut v = a * (1.0 - frac) + b * frac;

        v = (v * (1.0 + t * 1.5)).min(255.0);

        let mut h = FLOOR_HEIGHT;
        if v > ACTIVITY_THRESHOLD {
            let active = ((v - ACTIVITY_THRESHOLD) / 85.0).min(1.0);
            h += active * active * active * 33.0;
        }
        heights.push(h.min(MAX_HEIGHT));
    }

    BarSet { heights }
}
