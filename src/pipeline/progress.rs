/// Receiver for render progress updates.
///
/// `percent` is 0..=100 over the whole run; the render loop occupies the
/// 30..=95 band, matching the status checkpoints the preview UI shows.
pub trait ProgressSink {
    /// Report a status headline, detail line, and overall percentage.
    fn progress(&mut self, title: &str, detail: &str, percent: u8);
}

/// Sink that discards all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn progress(&mut self, _title: &str, _detail: &str, _percent: u8) {}
}

/// Sink that logs updates through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn progress(&mut self, title: &str, detail: &str, percent: u8) {
        tracing::info!(percent, detail, "{title}");
    }
}
