//! Render sink seam: the presentation clock and decode/display collaborator.

use parking_lot::Mutex;

/// Decode/presentation collaborator. The engine never decodes; it hands
/// demuxed units to a sink and steers the sink's media clock.
pub trait RenderSink: Send + Sync {
    /// Whether the sink wants more sample units right now.
    fn is_ready_for_more(&self) -> bool;

    /// Discard anything buffered but not yet presented.
    fn flush(&self);

    /// Playback rate; zero pauses the clock.
    fn set_rate(&self, rate: f64);

    /// Jump the media clock to `position` seconds.
    fn seek(&self, position: f64);

    /// Current media clock position in seconds.
    fn position(&self) -> f64;
}

#[derive(Debug, Default)]
struct NullClock {
    position: f64,
    rate: f64,
}

/// A sink with a manually driven clock. Used by tests and headless
/// consumers that pull samples with their own cadence.
#[derive(Debug, Default)]
pub struct NullSink {
    clock: Mutex<NullClock>,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by `seconds`, as a real sink's decoder callback
    /// would between ticks.
    pub fn advance(&self, seconds: f64) {
        self.clock.lock().position += seconds;
    }

    pub fn rate(&self) -> f64 {
        self.clock.lock().rate
    }
}

impl RenderSink for NullSink {
    fn is_ready_for_more(&self) -> bool {
        true
    }

    fn flush(&self) {}

    fn set_rate(&self, rate: f64) {
        self.clock.lock().rate = rate;
    }

    fn seek(&self, position: f64) {
        self.clock.lock().position = position;
    }

    fn position(&self) -> f64 {
        self.clock.lock().position
    }
}
