use std::time::Duration;

use oxypulse_codec::LineFramer;

/// Timing and policy of a monitoring session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub baud_rate: u32,
    /// Monitoring stops on its own after this long.
    pub auto_stop: Duration,
    /// Finger removal is ignored for this long after monitoring starts.
    pub grace: Duration,
    pub tick: Duration,
    pub open_timeout: Duration,
    pub max_line_len: usize,
    /// Capacity of the channel between the read task and the controller.
    pub sample_buffer: usize,
    /// Count and store sessions that produced no plausible reading.
    pub count_empty_sessions: bool,
}

impl SessionConfig {
    pub const BAUD_RATE: u32 = 115_200;
    pub const AUTO_STOP: Duration = Duration::from_secs(12);
    pub const GRACE: Duration = Duration::from_secs(2);

    /// Upper bound for every timer, keeps deadline arithmetic in range.
    pub const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);
    pub const MIN_TICK: Duration = Duration::from_millis(10);

    /// Brings every value into the range the controller can run with.
    pub fn clamped(mut self) -> Self {
        self.auto_stop = self.auto_stop.min(Self::MAX_DURATION);
        self.grace = self.grace.min(Self::MAX_DURATION);
        self.tick = self.tick.clamp(Self::MIN_TICK, Self::MAX_DURATION);
        self.open_timeout = self.open_timeout.min(Self::MAX_DURATION);
        self.max_line_len = self.max_line_len.max(1);
        self.sample_buffer = self.sample_buffer.max(1);
        self
    }

    /// Whole seconds shown by the countdown.
    pub fn countdown_secs(&self) -> u32 {
        self.auto_stop.as_secs().try_into().unwrap_or(u32::MAX)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            baud_rate: Self::BAUD_RATE,
            auto_stop: Self::AUTO_STOP,
            grace: Self::GRACE,
            tick: Duration::from_secs(1),
            open_timeout: Duration::from_secs(10),
            max_line_len: LineFramer::DEFAULT_MAX_LINE,
            sample_buffer: 64,
            count_empty_sessions: false,
        }
    }
}
