use std::fmt;

use oxypulse_algos::Classification;
use oxypulse_types::{Countdown, SessionReport};

use crate::SessionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user facing message raised by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Receives everything the controller wants shown. Called from the controller
/// task, so implementations must not block.
pub trait SessionObserver: Send + 'static {
    fn state(&mut self, _status: &SessionStatus) {}

    fn sample(&mut self, _classification: &Classification) {}

    fn countdown(&mut self, _countdown: Countdown) {}

    fn notice(&mut self, _notice: &Notice) {}

    fn finished(&mut self, _report: &SessionReport) {}
}

impl SessionObserver for () {}
