use chrono::NaiveDateTime;
use oxypulse_types::{Channel, SessionAverages};

use crate::Classification;

/// Running per-channel sums for one monitoring session.
///
/// A value is accumulated only when its channel passed validation, each
/// channel on its own. `finalize` consumes the stats, so a session can be
/// finalized at most once.
#[derive(Debug, Clone)]
pub struct SessionStats {
    started_at: NaiveDateTime,
    samples: u64,
    totals: SessionAverages,
}

impl SessionStats {
    pub fn new(started_at: NaiveDateTime) -> Self {
        Self {
            started_at,
            samples: 0,
            totals: SessionAverages::default(),
        }
    }

    pub fn update(&mut self, classification: &Classification) {
        self.samples += 1;

        for channel in Channel::ALL {
            if let Some(value) = classification.plausible(channel) {
                self.totals.channel_mut(channel).add(value);
            }
        }
    }

    pub fn started_at(&self) -> NaiveDateTime {
        self.started_at
    }

    /// Samples seen, plausible or not.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn current(&self) -> &SessionAverages {
        &self.totals
    }

    pub fn finalize(self) -> SessionAverages {
        self.totals
    }
}
