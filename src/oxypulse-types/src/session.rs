use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::{Channel, HistoryEntry, LastValues};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Monitoring,
    Terminating,
    Disconnected,
    Error,
}

impl SessionState {
    /// States from which a new connect request is accepted.
    pub fn accepts_connect(self) -> bool {
        matches!(self, Self::Idle | Self::Disconnected | Self::Error)
    }

    pub fn is_busy(self) -> bool {
        !self.accepts_connect()
    }
}

/// Why a monitoring session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Termination {
    #[strum(serialize = "auto-stop")]
    AutoStop,
    #[strum(serialize = "requested")]
    Requested,
    #[strum(serialize = "finger removed")]
    FingerRemoved,
    #[strum(serialize = "device lost")]
    DeviceLost(String),
}

impl Termination {
    /// Terminations that leave the controller in `Error`.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::FingerRemoved | Self::DeviceLost(_))
    }

    pub fn message(&self) -> String {
        match self {
            Self::AutoStop => "Monitoring complete.".to_owned(),
            Self::Requested => "Monitoring stopped.".to_owned(),
            Self::FingerRemoved => {
                "Monitoring terminated: Finger removed during measurement.".to_owned()
            }
            Self::DeviceLost(reason) => format!("Device connection lost: {reason}"),
        }
    }
}

/// Seconds left before the auto-stop fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    remaining: u32,
    total: u32,
}

impl Countdown {
    pub fn new(total: u32) -> Self {
        Self {
            remaining: total,
            total,
        }
    }

    /// Counts one second down, never below zero.
    pub fn tick(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn elapsed(&self) -> u32 {
        self.total - self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelAverage {
    pub sum: f64,
    pub count: u64,
}

impl ChannelAverage {
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// `None` when nothing was accumulated.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    pub fn mean_or(&self, fallback: f64) -> f64 {
        self.mean().unwrap_or(fallback)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionAverages {
    pub bpm: ChannelAverage,
    pub spo2: ChannelAverage,
    pub ir: ChannelAverage,
    pub red: ChannelAverage,
}

impl SessionAverages {
    pub fn channel(&self, channel: Channel) -> &ChannelAverage {
        match channel {
            Channel::Bpm => &self.bpm,
            Channel::SpO2 => &self.spo2,
            Channel::Ir => &self.ir,
            Channel::Red => &self.red,
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut ChannelAverage {
        match channel {
            Channel::Bpm => &mut self.bpm,
            Channel::SpO2 => &mut self.spo2,
            Channel::Ir => &mut self.ir,
            Channel::Red => &mut self.red,
        }
    }

    /// True when no channel received a single plausible value.
    pub fn is_empty(&self) -> bool {
        Channel::ALL
            .into_iter()
            .all(|channel| self.channel(channel).count == 0)
    }
}

/// Everything handed to display, storage and report sinks once a session
/// has ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub id: Uuid,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub samples: u64,
    pub averages: SessionAverages,
    pub last_values: LastValues,
    pub history: Vec<HistoryEntry>,
    pub termination: Termination,
}

impl SessionReport {
    /// Session average, falling back to the last plausible reading.
    pub fn average_or_last(&self, channel: Channel) -> Option<f64> {
        self.averages
            .channel(channel)
            .mean()
            .or_else(|| self.last_values.get(channel))
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session {} ({})", self.id, self.termination)?;
        writeln!(f, "  started: {}", self.started_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "  samples: {}", self.samples)?;
        for channel in Channel::ALL {
            let value = match (channel, self.average_or_last(channel)) {
                (_, None) => "--".to_owned(),
                (Channel::Bpm, Some(v)) => format!("{v:.2}"),
                (Channel::SpO2, Some(v)) => format!("{v:.2}%"),
                (Channel::Ir | Channel::Red, Some(v)) => format!("{}", v.round() as i64),
            };
            let label = channel.to_string();
            let count = self.averages.channel(channel).count;
            writeln!(f, "  {label:<20} {value:>10} (n={count})")?;
        }
        write!(f, "  history entries: {}", self.history.len())
    }
}
