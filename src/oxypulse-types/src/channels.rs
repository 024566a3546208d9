use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum Channel {
    #[strum(serialize = "Heart Rate (BPM)")]
    Bpm,
    #[strum(serialize = "Blood Oxygen (SpO2)")]
    SpO2,
    #[strum(serialize = "IR Value")]
    Ir,
    #[strum(serialize = "RED Value")]
    Red,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Bpm, Channel::SpO2, Channel::Ir, Channel::Red];

    /// Storage key holding the most recent plausible reading.
    pub const fn last_value_key(self) -> &'static str {
        match self {
            Channel::Bpm => "last_heart_rate",
            Channel::SpO2 => "last_spo2",
            Channel::Ir => "last_ir_value",
            Channel::Red => "last_red_value",
        }
    }

    /// Storage key holding the average of the last finished session.
    pub const fn average_key(self) -> &'static str {
        match self {
            Channel::Bpm => "avg_bpm",
            Channel::SpO2 => "avg_spo2",
            Channel::Ir => "avg_ir",
            Channel::Red => "avg_red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum FingerState {
    #[strum(serialize = "No Finger Detected")]
    NoFinger,
    #[strum(serialize = "Finger Detected")]
    Present,
}

/// Most recent plausible value seen on each channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LastValues {
    pub bpm: Option<f64>,
    pub spo2: Option<f64>,
    pub ir: Option<f64>,
    pub red: Option<f64>,
}

impl LastValues {
    pub fn get(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Bpm => self.bpm,
            Channel::SpO2 => self.spo2,
            Channel::Ir => self.ir,
            Channel::Red => self.red,
        }
    }

    pub fn set(&mut self, channel: Channel, value: f64) {
        let slot = match channel {
            Channel::Bpm => &mut self.bpm,
            Channel::SpO2 => &mut self.spo2,
            Channel::Ir => &mut self.ir,
            Channel::Red => &mut self.red,
        };
        *slot = Some(value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, f64)> + '_ {
        Channel::ALL
            .into_iter()
            .filter_map(|channel| self.get(channel).map(|value| (channel, value)))
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn storage_keys_are_unique() {
        let mut keys = Channel::iter()
            .flat_map(|c| [c.last_value_key(), c.average_key()])
            .collect::<Vec<_>>();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 8);
    }

    #[test]
    fn last_values_iterates_present_channels() {
        let mut last = LastValues::default();
        assert_eq!(last.iter().count(), 0);

        last.set(Channel::Ir, 61_000.0);
        last.set(Channel::Bpm, 72.0);
        last.set(Channel::Bpm, 74.0);

        let values = last.iter().collect::<Vec<_>>();
        assert_eq!(values, vec![(Channel::Bpm, 74.0), (Channel::Ir, 61_000.0)]);
    }
}
