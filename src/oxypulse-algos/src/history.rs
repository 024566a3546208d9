use std::{collections::VecDeque, time::Duration};

use chrono::NaiveDateTime;
use oxypulse_types::{ContactStatus, HistoryEntry};

use crate::Classification;

/// Throttled log of readings shown in the history table and exported with
/// the session report.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    min_spacing: Duration,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(Self::CAPACITY, Self::MIN_SPACING)
    }
}

impl HistoryLog {
    pub const CAPACITY: usize = 20;
    pub const MIN_SPACING: Duration = Duration::from_secs(5);

    pub fn new(capacity: usize, min_spacing: Duration) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            min_spacing,
        }
    }

    /// Records the sample if it carries a plausible heart rate (or none at
    /// all) and the previous entry is more than `min_spacing` old. Returns
    /// whether an entry was added.
    pub fn record(
        &mut self,
        classification: &Classification,
        time: NaiveDateTime,
        offset: Duration,
    ) -> bool {
        if classification.sample.bpm.is_some() && !classification.bpm_valid {
            return false;
        }

        if let Some(last) = self.entries.back() {
            let since = offset.saturating_sub(Duration::from_millis(last.offset_ms));
            if since <= self.min_spacing {
                return false;
            }
        }

        let status = match classification.finger_present() {
            true => ContactStatus::Good,
            false => ContactStatus::NoFinger,
        };

        self.entries.push_back(HistoryEntry {
            time,
            offset_ms: offset.as_millis().try_into().unwrap_or(u64::MAX),
            bpm: classification.sample.bpm,
            spo2: classification.sample.spo2,
            status,
        });

        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }

        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> Vec<HistoryEntry> {
        self.entries.into()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeDelta};
    use oxypulse_codec::RawSample;

    use super::*;
    use crate::SignalValidator;

    fn at(secs: u64) -> (NaiveDateTime, Duration) {
        let base = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        (
            base + TimeDelta::seconds(secs as i64),
            Duration::from_secs(secs),
        )
    }

    fn classify(line: &str) -> Classification {
        SignalValidator::classify(RawSample::parse(line))
    }

    #[test]
    fn entries_are_spaced() {
        let mut log = HistoryLog::default();
        let sample = classify("IR=60000, BPM=72.0, SpO2=98.0");

        let (time, offset) = at(0);
        assert!(log.record(&sample, time, offset));
        let (time, offset) = at(3);
        assert!(!log.record(&sample, time, offset));
        let (time, offset) = at(5);
        assert!(!log.record(&sample, time, offset));
        let (time, offset) = at(6);
        assert!(log.record(&sample, time, offset));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn implausible_heart_rate_is_not_logged() {
        let mut log = HistoryLog::default();
        let (time, offset) = at(0);
        assert!(!log.record(&classify("IR=60000, BPM=300.0"), time, offset));
        assert!(log.record(&classify("IR=60000, SpO2=97.0"), time, offset));

        let entry = log.entries().next().unwrap();
        assert_eq!(entry.bpm, None);
        assert_eq!(entry.spo2, Some(97.0));
        assert_eq!(entry.status, ContactStatus::Good);
    }

    #[test]
    fn status_follows_finger_state() {
        let mut log = HistoryLog::default();
        let (time, offset) = at(0);
        log.record(&classify("IR=1200, BPM=72.0"), time, offset);
        assert_eq!(log.entries().next().unwrap().status, ContactStatus::NoFinger);
    }

    #[test]
    fn oldest_entries_are_evicted() {
        let mut log = HistoryLog::new(3, Duration::ZERO);
        for secs in 1..=5 {
            let (time, offset) = at(secs);
            let sample = classify(&format!("IR=60000, BPM={}.0", 70 + secs));
            assert!(log.record(&sample, time, offset));
        }

        let bpms = log
            .into_entries()
            .into_iter()
            .map(|e| e.bpm.unwrap())
            .collect::<Vec<_>>();
        assert_eq!(bpms, vec![73.0, 74.0, 75.0]);
    }
}
