use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ContactStatus {
    Good,
    #[strum(serialize = "No Finger")]
    NoFinger,
}

/// One row of the session history table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub time: NaiveDateTime,
    /// Milliseconds since the session started.
    pub offset_ms: u64,
    pub bpm: Option<f64>,
    pub spo2: Option<f64>,
    pub status: ContactStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels() {
        assert_eq!(ContactStatus::Good.to_string(), "Good");
        assert_eq!(ContactStatus::NoFinger.to_string(), "No Finger");
    }

    #[test]
    fn entry_round_trips_through_json() {
        let time = chrono::NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let entry = HistoryEntry {
            time,
            offset_ms: 5_250,
            bpm: Some(72.0),
            spo2: None,
            status: ContactStatus::Good,
        };

        let json = serde_json::to_string(&entry).unwrap();
        let back: HistoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
