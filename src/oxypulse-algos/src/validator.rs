use oxypulse_codec::RawSample;
use oxypulse_types::{Channel, FingerState};

pub struct SignalValidator;

/// A sample together with its finger state and per-channel plausibility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub sample: RawSample,
    pub finger: FingerState,
    pub bpm_valid: bool,
    pub spo2_valid: bool,
    pub ir_valid: bool,
    pub red_valid: bool,
}

impl Classification {
    pub fn is_valid(&self, channel: Channel) -> bool {
        match channel {
            Channel::Bpm => self.bpm_valid,
            Channel::SpO2 => self.spo2_valid,
            Channel::Ir => self.ir_valid,
            Channel::Red => self.red_valid,
        }
    }

    /// The channel's value, only if it passed its plausibility check.
    pub fn plausible(&self, channel: Channel) -> Option<f64> {
        if !self.is_valid(channel) {
            return None;
        }

        match channel {
            Channel::Bpm => self.sample.bpm,
            Channel::SpO2 => self.sample.spo2,
            Channel::Ir => self.sample.ir.map(f64::from),
            Channel::Red => self.sample.red.map(f64::from),
        }
    }

    pub fn finger_present(&self) -> bool {
        self.finger == FingerState::Present
    }
}

impl SignalValidator {
    /// IR amplitude at or above which a finger is considered on the sensor.
    pub const FINGER_IR_THRESHOLD: u32 = 50_000;
    /// Exclusive bounds of a plausible heart rate.
    pub const MIN_BPM: f64 = 20.0;
    pub const MAX_BPM: f64 = 255.0;
    /// Inclusive upper bound of a plausible SpO2.
    pub const MAX_SPO2: f64 = 100.0;

    pub fn classify(sample: RawSample) -> Classification {
        Classification {
            sample,
            finger: Self::finger_state(sample.ir),
            bpm_valid: sample.bpm.is_some_and(Self::bpm_plausible),
            spo2_valid: sample.spo2.is_some_and(Self::spo2_plausible),
            ir_valid: sample.ir.is_some_and(|ir| ir > 0),
            red_valid: sample.red.is_some_and(|red| red > 0),
        }
    }

    pub fn finger_state(ir: Option<u32>) -> FingerState {
        match ir {
            Some(ir) if ir >= Self::FINGER_IR_THRESHOLD => FingerState::Present,
            _ => FingerState::NoFinger,
        }
    }

    pub fn bpm_plausible(bpm: f64) -> bool {
        bpm > Self::MIN_BPM && bpm < Self::MAX_BPM
    }

    pub fn spo2_plausible(spo2: f64) -> bool {
        spo2 > 0.0 && spo2 <= Self::MAX_SPO2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ir(ir: u32) -> RawSample {
        RawSample {
            ir: Some(ir),
            ..Default::default()
        }
    }

    fn bpm(bpm: f64) -> RawSample {
        RawSample {
            bpm: Some(bpm),
            ..Default::default()
        }
    }

    fn spo2(spo2: f64) -> RawSample {
        RawSample {
            spo2: Some(spo2),
            ..Default::default()
        }
    }

    #[test]
    fn finger_threshold_is_exact() {
        assert_eq!(SignalValidator::classify(ir(49_999)).finger, FingerState::NoFinger);
        assert_eq!(SignalValidator::classify(ir(50_000)).finger, FingerState::Present);
        assert_eq!(SignalValidator::classify(ir(120_000)).finger, FingerState::Present);
    }

    #[test]
    fn missing_ir_means_no_finger() {
        let classification = SignalValidator::classify(RawSample::default());
        assert_eq!(classification.finger, FingerState::NoFinger);
        assert!(!classification.ir_valid);
    }

    #[test]
    fn bpm_bounds_are_exclusive() {
        assert!(!SignalValidator::classify(bpm(20.0)).bpm_valid);
        assert!(SignalValidator::classify(bpm(20.01)).bpm_valid);
        assert!(SignalValidator::classify(bpm(254.99)).bpm_valid);
        assert!(!SignalValidator::classify(bpm(255.0)).bpm_valid);
    }

    #[test]
    fn spo2_upper_bound_is_inclusive() {
        assert!(SignalValidator::classify(spo2(100.0)).spo2_valid);
        assert!(!SignalValidator::classify(spo2(100.01)).spo2_valid);
        assert!(!SignalValidator::classify(spo2(0.0)).spo2_valid);
        assert!(SignalValidator::classify(spo2(0.1)).spo2_valid);
    }

    #[test]
    fn raw_channels_need_positive_values() {
        let zero = SignalValidator::classify(RawSample {
            ir: Some(0),
            red: Some(0),
            ..Default::default()
        });
        assert!(!zero.ir_valid);
        assert!(!zero.red_valid);

        let positive = SignalValidator::classify(RawSample {
            ir: Some(1),
            red: Some(1),
            ..Default::default()
        });
        assert!(positive.ir_valid);
        assert!(positive.red_valid);
    }

    #[test]
    fn channels_are_independent() {
        let classification = SignalValidator::classify(RawSample {
            ir: Some(10_000),
            red: Some(9_000),
            spo2: Some(180.0),
            bpm: Some(72.0),
            avg_bpm: None,
        });

        assert_eq!(classification.finger, FingerState::NoFinger);
        assert_eq!(classification.plausible(Channel::Bpm), Some(72.0));
        assert_eq!(classification.plausible(Channel::SpO2), None);
        assert_eq!(classification.plausible(Channel::Ir), Some(10_000.0));
        assert_eq!(classification.plausible(Channel::Red), Some(9_000.0));
    }
}
