use std::{fmt, str::FromStr};

use crate::{CodecError, helpers::NumericPrefix};

/// One reading as printed by the sensor firmware, e.g.
/// `IR=123456, RED=78901, SpO2=98.5, BPM=72.0, Avg BPM=73`.
///
/// Every field is optional: the firmware omits values it has not computed
/// yet, and a missing value is not the same as a zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub ir: Option<u32>,
    pub red: Option<u32>,
    pub spo2: Option<f64>,
    pub bpm: Option<f64>,
    pub avg_bpm: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field {
    Ir(u32),
    Red(u32),
    SpO2(f64),
    Bpm(f64),
    AvgBpm(u32),
}

impl Field {
    pub const IR: &'static str = "IR";
    pub const RED: &'static str = "RED";
    pub const SPO2: &'static str = "SpO2";
    pub const BPM: &'static str = "BPM";
    pub const AVG_BPM: &'static str = "Avg BPM";

    fn integer(key: &'static str, value: &str) -> Result<u32, CodecError> {
        let invalid = || CodecError::InvalidNumber {
            key,
            value: value.to_owned(),
        };

        value
            .integer_prefix()
            .ok_or_else(invalid)?
            .parse()
            .map_err(|_| invalid())
    }

    fn decimal(key: &'static str, value: &str) -> Result<f64, CodecError> {
        let Some(number) = value.decimal_prefix() else {
            return Err(match value.integer_prefix() {
                Some(_) => CodecError::MissingDecimal {
                    key,
                    value: value.to_owned(),
                },
                None => CodecError::InvalidNumber {
                    key,
                    value: value.to_owned(),
                },
            });
        };

        number.parse().map_err(|_| CodecError::InvalidNumber {
            key,
            value: value.to_owned(),
        })
    }
}

impl FromStr for Field {
    type Err = CodecError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CodecError::EmptyToken);
        }

        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| CodecError::MissingSeparator(token.to_owned()))?;
        let value = value.trim();

        match key.trim() {
            Self::IR => Self::integer(Self::IR, value).map(Self::Ir),
            Self::RED => Self::integer(Self::RED, value).map(Self::Red),
            Self::SPO2 => Self::decimal(Self::SPO2, value).map(Self::SpO2),
            Self::BPM => Self::decimal(Self::BPM, value).map(Self::Bpm),
            Self::AVG_BPM => Self::integer(Self::AVG_BPM, value).map(Self::AvgBpm),
            unknown => Err(CodecError::UnknownKey(unknown.to_owned())),
        }
    }
}

impl RawSample {
    /// Parses one line. Never fails: tokens that do not parse are skipped,
    /// and a line with no known key yields an empty sample.
    pub fn parse(line: &str) -> Self {
        Self::fields(line)
            .filter_map(Result::ok)
            .fold(Self::default(), |mut sample, field| {
                sample.apply(field);
                sample
            })
    }

    /// Every `,` separated token of `line` with its parse outcome.
    pub fn fields(line: &str) -> impl Iterator<Item = Result<Field, CodecError>> + '_ {
        line.split(',')
            .filter(|token| !token.trim().is_empty())
            .map(str::parse::<Field>)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    // The first occurrence of a key wins.
    fn apply(&mut self, field: Field) {
        match field {
            Field::Ir(ir) => {
                self.ir.get_or_insert(ir);
            }
            Field::Red(red) => {
                self.red.get_or_insert(red);
            }
            Field::SpO2(spo2) => {
                self.spo2.get_or_insert(spo2);
            }
            Field::Bpm(bpm) => {
                self.bpm.get_or_insert(bpm);
            }
            Field::AvgBpm(avg) => {
                self.avg_bpm.get_or_insert(avg);
            }
        }
    }
}

struct Decimal(f64);

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{:.1}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Formats the sample in the firmware's line format, without the newline.
impl fmt::Display for RawSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens = [
            self.ir.map(|v| format!("{}={v}", Field::IR)),
            self.red.map(|v| format!("{}={v}", Field::RED)),
            self.spo2.map(|v| format!("{}={}", Field::SPO2, Decimal(v))),
            self.bpm.map(|v| format!("{}={}", Field::BPM, Decimal(v))),
            self.avg_bpm.map(|v| format!("{}={v}", Field::AVG_BPM)),
        ];

        let line = tokens.into_iter().flatten().collect::<Vec<_>>().join(", ");
        f.write_str(&line)
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::LineFramer;

    #[test]
    fn parses_full_line() {
        let sample = RawSample::parse("IR=123456, RED=78901, SpO2=98.5, BPM=72.0, Avg BPM=73");
        assert_eq!(
            sample,
            RawSample {
                ir: Some(123456),
                red: Some(78901),
                spo2: Some(98.5),
                bpm: Some(72.0),
                avg_bpm: Some(73),
            }
        );
    }

    #[test]
    fn keys_are_order_insensitive() {
        let sample = RawSample::parse("Avg BPM=73, BPM=72.0, RED=78901, IR=123456");
        assert_eq!(sample.ir, Some(123456));
        assert_eq!(sample.red, Some(78901));
        assert_eq!(sample.bpm, Some(72.0));
        assert_eq!(sample.avg_bpm, Some(73));
        assert_eq!(sample.spo2, None);
    }

    #[test]
    fn partial_line_keeps_present_fields() {
        let sample = RawSample::parse("IR=4012, RED=3990");
        assert_eq!(sample.ir, Some(4012));
        assert_eq!(sample.red, Some(3990));
        assert!(sample.bpm.is_none());
        assert!(sample.spo2.is_none());
    }

    #[test]
    fn zero_is_not_absence() {
        let sample = RawSample::parse("IR=0, BPM=0.0");
        assert_eq!(sample.ir, Some(0));
        assert_eq!(sample.bpm, Some(0.0));
        assert!(!sample.is_empty());
    }

    #[test]
    fn decimal_required_for_spo2_and_bpm() {
        let sample = RawSample::parse("SpO2=98, BPM=72, Avg BPM=73");
        assert_eq!(sample.spo2, None);
        assert_eq!(sample.bpm, None);
        assert_eq!(sample.avg_bpm, Some(73));
    }

    #[test]
    fn trailing_unit_is_ignored() {
        let sample = RawSample::parse("SpO2=98.5%, BPM=72.0\r");
        assert_eq!(sample.spo2, Some(98.5));
        assert_eq!(sample.bpm, Some(72.0));
    }

    #[test]
    fn avg_bpm_does_not_leak_into_bpm() {
        let sample = RawSample::parse("Avg BPM=73");
        assert_eq!(sample.avg_bpm, Some(73));
        assert_eq!(sample.bpm, None);
    }

    #[test]
    fn unknown_and_garbled_lines_are_empty() {
        for line in [
            "",
            "   ",
            "MAX30105 was not found. Please check wiring/power.",
            "Place your index finger on the sensor",
            "IR=, RED=abc, SpO2=.5, BPM=-72.0",
            "IR=99999999999999999999",
            "=,=,,,",
            "ÿþ\u{0}garbage",
        ] {
            assert!(RawSample::parse(line).is_empty(), "line {line:?}");
        }
    }

    #[test]
    fn first_occurrence_wins() {
        let sample = RawSample::parse("IR=1, IR=2");
        assert_eq!(sample.ir, Some(1));
    }

    #[test]
    fn field_errors_explain_skips() {
        assert_eq!(
            "Temp=36.6".parse::<Field>(),
            Err(CodecError::UnknownKey("Temp".into()))
        );
        assert_eq!(
            "BPM=72".parse::<Field>(),
            Err(CodecError::MissingDecimal {
                key: Field::BPM,
                value: "72".into()
            })
        );
        assert_eq!(
            "IR=abc".parse::<Field>(),
            Err(CodecError::InvalidNumber {
                key: Field::IR,
                value: "abc".into()
            })
        );
        assert_eq!(
            "IR".parse::<Field>(),
            Err(CodecError::MissingSeparator("IR".into()))
        );
        assert_eq!(" Avg BPM = 73 ".parse::<Field>(), Ok(Field::AvgBpm(73)));
    }

    #[test]
    fn display_uses_wire_format() {
        let sample = RawSample {
            ir: Some(123456),
            red: Some(78901),
            spo2: Some(98.5),
            bpm: Some(72.0),
            avg_bpm: Some(73),
        };
        let line = sample.to_string();
        assert_eq!(line, "IR=123456, RED=78901, SpO2=98.5, BPM=72.0, Avg BPM=73");
        assert_eq!(RawSample::parse(&line), sample);
    }

    #[test]
    fn serializes_missing_fields_as_null() {
        let sample = RawSample::parse("IR=60000");
        let json = serde_json::to_value(sample).unwrap();
        assert_eq!(json["ir"], 60000);
        assert!(json["bpm"].is_null());
    }

    const ALPHABET: &[&str] = &[
        "IR", "RED", "SpO2", "BPM", "Avg BPM", "=", "==", ",", ", ", ".", "-", "+", " ", "\t",
        "\r", "0", "7", "42", "60000", "98.5", "1e9", "99999999999999999999", "NaN", "inf",
        "µ", "ç", "🫀", "\u{0}",
    ];

    fn random_line(rng: &mut StdRng) -> String {
        let len = rng.random_range(0..24);
        (0..len)
            .map(|_| {
                if rng.random_bool(0.2) {
                    rng.random::<char>().to_string()
                } else {
                    ALPHABET[rng.random_range(0..ALPHABET.len())].to_owned()
                }
            })
            .collect()
    }

    #[test]
    fn parse_accepts_arbitrary_lines() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..5_000 {
            let line = random_line(&mut rng);
            let sample = RawSample::parse(&line);
            let parsed = RawSample::fields(&line).filter(Result::is_ok).count();
            assert_eq!(sample.is_empty(), parsed == 0, "{line:?}");
        }
    }

    #[test]
    fn framed_random_bytes_always_parse() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut framer = LineFramer::with_max_line(64);

        for _ in 0..2_000 {
            let mut chunk = vec![0u8; rng.random_range(0..48)];
            rng.fill(&mut chunk[..]);
            if rng.random_bool(0.5) {
                chunk.extend_from_slice(random_line(&mut rng).as_bytes());
                chunk.push(b'\n');
            }

            for line in framer.feed(&chunk) {
                RawSample::parse(&line);
            }
            assert!(framer.pending() <= 64);
        }
    }
}
