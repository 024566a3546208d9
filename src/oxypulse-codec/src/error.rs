use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("{self:?}")]
pub enum CodecError {
    EmptyToken,
    MissingSeparator(String),
    UnknownKey(String),
    InvalidNumber { key: &'static str, value: String },
    MissingDecimal { key: &'static str, value: String },
}
