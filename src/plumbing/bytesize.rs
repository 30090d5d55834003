//! Human-readable byte-size parsing ("20GB", "512MB") via SI multipliers.
//!
//! Sizes in configuration documents are written the way an operator would
//! type them, not as raw integers; the parsed value must still fit whatever
//! integer width the caller declares, so overflow is a parse error rather
//! than a silent wraparound.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SizeParseError {
    #[error("empty size string")]
    Empty,
    #[error("unrecognized size suffix in {0:?}")]
    UnknownSuffix(String),
    #[error("invalid numeric value in {0:?}")]
    InvalidNumber(String),
    #[error("size {value} does not fit in the declared width")]
    Overflow { value: u128 },
}

const SUFFIXES: &[(&str, u128)] = &[
    ("TB", 1_000_000_000_000),
    ("GB", 1_000_000_000),
    ("MB", 1_000_000),
    ("KB", 1_000),
    ("B", 1),
];

/// Parses a human size string into a raw byte count, checking that it fits
/// in `u64` (the widest integer any caller in this crate declares).
pub fn parse(input: &str) -> Result<u64, SizeParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SizeParseError::Empty);
    }

    let (number_part, multiplier) = SUFFIXES
        .iter()
        .find_map(|(suffix, mult)| {
            trimmed
                .strip_suffix(suffix)
                .map(|rest| (rest.trim(), *mult))
        })
        .ok_or_else(|| SizeParseError::UnknownSuffix(trimmed.to_string()))?;

    let value: f64 = number_part
        .parse()
        .map_err(|_| SizeParseError::InvalidNumber(trimmed.to_string()))?;
    if value < 0.0 {
        return Err(SizeParseError::InvalidNumber(trimmed.to_string()));
    }

    let total = (value * multiplier as f64).round() as u128;
    u64::try_from(total).map_err(|_| SizeParseError::Overflow { value: total })
}

/// A parsed byte size, held as the raw `u64` count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ByteSize(u64);

impl ByteSize {
    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl TryFrom<String> for ByteSize {
    type Error = SizeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(ByteSize(parse(&value)?))
    }
}

impl From<ByteSize> for String {
    fn from(value: ByteSize) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.0)
    }
}

/// `serde(with = ...)` helper so `Config` fields can deserialize a
/// `ByteSize` straight from a plain YAML string without the
/// `try_from`/`into` wrapper leaking into every call site.
pub mod serde_bytesize {
    use super::ByteSize;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &ByteSize, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ByteSize, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ByteSize::try_from(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_suffixes() {
        assert_eq!(parse("20GB").unwrap(), 20_000_000_000);
        assert_eq!(parse("512MB").unwrap(), 512_000_000);
        assert_eq!(parse("1KB").unwrap(), 1_000);
        assert_eq!(parse("16B").unwrap(), 16);
    }

    #[test]
    fn rejects_unknown_suffix() {
        assert!(matches!(
            parse("20XB"),
            Err(SizeParseError::UnknownSuffix(_))
        ));
    }

    #[test]
    fn rejects_overflow() {
        // u64::MAX is ~18.4 EB; ask for something far larger.
        assert!(matches!(
            parse("999999999999TB"),
            Err(SizeParseError::Overflow { .. })
        ));
    }

    #[test]
    fn empty_string_is_an_error() {
        assert_eq!(parse(""), Err(SizeParseError::Empty));
    }
}
