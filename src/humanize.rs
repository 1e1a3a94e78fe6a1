//! Human-readable byte size parsing for config values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid size format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),
}

/// Byte size wrapper that deserializes from "10MB"-style strings or plain
/// integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl FromStr for ByteSize {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_uppercase();
        if s.is_empty() {
            return Err(ParseError::InvalidFormat(s));
        }

        // Longest suffix first so "MB" is not matched as "B"
        const SUFFIXES: &[(&str, u64)] = &[
            ("KIB", 1 << 10),
            ("MIB", 1 << 20),
            ("GIB", 1 << 30),
            ("TIB", 1 << 40),
            ("KB", 1 << 10),
            ("MB", 1 << 20),
            ("GB", 1 << 30),
            ("TB", 1 << 40),
            ("K", 1 << 10),
            ("M", 1 << 20),
            ("G", 1 << 30),
            ("T", 1 << 40),
            ("B", 1),
        ];

        for (suffix, multiplier) in SUFFIXES {
            if let Some(digits) = s.strip_suffix(suffix) {
                let num: u64 = digits.trim().parse()?;
                return Ok(ByteSize(num * multiplier));
            }
        }

        Ok(ByteSize(s.parse()?))
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ByteSizeVisitor;

        impl serde::de::Visitor<'_> for ByteSizeVisitor {
            type Value = ByteSize;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a byte size as string (e.g., \"10MB\") or integer")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ByteSize(v))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse::<ByteSize>().map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_any(ByteSizeVisitor)
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_number() {
        assert_eq!("4096".parse::<ByteSize>().unwrap().as_u64(), 4096);
    }

    #[test]
    fn test_parse_units() {
        assert_eq!("1KB".parse::<ByteSize>().unwrap().as_u64(), 1024);
        assert_eq!("10MB".parse::<ByteSize>().unwrap().as_u64(), 10 * 1024 * 1024);
        assert_eq!("2GiB".parse::<ByteSize>().unwrap().as_u64(), 2 << 30);
        assert_eq!("1T".parse::<ByteSize>().unwrap().as_u64(), 1 << 40);
        assert_eq!("512B".parse::<ByteSize>().unwrap().as_u64(), 512);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<ByteSize>().is_err());
        assert!("MB".parse::<ByteSize>().is_err());
        assert!("ten MB".parse::<ByteSize>().is_err());
    }

    #[test]
    fn test_deserialize_string_or_number() {
        #[derive(Deserialize)]
        struct Wrapper {
            size: ByteSize,
        }
        let from_str: Wrapper = serde_json::from_str(r#"{"size": "10MB"}"#).unwrap();
        assert_eq!(from_str.size.as_u64(), 10 * 1024 * 1024);
        let from_num: Wrapper = serde_json::from_str(r#"{"size": 2048}"#).unwrap();
        assert_eq!(from_num.size.as_u64(), 2048);
    }
}
