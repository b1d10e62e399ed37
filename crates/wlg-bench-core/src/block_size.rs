//! Sized-unit block size strings (`4k`, `128K`, `1m`, `512`).

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

fn block_size_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?i)\s*(?P<n>[0-9]+)\s*(?P<unit>[kmg]?)(?:i?b)?\s*$").expect("valid regex")
    })
}

/// A block size, kept in canonical lowercase label form (`4k`) plus bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockSize {
    bytes: u64,
    label: String,
}

/// The string was not a `<digits>[k|m|g]` size.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid block size {0:?}")]
pub struct InvalidBlockSize(pub String);

impl BlockSize {
    #[must_use]
    pub const fn bytes(&self) -> u64 {
        self.bytes
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl FromStr for BlockSize {
    type Err = InvalidBlockSize;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = block_size_re()
            .captures(s)
            .ok_or_else(|| InvalidBlockSize(s.to_string()))?;
        let n: u64 = caps["n"]
            .parse()
            .map_err(|_| InvalidBlockSize(s.to_string()))?;
        let unit = caps["unit"].to_ascii_lowercase();
        let multiplier: u64 = match unit.as_str() {
            "k" => 1024,
            "m" => 1024 * 1024,
            "g" => 1024 * 1024 * 1024,
            _ => 1,
        };
        if n == 0 {
            return Err(InvalidBlockSize(s.to_string()));
        }
        let bytes = n
            .checked_mul(multiplier)
            .ok_or_else(|| InvalidBlockSize(s.to_string()))?;
        Ok(Self {
            bytes,
            label: format!("{n}{unit}"),
        })
    }
}

impl fmt::Display for BlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl Serialize for BlockSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label)
    }
}

impl<'de> Deserialize<'de> for BlockSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
