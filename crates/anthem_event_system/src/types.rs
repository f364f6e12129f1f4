//! Identity types shared between the host surface and plugins.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Stable numeric identity of a connected player.
///
/// The engine hands out account-level identifiers (u64), which is what
/// permission lists can name literally, so the newtype keeps that shape
/// instead of an opaque uuid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl PlayerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PlayerId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl FromStr for PlayerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_identity() {
        assert_eq!("76561198000000001".parse::<PlayerId>().unwrap(), PlayerId(76561198000000001));
        assert_eq!(" 42 ".parse::<PlayerId>().unwrap(), PlayerId(42));
        assert!("admin".parse::<PlayerId>().is_err());
        assert!("-5".parse::<PlayerId>().is_err());
    }

    #[test]
    fn displays_as_plain_number() {
        assert_eq!(PlayerId(7).to_string(), "7");
    }
}
