//! Protocol revisions and version negotiation.

use std::fmt;
use std::str::FromStr;

/// The closed set of protocol revisions this implementation speaks.
///
/// Revisions are dated `YYYY-MM-DD` strings; lexicographic order on the
/// string is chronological order, and the derived `Ord` matches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtocolVersion {
    V2024_11_05,
    V2025_03_26,
    V2025_06_18,
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported protocol version `{0}`")]
pub struct VersionParseError(pub String);

impl ProtocolVersion {
    pub const LATEST: ProtocolVersion = ProtocolVersion::V2025_06_18;

    /// All supported revisions, oldest first.
    pub const ALL: [ProtocolVersion; 3] = [
        ProtocolVersion::V2024_11_05,
        ProtocolVersion::V2025_03_26,
        ProtocolVersion::V2025_06_18,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolVersion::V2024_11_05 => "2024-11-05",
            ProtocolVersion::V2025_03_26 => "2025-03-26",
            ProtocolVersion::V2025_06_18 => "2025-06-18",
        }
    }

    /// Server-side version selection: the client's proposal when supported,
    /// otherwise the highest supported revision that does not exceed the
    /// proposal. `None` means no acceptable version exists and the handshake
    /// must be rejected.
    pub fn negotiate(proposed: &str) -> Option<ProtocolVersion> {
        Self::ALL
            .iter()
            .rev()
            .find(|v| v.as_str() <= proposed)
            .copied()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|v| v.as_str() == s)
            .copied()
            .ok_or_else(|| VersionParseError(s.to_string()))
    }
}
