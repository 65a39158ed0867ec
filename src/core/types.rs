//! Core type definitions used throughout the codebase

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Turn counter (one turn is one in-game year)
pub type Turn = u32;

/// Unique identifier for nations
///
/// Identities are short stable codes ("jpn", "fra"); ordering on the id is the
/// tie-breaker for every leaderboard.
#[derive(
    Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display(fmt = "{}", _0)]
#[serde(transparent)]
pub struct NationId(pub String);

impl NationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Unique identifier for timelines
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
pub struct TimelineId(pub Uuid);

impl TimelineId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a timeline id from its hyphenated form
    pub fn parse_str(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// First eight hex digits, used in CLI listings
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for TimelineId {
    fn default() -> Self {
        Self::new()
    }
}

/// Developmental era, ordered from Stone to Space
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum Era {
    Stone = 0,
    Bronze = 1,
    Iron = 2,
    Classical = 3,
    Medieval = 4,
    Renaissance = 5,
    Industrial = 6,
    Modern = 7,
    Information = 8,
    Space = 9,
}

impl Era {
    pub const ALL: [Era; 10] = [
        Era::Stone,
        Era::Bronze,
        Era::Iron,
        Era::Classical,
        Era::Medieval,
        Era::Renaissance,
        Era::Industrial,
        Era::Modern,
        Era::Information,
        Era::Space,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Era at the given ordinal, saturating at both ends
    pub fn from_index(index: usize) -> Era {
        Era::ALL[index.min(Era::ALL.len() - 1)]
    }

    /// One step later, saturating at Space
    pub fn next(self) -> Era {
        Era::from_index(self.index() + 1)
    }

    /// One step earlier, saturating at Stone
    pub fn prev(self) -> Era {
        Era::from_index(self.index().saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nation_id_ordering() {
        let a = NationId::from("arg");
        let b = NationId::from("bra");
        assert!(a < b);
        assert_eq!(a.to_string(), "arg");
    }

    #[test]
    fn test_era_ordering() {
        assert!(Era::Stone < Era::Bronze);
        assert!(Era::Modern < Era::Space);
        assert_eq!(Era::ALL.len(), 10);
        for pair in Era::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_era_steps_saturate() {
        assert_eq!(Era::Stone.prev(), Era::Stone);
        assert_eq!(Era::Space.next(), Era::Space);
        assert_eq!(Era::Industrial.next(), Era::Modern);
        assert_eq!(Era::Industrial.prev(), Era::Renaissance);
    }

    #[test]
    fn test_timeline_id_parse() {
        let id = TimelineId::new();
        let parsed = TimelineId::parse_str(&id.to_string());
        assert_eq!(parsed, Some(id));
        assert_eq!(id.short().len(), 8);
    }
}
