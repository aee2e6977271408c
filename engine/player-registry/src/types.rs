use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single rostered player as published by the league roster feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    /// League player id (e.g., 592450)
    pub id: Option<u64>,

    /// Display name (e.g., "Aaron Judge")
    #[serde(rename = "fullName", default)]
    pub full_name: Option<String>,

    /// ASCII-folded display name, preferred when present
    #[serde(rename = "fullName_ascii", default)]
    pub full_name_ascii: Option<String>,
}

impl RosterEntry {
    /// Best available name for matching
    pub fn match_name(&self) -> Option<&str> {
        self.full_name_ascii
            .as_deref()
            .or(self.full_name.as_deref())
            .filter(|name| !name.trim().is_empty())
    }
}

/// Active roster for one team
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamRoster {
    #[serde(default)]
    pub roster: Vec<RosterEntry>,
}

/// Container for all active rosters keyed by team abbreviation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterData {
    #[serde(default)]
    pub rosters: BTreeMap<String, TeamRoster>,
}

/// Errors that can occur during player lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Player not found in registry
    PlayerNotFound(String),

    /// Registry has no entries loaded
    RegistryNotInitialized,
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::PlayerNotFound(name) => {
                write!(f, "Player '{name}' not found in registry")
            }
            LookupError::RegistryNotInitialized => {
                write!(f, "Player registry not initialized")
            }
        }
    }
}

impl std::error::Error for LookupError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_data_deserialization() {
        let json = r#"{
            "rosters": {
                "NYY": {
                    "roster": [
                        {"id": 592450, "fullName": "Aaron Judge"},
                        {"id": 665742, "fullName": "Juan Soto", "fullName_ascii": "Juan Soto"}
                    ]
                }
            }
        }"#;

        let data: RosterData = serde_json::from_str(json).unwrap();
        let nyy = &data.rosters["NYY"];
        assert_eq!(nyy.roster.len(), 2);
        assert_eq!(nyy.roster[0].match_name(), Some("Aaron Judge"));
        assert_eq!(nyy.roster[1].id, Some(665742));
    }

    #[test]
    fn test_match_name_prefers_ascii() {
        let entry = RosterEntry {
            id: Some(1),
            full_name: Some("José Ramírez".to_string()),
            full_name_ascii: Some("Jose Ramirez".to_string()),
        };
        assert_eq!(entry.match_name(), Some("Jose Ramirez"));

        let blank = RosterEntry {
            id: Some(2),
            full_name: Some("  ".to_string()),
            full_name_ascii: None,
        };
        assert_eq!(blank.match_name(), None);
    }
}
