use crate::normalize::{normalize_name, normalize_team};
use crate::types::{LookupError, RosterData};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Player Registry - Maps slate players to upstream player ids
///
/// The registry is built from the active roster feed and answers
/// `(name, team) -> id` lookups using normalized keys.
pub struct PlayerRegistry {
    /// Map from (normalized name, normalized team) to player id
    ids_by_name_team: HashMap<(String, String), String>,

    /// Map from normalized name to every matching player id, in roster order
    ids_by_name: HashMap<String, Vec<String>>,

    /// Total number of indexed players
    player_count: usize,
}

impl PlayerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            ids_by_name_team: HashMap::new(),
            ids_by_name: HashMap::new(),
            player_count: 0,
        }
    }

    /// Build a registry from already-parsed roster data
    pub fn from_roster_data(data: &RosterData) -> Self {
        let mut registry = Self::new();
        registry.create_index(data);
        registry
    }

    /// Load the roster feed from a JSON file and index it
    pub async fn load_from_file<P: AsRef<Path>>(
        &mut self,
        file_path: P,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("Loading roster data from: {:?}", file_path.as_ref());

        let json_content = tokio::fs::read_to_string(&file_path).await?;
        let roster_data: RosterData = serde_json::from_str(&json_content)?;

        info!("Loaded rosters for {} teams", roster_data.rosters.len());

        self.create_index(&roster_data);

        info!("Indexed {} players", self.player_count);
        Ok(())
    }

    fn create_index(&mut self, data: &RosterData) {
        self.ids_by_name_team.clear();
        self.ids_by_name.clear();

        let mut skipped = 0usize;
        for (team, team_roster) in &data.rosters {
            let team_key = normalize_team(team);
            for entry in &team_roster.roster {
                let (Some(name), Some(id)) = (entry.match_name(), entry.id) else {
                    skipped += 1;
                    continue;
                };

                let name_key = normalize_name(name);
                let id = id.to_string();
                self.ids_by_name_team.insert((name_key.clone(), team_key.clone()), id.clone());
                self.ids_by_name.entry(name_key).or_default().push(id);
            }
        }

        if skipped > 0 {
            warn!("Skipped {} roster entries without a name or id", skipped);
        }

        self.player_count = self.ids_by_name_team.len();
    }

    /// Resolve a slate player to an upstream id
    ///
    /// An exact (name, team) match wins; otherwise the first roster entry with
    /// the same name on any team is used, which covers recent trades.
    pub fn resolve(&self, name: &str, team: &str) -> Result<&str, LookupError> {
        if self.is_empty() {
            return Err(LookupError::RegistryNotInitialized);
        }

        let name_key = normalize_name(name);
        let team_key = normalize_team(team);

        if let Some(id) = self.ids_by_name_team.get(&(name_key.clone(), team_key)) {
            return Ok(id.as_str());
        }

        match self.ids_by_name.get(&name_key).map(Vec::as_slice) {
            Some([only]) => Ok(only.as_str()),
            Some([first, rest @ ..]) => {
                debug!(
                    "Ambiguous name '{}' ({} candidates), using id {}",
                    name,
                    rest.len() + 1,
                    first
                );
                Ok(first.as_str())
            }
            _ => Err(LookupError::PlayerNotFound(name.to_string())),
        }
    }

    /// Number of indexed (name, team) pairs
    pub fn player_count(&self) -> usize {
        self.player_count
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.ids_by_name_team.is_empty()
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
