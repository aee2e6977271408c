//! Base projection inputs
//!
//! Two documents are accepted: the canonical projections file, and the DFS
//! optimizer's build payload from which starters and the site's projection
//! field are pulled.

use player_registry::PlayerRegistry;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{AdjustmentError, Result};
use crate::models::{PlayerBaseProjection, Role, Site};

/// Base projections for one site and slate
#[derive(Debug, Clone)]
pub struct Slate {
    pub site: Site,
    pub slate: Option<String>,
    pub date: Option<String>,
    pub players: Vec<PlayerBaseProjection>,
}

#[derive(Debug, Deserialize)]
struct ProjectionRecord {
    player_id: String,
    name: String,
    role: Role,
    base_value: f64,
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    dfs_id: Option<String>,
}

/// Load a canonical projections file
pub async fn load_projections_file(path: &Path, site: Option<Site>) -> Result<Slate> {
    info!("Loading base projections from: {:?}", path);
    let content = tokio::fs::read_to_string(path).await?;
    let document: Value = serde_json::from_str(&content)?;
    parse_projections_document(&document, site)
}

/// Load an optimizer build payload and resolve players through the registry
pub async fn load_build_optimization_file(
    path: &Path,
    site: Site,
    registry: &PlayerRegistry,
) -> Result<Slate> {
    info!("Loading build payload from: {:?}", path);
    let content = tokio::fs::read_to_string(path).await?;
    let document: Value = serde_json::from_str(&content)?;
    parse_build_optimization(&document, site, registry)
}

/// Parse `{ "site", "slate", "players": [...] }`
///
/// Records that fail to deserialize or carry a non-positive base value are
/// skipped with a warning.
pub fn parse_projections_document(document: &Value, site: Option<Site>) -> Result<Slate> {
    let document_site = match document.get("site").and_then(Value::as_str) {
        Some(raw) => Some(raw.parse::<Site>()?),
        None => None,
    };

    let site = match (site, document_site) {
        (Some(requested), Some(found)) if requested != found => {
            return Err(AdjustmentError::malformed(
                "projections",
                format!("document is for {found}, requested {requested}"),
            ));
        }
        (Some(requested), _) => requested,
        (None, Some(found)) => found,
        (None, None) => {
            return Err(AdjustmentError::malformed("projections", "no site given"));
        }
    };

    let records = document
        .get("players")
        .and_then(Value::as_array)
        .ok_or_else(|| AdjustmentError::malformed("projections", "missing players array"))?;

    let mut players = Vec::with_capacity(records.len());
    for (i, raw) in records.iter().enumerate() {
        let record: ProjectionRecord = match serde_json::from_value(raw.clone()) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping projection record {}: {}", i, e);
                continue;
            }
        };

        if !is_valid_base(record.base_value) {
            warn!(
                "Skipping {} ({}): base value {} is not positive",
                record.name, record.player_id, record.base_value
            );
            continue;
        }

        players.push(PlayerBaseProjection {
            player_id: Some(record.player_id),
            name: record.name,
            site,
            role: record.role,
            base_value: record.base_value,
            team: record.team,
            dfs_id: record.dfs_id,
        });
    }

    info!(
        "Loaded {} of {} projection records for {}",
        players.len(),
        records.len(),
        site
    );

    Ok(Slate {
        site,
        slate: document.get("slate").and_then(Value::as_str).map(str::to_string),
        date: document.get("date").and_then(Value::as_str).map(str::to_string),
        players,
    })
}

/// Build base projections from the optimizer payload
///
/// Only confirmed starters are kept: batters with a visible batting order
/// slot, pitchers named as their game's home or away starter. The base value
/// is the site's own projection field (`dkProjection` / `fdProjection`).
/// Players the registry cannot match get no upstream id and are never
/// adjusted.
pub fn parse_build_optimization(
    document: &Value,
    site: Site,
    registry: &PlayerRegistry,
) -> Result<Slate> {
    let players = find_players(document).ok_or_else(|| {
        AdjustmentError::malformed("build payload", "could not locate players array")
    })?;

    let games: HashMap<String, &Value> = find_games(document)
        .unwrap_or(&[])
        .iter()
        .filter_map(|g| g.get("gid").and_then(value_to_string).map(|gid| (gid, g)))
        .collect();

    if registry.is_empty() {
        warn!("Player registry is empty; every player will pass through unadjusted");
    }

    let projection_key = format!("{}Projection", site.projection_prefix());
    let mut out = Vec::new();
    let mut not_starting = 0usize;
    let mut unresolved = 0usize;

    for player in players {
        let role = Role::from_positions(&positions_of(player));
        let starting = match role {
            Role::Batter => is_starting_batter(player),
            Role::Pitcher => is_starting_pitcher(player, &games),
        };
        if !starting {
            not_starting += 1;
            continue;
        }

        let name = str_field(player, "name").unwrap_or_default();
        let team = str_field(player, "team").unwrap_or_default().to_uppercase();
        let dfs_id = player.get("dfs_id").and_then(value_to_string);

        let base_value = player.get(&projection_key).and_then(Value::as_f64);
        let Some(base_value) = base_value.filter(|v| is_valid_base(*v)) else {
            warn!(
                "Skipping {} ({}): missing or non-positive {}",
                name, team, projection_key
            );
            continue;
        };

        let player_id = match registry.resolve(&name, &team) {
            Ok(id) => Some(id.to_string()),
            Err(e) => {
                debug!("Could not resolve {} ({}): {}", name, team, e);
                unresolved += 1;
                None
            }
        };

        out.push(PlayerBaseProjection {
            player_id,
            name,
            site,
            role,
            base_value,
            team: (!team.is_empty()).then_some(team),
            dfs_id,
        });
    }

    info!(
        "Built {} starters for {} ({} non-starters skipped, {} unresolved ids)",
        out.len(),
        site,
        not_starting,
        unresolved
    );

    let date = document
        .pointer("/metadata/request_data/date")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(Slate {
        site,
        slate: None,
        date,
        players: out,
    })
}

fn is_valid_base(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// First non-empty `players` array of objects, depth first
fn find_players(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Object(map) => {
            if let Some(Value::Array(players)) = map.get("players") {
                if players.first().map_or(false, Value::is_object) {
                    return Some(players.as_slice());
                }
            }
            map.values().find_map(find_players)
        }
        Value::Array(items) => items.iter().find_map(find_players),
        _ => None,
    }
}

/// First `games` array whose entries name both starters, depth first
fn find_games(value: &Value) -> Option<&[Value]> {
    const GAME_KEYS: [&str; 5] = [
        "gid",
        "home_team",
        "away_team",
        "home_starter",
        "away_starter",
    ];

    match value {
        Value::Object(map) => {
            if let Some(Value::Array(games)) = map.get("games") {
                if let Some(Value::Object(first)) = games.first() {
                    if GAME_KEYS.iter().all(|k| first.contains_key(*k)) {
                        return Some(games.as_slice());
                    }
                }
            }
            map.values().find_map(find_games)
        }
        Value::Array(items) => items.iter().find_map(find_games),
        _ => None,
    }
}

fn positions_of(player: &Value) -> Vec<String> {
    let raw = player.get("position").or_else(|| player.get("pos_str"));
    match raw {
        Some(Value::String(s)) => s.split('/').map(str::to_string).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn is_starting_batter(player: &Value) -> bool {
    match player.get("bat_ord_visible") {
        Some(Value::Number(n)) => n.as_f64().map_or(false, |v| v > 0.0),
        Some(Value::String(s)) => s.trim().parse::<u32>().map_or(false, |v| v > 0),
        _ => false,
    }
}

fn is_starting_pitcher(player: &Value, games: &HashMap<String, &Value>) -> bool {
    let game = player
        .get("gid")
        .and_then(value_to_string)
        .and_then(|gid| games.get(&gid));
    let Some(game) = game else {
        return false;
    };

    let name = str_field(player, "name").unwrap_or_default();
    let team = str_field(player, "team").unwrap_or_default().to_uppercase();
    if name.is_empty() || team.is_empty() {
        return false;
    }

    let field = |key: &str| str_field(game, key).unwrap_or_default();
    (team == field("home_team").to_uppercase() && name == field("home_starter"))
        || (team == field("away_team").to_uppercase() && name == field("away_starter"))
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(|s| s.trim().to_string())
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use player_registry::{RosterData, RosterEntry, TeamRoster};
    use serde_json::json;

    fn registry() -> PlayerRegistry {
        let mut rosters = std::collections::BTreeMap::new();
        rosters.insert(
            "NYY".to_string(),
            TeamRoster {
                roster: vec![
                    RosterEntry {
                        id: Some(592450),
                        full_name: Some("Aaron Judge".into()),
                        full_name_ascii: None,
                    },
                    RosterEntry {
                        id: Some(543037),
                        full_name: Some("Gerrit Cole".into()),
                        full_name_ascii: None,
                    },
                ],
            },
        );
        PlayerRegistry::from_roster_data(&RosterData { rosters })
    }

    fn build_payload() -> Value {
        json!({
            "metadata": {"request_data": {"date": "2025-07-04"}},
            "data": {
                "games": [
                    {"gid": 101, "home_team": "NYY", "away_team": "BOS",
                     "home_starter": "Gerrit Cole", "away_starter": "Brayan Bello"}
                ],
                "players": [
                    {"name": "Aaron Judge", "team": "NYY", "position": "OF", "bat_ord_visible": 2,
                     "dfs_id": 1001, "dkProjection": 12.25, "fdProjection": 15.1, "gid": 101},
                    {"name": "Bench Guy", "team": "NYY", "position": "1B", "bat_ord_visible": 0,
                     "dfs_id": 1002, "dkProjection": 4.0, "gid": 101},
                    {"name": "Gerrit Cole", "team": "NYY", "position": ["SP"],
                     "dfs_id": "1003", "dkProjection": 26.93, "gid": 101},
                    {"name": "Relief Arm", "team": "NYY", "position": "RP",
                     "dfs_id": 1004, "dkProjection": 3.1, "gid": 101},
                    {"name": "Rafael Devers", "team": "BOS", "position": "3B",
                     "bat_ord_visible": "4", "dfs_id": 1005, "dkProjection": 9.8, "gid": 101},
                    {"name": "No Proj", "team": "BOS", "position": "SS", "bat_ord_visible": 1,
                     "dfs_id": 1006, "gid": 101}
                ]
            }
        })
    }

    #[test]
    fn test_parse_projections_document() {
        let doc = json!({
            "site": "fanduel",
            "slate": "main",
            "players": [
                {"player_id": "592450", "name": "Aaron Judge", "role": "batter",
                 "base_value": 15.1},
                {"player_id": "543037", "name": "Gerrit Cole", "role": "pitcher",
                 "base_value": 40.2, "team": "NYY"},
                {"player_id": "1", "name": "Zero", "role": "batter", "base_value": 0.0},
                {"player_id": "2", "name": "Broken", "role": "shortstop", "base_value": 5.0},
                {"name": "No Id", "role": "batter", "base_value": 5.0}
            ]
        });

        let slate = parse_projections_document(&doc, None).unwrap();
        assert_eq!(slate.site, Site::FanDuel);
        assert_eq!(slate.slate.as_deref(), Some("main"));
        assert_eq!(slate.players.len(), 2);
        assert_eq!(slate.players[1].role, Role::Pitcher);
        assert_eq!(slate.players[1].team.as_deref(), Some("NYY"));
    }

    #[test]
    fn test_projections_site_mismatch() {
        let doc = json!({"site": "fanduel", "players": []});
        assert!(parse_projections_document(&doc, Some(Site::DraftKings)).is_err());
        assert!(parse_projections_document(&json!({"players": []}), None).is_err());
        let slate = parse_projections_document(&json!({"players": []}), Some(Site::DraftKings));
        assert_eq!(slate.unwrap().site, Site::DraftKings);
    }

    #[test]
    fn test_build_payload_keeps_only_starters() {
        let slate =
            parse_build_optimization(&build_payload(), Site::DraftKings, &registry()).unwrap();

        let names: Vec<&str> = slate.players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Aaron Judge", "Gerrit Cole", "Rafael Devers"]);
        assert_eq!(slate.date.as_deref(), Some("2025-07-04"));
    }

    #[test]
    fn test_build_payload_resolves_ids_and_site_projection() {
        let slate =
            parse_build_optimization(&build_payload(), Site::DraftKings, &registry()).unwrap();

        let judge = &slate.players[0];
        assert_eq!(judge.player_id.as_deref(), Some("592450"));
        assert_eq!(judge.dfs_id.as_deref(), Some("1001"));
        assert_eq!(judge.base_value, 12.25);
        assert_eq!(judge.role, Role::Batter);

        let cole = &slate.players[1];
        assert_eq!(cole.player_id.as_deref(), Some("543037"));
        assert_eq!(cole.role, Role::Pitcher);
        assert_eq!(cole.base_value, 26.93);

        // Not on the roster feed: no upstream id, site id still carried
        let devers = &slate.players[2];
        assert_eq!(devers.player_id, None);
        assert_eq!(devers.dfs_id.as_deref(), Some("1005"));
    }

    #[test]
    fn test_build_payload_other_site_field() {
        let slate =
            parse_build_optimization(&build_payload(), Site::FanDuel, &registry()).unwrap();
        // Only Judge carries an fdProjection
        assert_eq!(slate.players.len(), 1);
        assert_eq!(slate.players[0].base_value, 15.1);
    }

    #[test]
    fn test_build_payload_without_players() {
        let doc = json!({"data": {"players": []}});
        assert!(matches!(
            parse_build_optimization(&doc, Site::DraftKings, &registry()),
            Err(AdjustmentError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_build_payload_empty_registry_leaves_ids_unset() {
        let slate =
            parse_build_optimization(&build_payload(), Site::DraftKings, &PlayerRegistry::new())
                .unwrap();

        assert_eq!(slate.players.len(), 3);
        assert!(slate.players.iter().all(|p| p.player_id.is_none()));
        assert_eq!(slate.players[1].dfs_id.as_deref(), Some("1003"));
    }
}
