//! Loading of upstream rolling-window files
//!
//! The collector writes one JSON file per player under
//! `<root>/hitters/<id>.json` or `<root>/pitchers/<id>.json`. Each window
//! carries a newest-first `series` of xwOBA readings; the window's metric is
//! the newest reading.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{AdjustmentError, Result};
use crate::models::{PlayerBaseProjection, Role, RollingWindowObservation, WindowSize};

/// Anything that can hand out a player's rolling-window observations
pub trait ObservationSource {
    /// Observations for the player; empty when nothing is known
    fn observations(&self, player_id: &str, role: Role) -> Vec<RollingWindowObservation>;
}

/// Counters from a directory load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub loaded: usize,
    pub missing: usize,
    pub malformed: usize,
    /// Slate players without an upstream id; never looked up
    pub unresolved: usize,
}

/// In-memory observations keyed by (player id, role)
#[derive(Debug, Clone, Default)]
pub struct RollingWindowIndex {
    observations: HashMap<(String, Role), Vec<RollingWindowObservation>>,
    stats: LoadStats,
}

impl RollingWindowIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        player_id: impl Into<String>,
        role: Role,
        observations: Vec<RollingWindowObservation>,
    ) {
        self.observations
            .insert((player_id.into(), role), observations);
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    /// Load the files for every distinct (player, role) on the slate
    ///
    /// Missing files mean "no data"; unreadable or malformed files are
    /// logged and skipped so one bad player never aborts the run. Players
    /// without an upstream id are skipped without touching the filesystem.
    pub async fn load(
        root: &Path,
        players: &[PlayerBaseProjection],
        min_series_points: usize,
    ) -> Self {
        let mut index = Self::new();
        let mut seen = HashSet::new();

        for player in players {
            let Some(player_id) = player.player_id.as_deref() else {
                debug!("{} has no upstream id, skipping rolling lookup", player.name);
                index.stats.unresolved += 1;
                continue;
            };

            if !seen.insert((player_id, player.role)) {
                continue;
            }

            let Some(path) = player_file(root, player_id, player.role) else {
                warn!(
                    "Refusing to load rolling data for suspicious player id {:?}",
                    player_id
                );
                index.stats.malformed += 1;
                continue;
            };

            match load_player_file(&path, min_series_points).await {
                Ok(observations) => {
                    index.stats.loaded += 1;
                    index.insert(player_id, player.role, observations);
                }
                Err(AdjustmentError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                    debug!("No rolling data for {} {}", player.role, player_id);
                    index.stats.missing += 1;
                }
                Err(e) => {
                    warn!(
                        "Skipping rolling data for {} {}: {}",
                        player.role, player_id, e
                    );
                    index.stats.malformed += 1;
                }
            }
        }

        info!(
            "Rolling windows: {} loaded, {} missing, {} malformed, {} unresolved",
            index.stats.loaded, index.stats.missing, index.stats.malformed, index.stats.unresolved
        );
        index
    }
}

impl ObservationSource for RollingWindowIndex {
    fn observations(&self, player_id: &str, role: Role) -> Vec<RollingWindowObservation> {
        self.observations
            .get(&(player_id.to_string(), role))
            .cloned()
            .unwrap_or_default()
    }
}

/// Path of a player's rolling file, or `None` for ids that are not plain names
pub fn player_file(root: &Path, player_id: &str, role: Role) -> Option<PathBuf> {
    let id = player_id.trim();
    if id.is_empty() || id.contains(|c: char| c == '/' || c == '\\') || id.contains("..") {
        return None;
    }
    Some(root.join(role.rolling_dir()).join(format!("{id}.json")))
}

/// Read and parse one player's rolling file
pub async fn load_player_file(
    path: &Path,
    min_series_points: usize,
) -> Result<Vec<RollingWindowObservation>> {
    let content = tokio::fs::read_to_string(path).await?;
    let document: Value = serde_json::from_str(&content)?;
    parse_rolling_document(&document, &path.display().to_string(), min_series_points)
}

/// Extract the present windows from a parsed rolling document
///
/// Windows with an empty series are absent. A window whose newest entry has
/// no numeric `xwoba` is malformed; it is logged and treated as absent.
pub fn parse_rolling_document(
    document: &Value,
    source_name: &str,
    min_series_points: usize,
) -> Result<Vec<RollingWindowObservation>> {
    let windows = document
        .get("rolling_windows")
        .or_else(|| document.get("multi_window_data"))
        .and_then(Value::as_object)
        .ok_or_else(|| AdjustmentError::malformed(source_name, "no rolling_windows object"))?;

    let mut observations = Vec::new();
    for window_size in WindowSize::ALL {
        let Some(window) = windows.get(window_size.key()) else {
            continue;
        };

        let series = window
            .get("series")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let Some(latest) = series.first() else {
            continue;
        };

        let Some(raw_metric) = latest.get("xwoba").and_then(Value::as_f64) else {
            warn!(
                "{}: window {} has no numeric xwoba, treating as absent",
                source_name, window_size
            );
            continue;
        };

        let sample_adequate = window
            .get("sample_adequate")
            .and_then(Value::as_bool)
            .unwrap_or(series.len() >= min_series_points);

        observations.push(RollingWindowObservation::new(
            window_size,
            raw_metric,
            sample_adequate,
        ));
    }

    Ok(observations)
}
