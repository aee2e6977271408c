use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::AdjustmentError;

/// Player role; decides which direction of the raw metric is favourable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Batter,
    Pitcher,
}

impl Role {
    /// +1 for batters, -1 for pitchers (a lower xwOBA allowed is better)
    pub fn orientation(self) -> f64 {
        match self {
            Role::Batter => 1.0,
            Role::Pitcher => -1.0,
        }
    }

    /// Infer the role from a single position string
    pub fn from_position(position: &str) -> Self {
        match position.trim().to_uppercase().as_str() {
            "P" | "SP" | "RP" => Role::Pitcher,
            _ => Role::Batter,
        }
    }

    /// Infer the role from a multi-position eligibility list
    pub fn from_positions(positions: &[String]) -> Self {
        if positions.iter().any(|p| Role::from_position(p) == Role::Pitcher) {
            Role::Pitcher
        } else {
            Role::Batter
        }
    }

    /// Subdirectory holding this role's rolling-window files
    pub fn rolling_dir(self) -> &'static str {
        match self {
            Role::Batter => "hitters",
            Role::Pitcher => "pitchers",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Batter => "batter",
            Role::Pitcher => "pitcher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AdjustmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "batter" | "hitter" => Ok(Role::Batter),
            "pitcher" => Ok(Role::Pitcher),
            other => Err(AdjustmentError::UnknownRole(other.to_string())),
        }
    }
}

/// DFS site; each carries its own scoring and base projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    DraftKings,
    FanDuel,
}

impl Site {
    /// Field prefix used by the upstream projection payload ("dkProjection")
    pub fn projection_prefix(self) -> &'static str {
        match self {
            Site::DraftKings => "dk",
            Site::FanDuel => "fd",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Site::DraftKings => "draftkings",
            Site::FanDuel => "fanduel",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Site {
    type Err = AdjustmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draftkings" | "dk" => Ok(Site::DraftKings),
            "fanduel" | "fd" => Ok(Site::FanDuel),
            other => Err(AdjustmentError::UnknownSite(other.to_string())),
        }
    }
}

/// One of the three fixed rolling windows, measured in plate appearances
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WindowSize {
    #[serde(rename = "50")]
    W50,
    #[serde(rename = "100")]
    W100,
    #[serde(rename = "250")]
    W250,
}

impl WindowSize {
    pub const ALL: [WindowSize; 3] = [WindowSize::W50, WindowSize::W100, WindowSize::W250];

    /// Number of events in the window
    pub fn events(self) -> u32 {
        match self {
            WindowSize::W50 => 50,
            WindowSize::W100 => 100,
            WindowSize::W250 => 250,
        }
    }

    /// Key used in upstream JSON ("50", "100", "250")
    pub fn key(self) -> &'static str {
        match self {
            WindowSize::W50 => "50",
            WindowSize::W100 => "100",
            WindowSize::W250 => "250",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        WindowSize::ALL.into_iter().find(|w| w.key() == key.trim())
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Latest value of one rolling window for one player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingWindowObservation {
    pub window_size: WindowSize,

    /// Metric on its natural scale (xwOBA, e.g. 0.352)
    pub raw_metric: f64,

    /// Whether enough events back this window to trust it
    pub sample_adequate: bool,
}

impl RollingWindowObservation {
    pub fn new(window_size: WindowSize, raw_metric: f64, sample_adequate: bool) -> Self {
        Self {
            window_size,
            raw_metric,
            sample_adequate,
        }
    }
}

/// Site-specific base projection for one player on one slate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerBaseProjection {
    /// Upstream id used to look up rolling windows; `None` when the slate
    /// player could not be matched to one
    pub player_id: Option<String>,

    pub name: String,

    pub site: Site,

    pub role: Role,

    /// Fantasy-point projection, always positive
    pub base_value: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,

    /// Site's own player id, carried through for the upload step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dfs_id: Option<String>,
}

/// Audit record for one window's part in the signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowContribution {
    pub raw_metric: f64,

    /// (raw - baseline) / baseline, sign-flipped for pitchers
    pub relative_deviation: f64,

    /// Effective weight after renormalizing over present windows
    pub weight: f64,

    /// weight * relative_deviation; contributions sum to the signal
    pub contribution: f64,
}

/// Why a result carries the factor it does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdjustmentReason {
    /// Slate player has no upstream id, so no windows were looked up
    UnresolvedPlayer,
    /// No present, adequate window
    NoWindowData,
    /// Windows were present but every one of them carries zero weight
    NoUsableWeight,
    /// Signal computed and applied
    Adjusted { windows_used: usize, capped: bool },
}

/// Outcome of the adjustment for one player on one site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentResult {
    pub player_id: Option<String>,
    pub name: String,
    pub site: Site,
    pub role: Role,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dfs_id: Option<String>,

    pub base_value: f64,

    /// Weighted relative deviation; `None` for passthroughs
    pub signal: Option<f64>,

    pub per_window_contribution: BTreeMap<WindowSize, WindowContribution>,

    /// Clamped fractional adjustment actually applied
    pub factor: f64,

    /// base_value * (1 + factor), unrounded
    pub adjusted_value: f64,

    pub reason: AdjustmentReason,

    pub explanation: String,
}

impl AdjustmentResult {
    /// Passthrough result carrying the base value unchanged
    pub fn passthrough(projection: &PlayerBaseProjection, reason: AdjustmentReason) -> Self {
        Self {
            player_id: projection.player_id.clone(),
            name: projection.name.clone(),
            site: projection.site,
            role: projection.role,
            team: projection.team.clone(),
            dfs_id: projection.dfs_id.clone(),
            base_value: projection.base_value,
            signal: None,
            per_window_contribution: BTreeMap::new(),
            factor: 0.0,
            adjusted_value: projection.base_value,
            reason,
            explanation: explain(reason, 0.0),
        }
    }

    /// adjusted - base
    pub fn delta(&self) -> f64 {
        self.adjusted_value - self.base_value
    }

    /// Change relative to base, as a fraction
    pub fn delta_pct(&self) -> f64 {
        if self.base_value == 0.0 {
            0.0
        } else {
            self.adjusted_value / self.base_value - 1.0
        }
    }

    pub fn is_adjusted(&self) -> bool {
        matches!(self.reason, AdjustmentReason::Adjusted { .. })
    }
}

/// Human-readable explanation for a reason/factor pair
pub fn explain(reason: AdjustmentReason, factor: f64) -> String {
    match reason {
        AdjustmentReason::UnresolvedPlayer => "player not matched to an upstream id".to_string(),
        AdjustmentReason::NoWindowData => "no rolling window data available".to_string(),
        AdjustmentReason::NoUsableWeight => "no weighted windows available".to_string(),
        AdjustmentReason::Adjusted { windows_used, capped } => {
            let plural = if windows_used == 1 { "" } else { "s" };
            let mut text = format!(
                "factor={:.2} ({:.1}% of base) from {} window{}",
                factor,
                factor * 100.0,
                windows_used,
                plural
            );
            if capped {
                text.push_str(", capped");
            }
            text
        }
    }
}
