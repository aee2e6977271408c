//! Player Registry - Maps DFS slate players to upstream player ids
//!
//! Slate exports only carry a display name and a team abbreviation, while the
//! rolling-window data is keyed by the league's numeric player id. This crate
//! builds a roster index so the two can be joined.

pub mod normalize;
pub mod registry;
pub mod types;

pub use normalize::{normalize_name, normalize_team};
pub use registry::PlayerRegistry;
pub use types::{LookupError, RosterData, RosterEntry, TeamRoster};
