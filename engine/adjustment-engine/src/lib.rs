//! Rolling-Window Projection Adjuster
//!
//! Tilts a site's base DFS projection by a recent-performance signal built
//! from three rolling xwOBA windows (50/100/250 plate appearances). Each
//! window's deviation from the league baseline is weighted toward recency,
//! scaled by an aggressiveness factor and capped before being applied
//! multiplicatively to the base projection.

pub mod calculator;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod output;
pub mod rolling;
pub mod slate;

pub use calculator::{AppliedAdjustment, SignalBreakdown, SignalCalculator};
pub use config::{AdjusterConfig, AdjustmentParameters, WindowWeights};
pub use engine::{AdjustmentBatch, AdjustmentEngine, BatchSummary};
pub use error::{AdjustmentError, Result};
pub use models::*;
pub use output::AdjustmentReport;
pub use rolling::{ObservationSource, RollingWindowIndex};
pub use slate::Slate;
