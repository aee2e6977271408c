use std::collections::BTreeMap;
use tracing::warn;

use crate::config::AdjustmentParameters;
use crate::models::{Role, RollingWindowObservation, WindowContribution, WindowSize};

/// Combined signal with its per-window audit trail
#[derive(Debug, Clone, PartialEq)]
pub struct SignalBreakdown {
    pub signal: f64,
    pub contributions: BTreeMap<WindowSize, WindowContribution>,
}

/// Result of mapping a signal onto a base projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedAdjustment {
    /// k * signal before clamping
    pub raw_factor: f64,
    /// Clamped to [-cap, +cap]
    pub factor: f64,
    pub adjusted_value: f64,
    pub capped: bool,
}

/// Signal calculator for rolling-window adjustments
///
/// Pure arithmetic over one player's windows; holds no state besides the
/// run's parameters.
#[derive(Debug, Clone)]
pub struct SignalCalculator {
    params: AdjustmentParameters,
}

impl SignalCalculator {
    /// Create a new signal calculator
    pub fn new(params: AdjustmentParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &AdjustmentParameters {
        &self.params
    }

    /// Raw metric per present, adequately sampled window
    ///
    /// Inadequate samples and non-finite metrics are treated as absent.
    /// Returns `None` when no window survives.
    pub fn usable_windows(
        &self,
        observations: &[RollingWindowObservation],
    ) -> Option<BTreeMap<WindowSize, f64>> {
        let mut windows = BTreeMap::new();

        for obs in observations {
            if !obs.sample_adequate || !obs.raw_metric.is_finite() {
                continue;
            }
            if windows.contains_key(&obs.window_size) {
                warn!("Duplicate observation for window {}, keeping the first", obs.window_size);
                continue;
            }
            windows.insert(obs.window_size, obs.raw_metric);
        }

        if windows.is_empty() {
            None
        } else {
            Some(windows)
        }
    }

    /// (raw - baseline) / baseline, oriented so positive is favourable
    pub fn relative_deviation(&self, raw_metric: f64, role: Role) -> f64 {
        let baseline = self.params.league_baseline;
        (raw_metric - baseline) / baseline * role.orientation()
    }

    /// Weighted average of the present windows' deviations
    ///
    /// `windows` maps window size to raw metric. Weights are renormalized over
    /// the windows actually present, so a player missing the 250 window is
    /// blended 0.625/0.375 under the default weights. Windows configured with
    /// zero weight play no part and are left out of the audit trail. Returns
    /// `None` when the present windows carry no weight at all.
    pub fn combine(
        &self,
        windows: &BTreeMap<WindowSize, f64>,
        role: Role,
    ) -> Option<SignalBreakdown> {
        let weight_sum: f64 = windows
            .keys()
            .map(|w| self.params.weights.weight_for(*w))
            .sum();
        if weight_sum <= 0.0 {
            return None;
        }

        let mut signal = 0.0;
        let mut contributions = BTreeMap::new();
        for (&window, &raw_metric) in windows {
            let configured = self.params.weights.weight_for(window);
            if configured <= 0.0 {
                continue;
            }

            let relative_deviation = self.relative_deviation(raw_metric, role);
            let weight = configured / weight_sum;
            let contribution = weight * relative_deviation;
            signal += contribution;
            contributions.insert(
                window,
                WindowContribution {
                    raw_metric,
                    relative_deviation,
                    weight,
                    contribution,
                },
            );
        }

        Some(SignalBreakdown {
            signal,
            contributions,
        })
    }

    /// factor = clamp(k * signal, -cap, cap); adjusted = base * (1 + factor)
    pub fn apply(&self, base_value: f64, signal: f64) -> AppliedAdjustment {
        let cap = self.params.cap;
        let raw_factor = self.params.aggressiveness * signal;
        let factor = raw_factor.clamp(-cap, cap);

        AppliedAdjustment {
            raw_factor,
            factor,
            adjusted_value: base_value * (1.0 + factor),
            capped: factor != raw_factor,
        }
    }
}
