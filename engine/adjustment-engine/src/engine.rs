use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::calculator::SignalCalculator;
use crate::config::AdjustmentParameters;
use crate::error::Result;
use crate::models::{
    explain, AdjustmentReason, AdjustmentResult, PlayerBaseProjection, RollingWindowObservation,
};
use crate::rolling::ObservationSource;

/// Aggregate view of one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub adjusted: usize,
    /// Every player left at base value, unresolved ones included
    pub passthrough: usize,
    pub unresolved: usize,
    pub capped: usize,
    /// Mean applied factor over adjusted players (0 when none)
    pub mean_factor: f64,
}

impl BatchSummary {
    fn from_results(results: &[AdjustmentResult]) -> Self {
        let mut summary = BatchSummary {
            processed: results.len(),
            ..Default::default()
        };
        let mut factor_sum = 0.0;

        for result in results {
            match result.reason {
                AdjustmentReason::Adjusted { capped, .. } => {
                    summary.adjusted += 1;
                    factor_sum += result.factor;
                    if capped {
                        summary.capped += 1;
                    }
                }
                AdjustmentReason::UnresolvedPlayer => {
                    summary.unresolved += 1;
                    summary.passthrough += 1;
                }
                AdjustmentReason::NoWindowData | AdjustmentReason::NoUsableWeight => {
                    summary.passthrough += 1;
                }
            }
        }

        if summary.adjusted > 0 {
            summary.mean_factor = factor_sum / summary.adjusted as f64;
        }
        summary
    }

    /// Share of players that received an adjustment
    pub fn coverage(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.adjusted as f64 / self.processed as f64
        }
    }
}

/// Results of adjusting a slate, in input order
#[derive(Debug, Clone)]
pub struct AdjustmentBatch {
    pub results: Vec<AdjustmentResult>,
    pub summary: BatchSummary,
}

/// Per-player orchestrator
///
/// Each player's result depends only on its own projection, its own windows
/// and the run's parameters, so players can be processed in any order.
pub struct AdjustmentEngine {
    calculator: SignalCalculator,
}

impl AdjustmentEngine {
    /// Validate the parameters and build the engine
    pub fn new(params: AdjustmentParameters) -> Result<Self> {
        params.validate()?;

        if !params.weights.is_normalized() {
            warn!(
                "Window weights sum to {:.4}, not 1.0; signals are renormalized per player",
                params.weights.total()
            );
        }

        info!(
            "Adjustment engine ready (weights 50/100/250 = {}/{}/{}, k = {}, cap = ±{:.0}%, \
             baseline = {:.3})",
            params.weights.w50,
            params.weights.w100,
            params.weights.w250,
            params.aggressiveness,
            params.cap * 100.0,
            params.league_baseline
        );

        Ok(Self {
            calculator: SignalCalculator::new(params),
        })
    }

    pub fn params(&self) -> &AdjustmentParameters {
        self.calculator.params()
    }

    /// Adjust one player from its observations
    ///
    /// A player without an upstream id always passes through; observations
    /// handed in for one are ignored.
    pub fn adjust_player(
        &self,
        projection: &PlayerBaseProjection,
        observations: &[RollingWindowObservation],
    ) -> AdjustmentResult {
        if projection.player_id.is_none() {
            debug!(name = %projection.name, "no upstream id");
            return AdjustmentResult::passthrough(projection, AdjustmentReason::UnresolvedPlayer);
        }

        let Some(windows) = self.calculator.usable_windows(observations) else {
            debug!(
                player_id = ?projection.player_id,
                name = %projection.name,
                "no rolling window data"
            );
            return AdjustmentResult::passthrough(projection, AdjustmentReason::NoWindowData);
        };

        let Some(breakdown) = self.calculator.combine(&windows, projection.role) else {
            debug!(
                player_id = ?projection.player_id,
                name = %projection.name,
                "present windows carry no weight"
            );
            return AdjustmentResult::passthrough(projection, AdjustmentReason::NoUsableWeight);
        };

        let applied = self.calculator.apply(projection.base_value, breakdown.signal);
        let reason = AdjustmentReason::Adjusted {
            windows_used: breakdown.contributions.len(),
            capped: applied.capped,
        };

        debug!(
            player_id = ?projection.player_id,
            name = %projection.name,
            role = %projection.role,
            signal = breakdown.signal,
            factor = applied.factor,
            base = projection.base_value,
            adjusted = applied.adjusted_value,
            "adjusted projection"
        );

        AdjustmentResult {
            player_id: projection.player_id.clone(),
            name: projection.name.clone(),
            site: projection.site,
            role: projection.role,
            team: projection.team.clone(),
            dfs_id: projection.dfs_id.clone(),
            base_value: projection.base_value,
            signal: Some(breakdown.signal),
            per_window_contribution: breakdown.contributions,
            factor: applied.factor,
            adjusted_value: applied.adjusted_value,
            reason,
            explanation: explain(reason, applied.factor),
        }
    }

    /// Adjust every projection, looking windows up by (player id, role)
    ///
    /// Players without an upstream id are never looked up.
    pub fn adjust_all<S>(&self, projections: &[PlayerBaseProjection], source: &S) -> AdjustmentBatch
    where
        S: ObservationSource + Sync,
    {
        info!("Adjusting {} players", projections.len());

        let adjust = |projection: &PlayerBaseProjection| {
            let observations = match &projection.player_id {
                Some(player_id) => source.observations(player_id, projection.role),
                None => Vec::new(),
            };
            self.adjust_player(projection, &observations)
        };

        let results: Vec<AdjustmentResult> = if self.params().parallel {
            projections.par_iter().map(adjust).collect()
        } else {
            projections.iter().map(adjust).collect()
        };

        let summary = BatchSummary::from_results(&results);

        info!(
            "Adjustment complete: {} processed, {} adjusted ({} capped), {} passed through \
             ({} unresolved), mean factor {:+.3}",
            summary.processed,
            summary.adjusted,
            summary.capped,
            summary.passthrough,
            summary.unresolved,
            summary.mean_factor
        );

        AdjustmentBatch { results, summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, Site, WindowSize};
    use crate::rolling::RollingWindowIndex;

    fn projection(player_id: &str, role: Role, base_value: f64) -> PlayerBaseProjection {
        PlayerBaseProjection {
            player_id: Some(player_id.to_string()),
            name: format!("Player {player_id}"),
            site: Site::DraftKings,
            role,
            base_value,
            team: Some("NYY".to_string()),
            dfs_id: Some(format!("dk-{player_id}")),
        }
    }

    fn obs(window: WindowSize, raw: f64) -> RollingWindowObservation {
        RollingWindowObservation::new(window, raw, true)
    }

    fn engine() -> AdjustmentEngine {
        AdjustmentEngine::new(AdjustmentParameters::default()).unwrap()
    }

    /// Records the ids it was asked about
    struct RecordingSource {
        index: RollingWindowIndex,
        asked: std::sync::Mutex<Vec<String>>,
    }

    impl ObservationSource for RecordingSource {
        fn observations(&self, player_id: &str, role: Role) -> Vec<RollingWindowObservation> {
            self.asked.lock().unwrap().push(player_id.to_string());
            self.index.observations(player_id, role)
        }
    }

    #[test]
    fn test_invalid_parameters_fail_fast() {
        let mut params = AdjustmentParameters::default();
        params.cap = -0.1;
        assert!(AdjustmentEngine::new(params).is_err());
    }

    #[test]
    fn test_passthrough_without_windows() {
        let result = engine().adjust_player(&projection("1", Role::Batter, 9.5), &[]);

        assert_eq!(result.factor, 0.0);
        assert_eq!(result.adjusted_value, 9.5);
        assert_eq!(result.signal, None);
        assert_eq!(result.reason, AdjustmentReason::NoWindowData);
        assert_eq!(result.explanation, "no rolling window data available");
        assert_eq!(result.dfs_id.as_deref(), Some("dk-1"));
        assert!(!result.is_adjusted());
    }

    #[test]
    fn test_inadequate_windows_pass_through() {
        let thin = vec![RollingWindowObservation::new(WindowSize::W50, 0.600, false)];
        let result = engine().adjust_player(&projection("1", Role::Batter, 9.5), &thin);
        assert_eq!(result.reason, AdjustmentReason::NoWindowData);
        assert_eq!(result.adjusted_value, 9.5);
    }

    #[test]
    fn test_zero_weight_window_passes_through() {
        let mut params = AdjustmentParameters::default();
        params.weights.w250 = 0.0;
        let engine = AdjustmentEngine::new(params).unwrap();

        let result = engine.adjust_player(
            &projection("1", Role::Batter, 9.5),
            &[obs(WindowSize::W250, 0.400)],
        );
        assert_eq!(result.reason, AdjustmentReason::NoUsableWeight);
        assert_eq!(result.factor, 0.0);
    }

    #[test]
    fn test_zero_weight_window_not_counted() {
        let mut params = AdjustmentParameters::default();
        params.weights.w100 = 0.0;
        let engine = AdjustmentEngine::new(params).unwrap();

        let windows = vec![obs(WindowSize::W50, 0.400), obs(WindowSize::W100, 0.100)];
        let result = engine.adjust_player(&projection("1", Role::Batter, 10.0), &windows);

        assert_eq!(
            result.reason,
            AdjustmentReason::Adjusted {
                windows_used: 1,
                capped: false
            }
        );
        assert!(result.explanation.ends_with("from 1 window"));
        assert!(!result.per_window_contribution.contains_key(&WindowSize::W100));
        assert!((result.signal.unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_adjusted_result_fields() {
        let windows = vec![obs(WindowSize::W50, 0.400), obs(WindowSize::W100, 0.360)];
        let result = engine().adjust_player(&projection("1", Role::Batter, 10.0), &windows);

        let signal = result.signal.unwrap();
        assert!(signal > 0.0);
        assert!(result.is_adjusted());
        assert_eq!(result.per_window_contribution.len(), 2);
        assert_eq!(
            result.reason,
            AdjustmentReason::Adjusted {
                windows_used: 2,
                capped: false
            }
        );
        assert!((result.factor - 0.15 * signal).abs() < 1e-12);
        assert!((result.delta() - 10.0 * result.factor).abs() < 1e-9);
        assert!((result.delta_pct() - result.factor).abs() < 1e-9);
    }

    #[test]
    fn test_pitcher_signal_is_negated() {
        let windows = vec![obs(WindowSize::W50, 0.380)];
        let batter = engine().adjust_player(&projection("1", Role::Batter, 10.0), &windows);
        let pitcher = engine().adjust_player(&projection("1", Role::Pitcher, 10.0), &windows);

        assert_eq!(batter.signal.unwrap(), -pitcher.signal.unwrap());
        assert!(pitcher.factor < 0.0);
    }

    #[test]
    fn test_unresolved_player_ignores_observations() {
        let mut player = projection("1", Role::Pitcher, 20.0);
        player.player_id = None;

        let result = engine().adjust_player(&player, &[obs(WindowSize::W50, 0.200)]);
        assert_eq!(result.reason, AdjustmentReason::UnresolvedPlayer);
        assert_eq!(result.player_id, None);
        assert_eq!(result.adjusted_value, 20.0);
    }

    #[test]
    fn test_adjust_all_never_looks_up_unresolved_players() {
        let mut index = RollingWindowIndex::new();
        index.insert("dk-2", Role::Pitcher, vec![obs(WindowSize::W50, 0.200)]);
        let source = RecordingSource {
            index,
            asked: std::sync::Mutex::new(Vec::new()),
        };

        let mut unresolved = projection("2", Role::Pitcher, 20.0);
        unresolved.player_id = None;
        let players = vec![projection("1", Role::Pitcher, 20.0), unresolved];

        let batch = engine().adjust_all(&players, &source);
        assert_eq!(*source.asked.lock().unwrap(), vec!["1".to_string()]);
        assert_eq!(batch.results[1].reason, AdjustmentReason::UnresolvedPlayer);
        assert_eq!(batch.results[1].adjusted_value, 20.0);
        assert_eq!(batch.summary.unresolved, 1);
        assert_eq!(batch.summary.passthrough, 2);
    }

    #[test]
    fn test_adjust_all_preserves_order_and_summarizes() {
        let mut index = RollingWindowIndex::new();
        // 0.800 is far enough above the baseline to hit the cap
        index.insert("1", Role::Batter, vec![obs(WindowSize::W50, 0.800)]);
        index.insert("3", Role::Pitcher, vec![obs(WindowSize::W50, 0.100)]);

        let players = vec![
            projection("1", Role::Batter, 10.0),
            projection("2", Role::Batter, 8.0),
            projection("3", Role::Pitcher, 20.0),
        ];

        let batch = engine().adjust_all(&players, &index);
        let ids: Vec<&str> = batch
            .results
            .iter()
            .filter_map(|r| r.player_id.as_deref())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        assert_eq!(batch.summary.processed, 3);
        assert_eq!(batch.summary.adjusted, 2);
        assert_eq!(batch.summary.passthrough, 1);
        assert_eq!(batch.summary.unresolved, 0);
        assert_eq!(batch.summary.capped, 1);
        assert!((batch.summary.coverage() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut index = RollingWindowIndex::new();
        let mut players = Vec::new();
        for i in 0..200 {
            let id = i.to_string();
            let role = if i % 3 == 0 { Role::Pitcher } else { Role::Batter };
            if i % 2 == 0 {
                index.insert(
                    id.clone(),
                    role,
                    vec![
                        obs(WindowSize::W50, 0.250 + i as f64 * 0.001),
                        obs(WindowSize::W250, 0.330),
                    ],
                );
            }
            players.push(projection(&id, role, 5.0 + i as f64 * 0.1));
        }

        let sequential = engine().adjust_all(&players, &index);

        let mut params = AdjustmentParameters::default();
        params.parallel = true;
        let parallel = AdjustmentEngine::new(params).unwrap().adjust_all(&players, &index);

        assert_eq!(sequential.results, parallel.results);
        assert_eq!(sequential.summary, parallel.summary);
    }
}
