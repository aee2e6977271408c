//! Serialized run output

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::config::AdjustmentParameters;
use crate::engine::{AdjustmentBatch, BatchSummary};
use crate::error::Result;
use crate::models::{AdjustmentResult, Site};
use crate::slate::Slate;

/// Everything a downstream exporter needs from one run
#[derive(Debug, Serialize)]
pub struct AdjustmentReport<'a> {
    pub site: Site,
    pub slate: Option<&'a str>,
    pub date: Option<&'a str>,
    pub generated_at: DateTime<Utc>,
    pub parameters: &'a AdjustmentParameters,
    pub summary: &'a BatchSummary,
    pub results: &'a [AdjustmentResult],
}

impl<'a> AdjustmentReport<'a> {
    pub fn new(
        slate: &'a Slate,
        parameters: &'a AdjustmentParameters,
        batch: &'a AdjustmentBatch,
    ) -> Self {
        Self {
            site: slate.site,
            slate: slate.slate.as_deref(),
            date: slate.date.as_deref(),
            generated_at: Utc::now(),
            parameters,
            summary: &batch.summary,
            results: &batch.results,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write to `path`, creating parent directories, or to stdout when `None`
    pub async fn write(&self, path: Option<&Path>) -> Result<()> {
        let json = self.to_json()?;
        match path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(path, json).await?;
                info!("Wrote {} results to {:?}", self.results.len(), path);
            }
            None => println!("{json}"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AdjustmentEngine;
    use crate::models::{PlayerBaseProjection, Role, RollingWindowObservation, WindowSize};
    use crate::rolling::RollingWindowIndex;
    use tempfile::TempDir;

    fn slate() -> Slate {
        Slate {
            site: Site::FanDuel,
            slate: Some("main".to_string()),
            date: None,
            players: vec![
                PlayerBaseProjection {
                    player_id: Some("1".to_string()),
                    name: "Hot Bat".to_string(),
                    site: Site::FanDuel,
                    role: Role::Batter,
                    base_value: 10.0,
                    team: None,
                    dfs_id: Some("fd-1".to_string()),
                },
                PlayerBaseProjection {
                    player_id: Some("2".to_string()),
                    name: "Rookie".to_string(),
                    site: Site::FanDuel,
                    role: Role::Batter,
                    base_value: 7.0,
                    team: None,
                    dfs_id: None,
                },
                PlayerBaseProjection {
                    player_id: None,
                    name: "Call Up".to_string(),
                    site: Site::FanDuel,
                    role: Role::Pitcher,
                    base_value: 18.5,
                    team: None,
                    dfs_id: Some("fd-3".to_string()),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_report_written_to_file() {
        let slate = slate();
        let mut index = RollingWindowIndex::new();
        index.insert(
            "1",
            Role::Batter,
            vec![RollingWindowObservation::new(WindowSize::W50, 0.400, true)],
        );

        let params = AdjustmentParameters::default();
        let batch = AdjustmentEngine::new(params.clone())
            .unwrap()
            .adjust_all(&slate.players, &index);
        let report = AdjustmentReport::new(&slate, &params, &batch);

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out/adj_fd.json");
        report.write(Some(&path)).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(written["site"], "fanduel");
        assert_eq!(written["slate"], "main");
        assert_eq!(written["summary"]["adjusted"], 1);
        assert_eq!(written["results"][0]["reason"]["kind"], "adjusted");
        assert!(written["results"][0]["per_window_contribution"]["50"].is_object());
        assert_eq!(
            written["results"][1]["explanation"],
            "no rolling window data available"
        );
        assert_eq!(written["results"][1]["adjusted_value"], 7.0);

        let unresolved = &written["results"][2];
        assert!(unresolved["player_id"].is_null());
        assert_eq!(unresolved["reason"]["kind"], "unresolved_player");
        assert_eq!(unresolved["dfs_id"], "fd-3");
        assert_eq!(written["summary"]["unresolved"], 1);
    }
}
