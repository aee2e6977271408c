use adjustment_engine::{
    logging, slate, AdjusterConfig, AdjustmentEngine, AdjustmentReport, RollingWindowIndex, Site,
};
use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use player_registry::PlayerRegistry;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Apply rolling-window adjustments to one site's base projections
#[derive(Parser, Debug)]
#[command(name = "adjust-slate", version)]
#[command(group(ArgGroup::new("input").required(true).args(["projections", "build_json"])))]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// DFS site (draftkings|fanduel); optional with a projections file that names it
    #[arg(long)]
    site: Option<Site>,

    /// Slate label carried into the output
    #[arg(long)]
    slate: Option<String>,

    /// Canonical base projections JSON
    #[arg(long)]
    projections: Option<PathBuf>,

    /// Optimizer build payload JSON (starters are extracted from it)
    #[arg(long)]
    build_json: Option<PathBuf>,

    /// Root of the rolling-window files (hitters/, pitchers/)
    #[arg(long)]
    rolling_dir: Option<PathBuf>,

    /// Active roster feed for resolving player ids
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Output path; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Weight for the 50-event window
    #[arg(long)]
    w50: Option<f64>,

    /// Weight for the 100-event window
    #[arg(long)]
    w100: Option<f64>,

    /// Weight for the 250-event window
    #[arg(long)]
    w250: Option<f64>,

    /// Aggressiveness multiplier
    #[arg(long)]
    k: Option<f64>,

    /// Max absolute adjustment as a fraction (0.2 = 20%)
    #[arg(long)]
    cap: Option<f64>,

    /// League-average xwOBA
    #[arg(long)]
    league_baseline: Option<f64>,

    /// Process players on the rayon pool
    #[arg(long)]
    parallel: bool,

    #[arg(long)]
    log_level: Option<String>,

    #[arg(long)]
    log_format: Option<String>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut AdjusterConfig) {
        let adj = &mut config.adjustment;
        if let Some(v) = self.w50 {
            adj.weights.w50 = v;
        }
        if let Some(v) = self.w100 {
            adj.weights.w100 = v;
        }
        if let Some(v) = self.w250 {
            adj.weights.w250 = v;
        }
        if let Some(v) = self.k {
            adj.aggressiveness = v;
        }
        if let Some(v) = self.cap {
            adj.cap = v;
        }
        if let Some(v) = self.league_baseline {
            adj.league_baseline = v;
        }
        if self.parallel {
            adj.parallel = true;
        }
        if let Some(dir) = &self.rolling_dir {
            config.data.rolling_dir = dir.clone();
        }
        if let Some(path) = &self.roster {
            config.data.roster_path = Some(path.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AdjusterConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    // The subscriber must exist before anything else is validated or logged
    config
        .logging
        .validate()
        .context("Invalid logging configuration")?;
    logging::initialize_logging_with_config(&config.logging.level, &config.logging.format)?;
    info!("Starting adjust-slate v{}", env!("CARGO_PKG_VERSION"));

    config.validate().context("Invalid configuration")?;

    if let Err(e) = run(&cli, &config).await {
        error!("Adjustment run failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(cli: &Cli, config: &AdjusterConfig) -> Result<()> {
    let engine = AdjustmentEngine::new(config.adjustment.clone())?;

    let mut slate = match (&cli.projections, &cli.build_json) {
        (Some(path), _) => slate::load_projections_file(path, cli.site)
            .await
            .with_context(|| {
                format!("Failed to load projections from {}", path.display())
            })?,
        (None, Some(path)) => {
            let site = cli.site.context("--site is required with --build-json")?;
            let registry = load_registry(config).await?;
            slate::load_build_optimization_file(path, site, &registry)
                .await
                .with_context(|| {
                    format!("Failed to load build payload from {}", path.display())
                })?
        }
        (None, None) => anyhow::bail!("either --projections or --build-json is required"),
    };
    if cli.slate.is_some() {
        slate.slate = cli.slate.clone();
    }

    let windows = RollingWindowIndex::load(
        &config.data.rolling_dir,
        &slate.players,
        config.data.min_series_points,
    )
    .await;

    let batch = engine.adjust_all(&slate.players, &windows);
    info!(
        "{}: {:.0}% of {} players adjusted",
        slate.site,
        batch.summary.coverage() * 100.0,
        batch.summary.processed
    );

    AdjustmentReport::new(&slate, engine.params(), &batch)
        .write(cli.output.as_deref())
        .await
        .context("Failed to write results")?;

    Ok(())
}

async fn load_registry(config: &AdjusterConfig) -> Result<PlayerRegistry> {
    let mut registry = PlayerRegistry::new();
    match &config.data.roster_path {
        Some(path) => registry
            .load_from_file(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load roster {}: {}", path.display(), e))?,
        None => warn!("No roster configured; slate players cannot be matched to rolling data"),
    }
    Ok(registry)
}
