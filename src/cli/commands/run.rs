//! Implementation of the `dino run` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::adapters::explorers::BuiltinExplorers;
use crate::adapters::simulators::{ScriptedScenario, ScriptedSimulator};
use crate::adapters::tables::JsonlTableSink;
use crate::cli::output::{output, CampaignProgress, CommandOutput, ProgressBarExt};
use crate::domain::models::config::Config;
use crate::domain::models::parameter_space::ParameterSpace;
use crate::domain::models::table::TableName;
use crate::domain::models::target::{CampaignMode, Target};
use crate::domain::ports::{ScoreClassifier, TableSink};
use crate::infrastructure::config::ConfigLoader;
use crate::services::{ExplorationController, HistoryAggregator, ScenarioExecutor};

/// Arguments of `dino run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scripted simulator replay (YAML or JSON) the scenarios run against
    #[arg(long)]
    pub script: PathBuf,

    /// Parameter space file; the configured `parameter_space` when omitted
    #[arg(short, long)]
    pub space: Option<PathBuf>,

    /// Total test budget
    #[arg(short, long)]
    pub total: Option<usize>,

    /// Campaign seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Target behavior: side_move, run_red_light or collision
    #[arg(long)]
    pub target: Option<Target>,

    /// Campaign mode: envelope or monte_carlo
    #[arg(long)]
    pub mode: Option<CampaignMode>,

    /// Output directory for the tables
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Result of `dino run`.
#[derive(Debug, Serialize)]
pub struct RunOutput {
    /// Table base name
    pub name: String,
    /// Target behavior
    pub target: Target,
    /// Campaign mode
    pub mode: CampaignMode,
    /// Tests spent
    pub n_tests: usize,
    /// Test budget
    pub total: usize,
    /// Envelopes explored
    pub envelopes: usize,
    /// Rows written per table
    pub rows: usize,
    /// Rows classified as target
    pub targets: usize,
    /// Target rows over all rows
    pub target_rate: f64,
    /// Files written
    pub files: Vec<PathBuf>,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Campaign {} ({}, {:?})", self.name, self.target, self.mode),
            format!("  Tests:     {}/{}", self.n_tests, self.total),
            format!("  Envelopes: {}", self.envelopes),
            format!(
                "  Targets:   {}/{} ({:.1}%)",
                self.targets,
                self.rows,
                self.target_rate * 100.0
            ),
            "\nWrote:".to_string(),
        ];
        lines.extend(self.files.iter().map(|f| format!("  - {}", f.display())));
        lines.join("\n")
    }
}

fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(total) = args.total {
        config.campaign.total_tests = total;
    }
    if let Some(seed) = args.seed {
        config.campaign.seed = seed;
    }
    if let Some(target) = args.target {
        config.campaign.target = target;
    }
    if let Some(mode) = args.mode {
        config.campaign.mode = mode;
    }
    if let Some(ref dir) = args.output {
        config.output.dir = dir.clone();
    }
}

/// Run a campaign against a scripted simulator and write its tables.
pub async fn execute(args: RunArgs, mut config: Config, json_mode: bool) -> Result<()> {
    apply_overrides(&mut config, &args);
    ConfigLoader::validate(&config)?;

    let space_path = args.space.clone().unwrap_or_else(|| config.parameter_space.clone());
    let space = ParameterSpace::from_yaml_file(&space_path)
        .with_context(|| format!("Invalid parameter space {}", space_path.display()))?;
    let scenario = ScriptedScenario::from_yaml_file(&args.script)
        .with_context(|| format!("Invalid simulator script {}", args.script.display()))?;

    let executor = ScenarioExecutor::new(ScriptedSimulator::new(scenario), config.scenario.clone())
        .context("Invalid scenario settings")?;
    let factory = BuiltinExplorers::new(space.dimension(), config.explorers.clone());
    let classifier: Arc<dyn ScoreClassifier> = Arc::new(config.campaign.target);
    let mut controller = ExplorationController::new(
        executor,
        factory,
        space,
        Arc::clone(&classifier),
        config.campaign.clone(),
    );

    let progress = (!json_mode).then(|| CampaignProgress::new(config.campaign.total_tests));
    let bar = progress.as_ref().map(CampaignProgress::bar);
    if let Some(progress) = progress {
        controller = controller.with_observer(Box::new(progress));
    }

    let result = controller.run().await;
    let n_tests = controller.n_tests();
    let envelopes = controller.into_envelopes();

    if let Some(bar) = bar {
        match &result {
            Ok(()) => bar.finish_success(format!("{n_tests} tests")),
            Err(err) => bar.finish_error(err.to_string()),
        }
    }

    // Whatever was sampled before a failure is still written out
    let tables = HistoryAggregator::new(classifier).flatten(&envelopes)?;
    let name = TableName::for_campaign(
        config.campaign.mode,
        config.campaign.target,
        config.scenario.dut_type,
        config.scenario.route,
    );
    let files = JsonlTableSink::new(&config.output.dir)
        .write(&name, &tables)
        .await
        .context("Failed to write campaign tables")?;

    if let Err(err) = result {
        error!(error = %err, rows = tables.len(), "Campaign aborted");
        return Err(err).context("Campaign aborted; partial tables were written");
    }
    info!(name = %name, n_tests, "Campaign tables written");

    let output_data = RunOutput {
        name: name.to_string(),
        target: config.campaign.target,
        mode: config.campaign.mode,
        n_tests,
        total: config.campaign.total_tests,
        envelopes: tables.n_envelopes(),
        rows: tables.len(),
        targets: tables.n_targets(),
        target_rate: tables.target_rate(),
        files,
    };
    output(&output_data, json_mode);
    Ok(())
}
