//! Full campaigns: controller, built-in explorers, aggregator and table sink.

mod common;

use std::sync::Arc;

use common::{campaign, dut, frame, plane, script, DiscRunner};
use tempfile::TempDir;

use dino::adapters::explorers::BuiltinExplorers;
use dino::adapters::simulators::ScriptedSimulator;
use dino::adapters::tables::{read_scores, JsonlTableSink};
use dino::domain::models::config::{ExplorerConfig, ScenarioConfig};
use dino::domain::models::envelope::Stage;
use dino::domain::models::parameter_space::{Feature, ParameterSpace};
use dino::domain::models::table::{FlatTables, TableName};
use dino::domain::models::target::{CampaignMode, Target};
use dino::domain::ports::{ScoreClassifier, TableSink};
use dino::services::{ExplorationController, HistoryAggregator, ScenarioExecutor};

fn stage_rank(stage: Stage) -> u8 {
    match stage {
        Stage::Locate => 0,
        Stage::Surface => 1,
        Stage::Boundary => 2,
        Stage::MonteCarlo => 3,
    }
}

async fn disc_campaign(
    total: usize,
    mode: CampaignMode,
    seed: u64,
) -> (ExplorationController<DiscRunner, BuiltinExplorers>, FlatTables) {
    let classifier: Arc<dyn ScoreClassifier> = Arc::new(Target::SideMove);
    let mut settings = campaign(total, 6, seed);
    settings.mode = mode;
    let mut controller = ExplorationController::new(
        DiscRunner::new(2.5),
        BuiltinExplorers::new(2, ExplorerConfig::default()),
        plane(),
        Arc::clone(&classifier),
        settings,
    );
    controller.run().await.unwrap();
    let tables = HistoryAggregator::new(classifier)
        .flatten(controller.envelopes())
        .unwrap();
    (controller, tables)
}

#[tokio::test]
async fn test_envelope_campaign_spends_budget_in_stage_order() {
    let (controller, tables) = disc_campaign(60, CampaignMode::Envelope, 7).await;

    assert!(controller.n_tests() <= 60);
    assert_eq!(tables.len(), controller.n_tests());
    assert_eq!(controller.runner().runs, tables.len());
    assert_eq!(tables.params.len(), tables.scores.len());

    // Rows come envelope by envelope, stages in pipeline order
    for pair in tables.scores.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.envelope_id <= b.envelope_id);
        if a.envelope_id == b.envelope_id {
            assert!(stage_rank(a.stage) <= stage_rank(b.stage));
        }
    }
    assert!(tables.scores.iter().all(|row| row.stage != Stage::MonteCarlo));

    // Every locate stage that finished did so on its first target
    for envelope in controller.envelopes() {
        let locate = envelope.stage(Stage::Locate).unwrap();
        if !locate.truncated {
            let scores = locate.history().scores();
            assert!(scores.last().unwrap().side_moved());
            assert!(scores[..scores.len() - 1].iter().all(|s| !s.side_moved()));
        }
    }

    // The disc covers a fifth of the plane, so surface and boundary rows
    // straddle it
    assert!(tables.n_targets() > 0);
    assert!(tables.n_targets() < tables.len());
}

#[tokio::test]
async fn test_monte_carlo_campaign_spends_exact_budget() {
    let (controller, tables) = disc_campaign(40, CampaignMode::MonteCarlo, 3).await;

    assert_eq!(controller.n_tests(), 40);
    assert_eq!(tables.len(), 40);
    assert_eq!(tables.n_envelopes(), 1);
    assert!(tables.scores.iter().all(|row| row.stage == Stage::MonteCarlo));
    for row in &tables.params {
        let x = row.params.get("x").unwrap();
        let y = row.params.get("y").unwrap();
        assert!((0.0..=10.0).contains(&x));
        assert!((0.0..=10.0).contains(&y));
    }
}

#[tokio::test]
async fn test_campaign_tables_round_trip_through_sink() {
    let (_, tables) = disc_campaign(30, CampaignMode::Envelope, 11).await;
    let dir = TempDir::new().unwrap();
    let name = TableName::for_campaign(
        CampaignMode::Envelope,
        Target::SideMove,
        ScenarioConfig::default().dut_type,
        ScenarioConfig::default().route,
    );

    let files = JsonlTableSink::new(dir.path()).write(&name, &tables).await.unwrap();
    assert_eq!(files.len(), 3);
    assert!(files[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("side_move_gamma_cross_a_eb_left"));

    let rows = read_scores(&files[1]).await.unwrap();
    assert_eq!(rows.len(), tables.len());
    for (read, written) in rows.iter().zip(&tables.scores) {
        assert_eq!(read.envelope_id, written.envelope_id);
        assert_eq!(read.stage, written.stage);
        assert_eq!(read.is_target, written.is_target);
    }
}

#[tokio::test]
async fn test_scripted_campaign_resets_once_per_test() {
    let frames = vec![
        frame(vec![dut("1si_1", 140.0, 8.0)]),
        frame(vec![dut(":0_11_0", 1.0, 8.0)]),
        frame(vec![dut("3o_2", 30.0, 8.0)]),
    ];
    let executor = ScenarioExecutor::new(
        ScriptedSimulator::new(script(0.5, frames)),
        ScenarioConfig::default(),
    )
    .unwrap();
    let space = ParameterSpace::new(vec![
        Feature::new("time0", 0.0, 10.0, Some(0.5)),
        Feature::new("dut_s0", 20.0, 60.0, Some(5.0)),
    ])
    .unwrap();
    let classifier: Arc<dyn ScoreClassifier> = Arc::new(Target::Collision);
    let mut settings = campaign(12, 4, 5);
    settings.target = Target::Collision;
    let mut controller = ExplorationController::new(
        executor,
        BuiltinExplorers::new(space.dimension(), ExplorerConfig::default()),
        space,
        Arc::clone(&classifier),
        settings,
    );

    controller.run().await.unwrap();

    // No collision ever happens, so the whole budget goes to locating
    assert_eq!(controller.n_tests(), 12);
    assert_eq!(controller.envelopes().len(), 1);
    assert_eq!(controller.runner().simulator().resets(), 12);

    let tables = HistoryAggregator::new(classifier)
        .flatten(controller.envelopes())
        .unwrap();
    assert_eq!(tables.n_targets(), 0);
    assert!(tables
        .scores
        .iter()
        .all(|row| row.score.time_on_enter == Some(1.0) && !row.score.run_red_light));
}
