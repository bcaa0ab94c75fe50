mod common;

use std::sync::Arc;

use common::{campaign, plane, DiscRunner};
use dino::adapters::explorers::BuiltinExplorers;
use dino::domain::models::config::ExplorerConfig;
use dino::domain::models::parameter_space::{Feature, ParameterSpace};
use dino::domain::models::table::FlatTables;
use dino::domain::models::target::{CampaignMode, Target};
use dino::domain::ports::ScoreClassifier;
use dino::services::{ExplorationController, HistoryAggregator};
use proptest::prelude::*;

fn run_campaign(total: usize, boundary: usize, seed: u64, radius: f64, mode: CampaignMode) -> (usize, FlatTables) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let classifier: Arc<dyn ScoreClassifier> = Arc::new(Target::SideMove);
        let mut settings = campaign(total, boundary, seed);
        settings.mode = mode;
        let mut controller = ExplorationController::new(
            DiscRunner::new(radius),
            BuiltinExplorers::new(2, ExplorerConfig::default()),
            plane(),
            Arc::clone(&classifier),
            settings,
        );
        controller.run().await.expect("campaign runs");
        let tables = HistoryAggregator::new(classifier)
            .flatten(controller.envelopes())
            .expect("tables flatten");
        (controller.n_tests(), tables)
    })
}

proptest! {
    /// Property: projected values always land inside the feature range
    #[test]
    fn prop_projection_stays_in_bounds(
        min in -100.0f64..100.0,
        span in 0.0f64..50.0,
        increment in prop::option::of(0.1f64..10.0),
        unit in 0.0f64..=1.0,
    ) {
        let max = min + span;
        let space = ParameterSpace::new(vec![Feature::new("f", min, max, increment)]).unwrap();
        let params = space.project(&[unit]).unwrap();
        let value = params.get("f").unwrap();
        prop_assert!(value >= min && value <= max, "{value} outside [{min}, {max}]");
    }

    /// Property: unit points outside the cube are rejected
    #[test]
    fn prop_projection_rejects_points_outside_cube(unit in 1.0001f64..5.0) {
        let space = ParameterSpace::new(vec![Feature::new("f", 0.0, 1.0, None)]).unwrap();
        prop_assert!(space.project(&[unit]).is_err());
        prop_assert!(space.project(&[-unit]).is_err());
    }

    /// Property: the budget is never overspent and every test becomes one row
    #[test]
    fn prop_budget_is_respected(
        total in 1usize..80,
        boundary in 1usize..12,
        seed in any::<u64>(),
        radius in 0.5f64..6.0,
    ) {
        let (n_tests, tables) = run_campaign(total, boundary, seed, radius, CampaignMode::Envelope);
        prop_assert!(n_tests <= total);
        prop_assert_eq!(tables.len(), n_tests);
        prop_assert_eq!(tables.params.len(), tables.scores.len());
    }

    /// Property: Monte Carlo spends exactly the budget
    #[test]
    fn prop_monte_carlo_spends_exact_budget(total in 1usize..60, seed in any::<u64>()) {
        let (n_tests, tables) = run_campaign(total, 4, seed, 2.5, CampaignMode::MonteCarlo);
        prop_assert_eq!(n_tests, total);
        prop_assert_eq!(tables.len(), total);
    }

    /// Property: the same seed replays the same campaign
    #[test]
    fn prop_campaign_is_deterministic(total in 1usize..50, seed in any::<u64>()) {
        let (_, first) = run_campaign(total, 5, seed, 2.5, CampaignMode::Envelope);
        let (_, second) = run_campaign(total, 5, seed, 2.5, CampaignMode::Envelope);
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
