//! Service layer: campaign control, scenario execution and aggregation.

pub mod exploration_controller;
pub mod history_aggregator;
pub mod scenario_executor;
pub mod scenario_metrics;
pub mod side_move;

pub use exploration_controller::{CampaignObserver, ExplorationController, StepProgress};
pub use history_aggregator::HistoryAggregator;
pub use scenario_executor::{ScenarioExecutor, ScenarioState};
pub use side_move::SideMoveBehavior;
