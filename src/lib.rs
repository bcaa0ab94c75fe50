//! Dino - performance-envelope exploration for an intersection DUT
//!
//! Dino searches the parameter space of an intersection scenario for the
//! region where a device under test (DUT) shows a target behavior, such as a
//! side move around a queue, a red-light violation or a collision. A campaign
//! spends a fixed test budget locating an envelope, refining a point onto its
//! surface and following its boundary, then flattens every sample into
//! row-aligned parameter and score tables.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, port traits and errors
//! - **Service Layer** (`services`): exploration controller, scenario
//!   executor, per-tick metrics and the history aggregator
//! - **Adapters** (`adapters`): built-in explorers, the scripted simulator
//!   and JSON Lines table sinks
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dino::{BuiltinExplorers, ExplorationController, ScenarioExecutor};
//!
//! let executor = ScenarioExecutor::new(simulator, config.scenario.clone())?;
//! let factory = BuiltinExplorers::new(space.dimension(), config.explorers.clone());
//! let mut controller = ExplorationController::new(
//!     executor, factory, space, Arc::new(config.campaign.target), config.campaign.clone(),
//! );
//! controller.run().await?;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::explorers::BuiltinExplorers;
pub use adapters::simulators::{ScriptedScenario, ScriptedSimulator};
pub use adapters::tables::JsonlTableSink;
pub use domain::models::{
    CampaignConfig, CampaignMode, Config, Envelope, Feature, FlatTables, ParameterSpace,
    ParameterVector, ScenarioConfig, ScoreVector, Stage, Target,
};
pub use domain::ports::{ExplorerFactory, ScenarioRunner, ScoreClassifier, Simulator, StageExplorer};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ExplorationController, HistoryAggregator, ScenarioExecutor};
