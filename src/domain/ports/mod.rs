//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces the core consumes:
//! - Simulator: tick/query/command access to the traffic simulator
//! - StageExplorer / ExplorerFactory: the three sampling stages
//! - ScoreClassifier: target membership of a score vector
//! - ScenarioRunner: one parameter vector in, one score vector out
//! - TableSink: persistence of flattened tables

pub mod classifier;
pub mod explorer;
pub mod scenario_runner;
pub mod simulator;
pub mod table_sink;

pub use classifier::{FnClassifier, ScoreClassifier};
pub use explorer::{ExplorerFactory, StageExplorer};
pub use scenario_runner::ScenarioRunner;
pub use simulator::{CollisionReport, Simulator, SpawnRequest, VehicleState};
pub use table_sink::TableSink;
