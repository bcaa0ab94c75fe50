//! Common test utilities for integration tests
//!
//! Provides shared fixtures used across multiple integration test files:
//! parameter spaces, a closed-form scenario runner and scripted DUT tracks.

#![allow(dead_code)]

use async_trait::async_trait;

use dino::adapters::simulators::{ScriptedFrame, ScriptedScenario, ScriptedVehicle};
use dino::domain::models::config::CampaignConfig;
use dino::domain::models::parameter_space::{Feature, ParameterSpace, ParameterVector};
use dino::domain::models::score::ScoreVector;
use dino::domain::models::target::{CampaignMode, Target};
use dino::domain::DomainResult;
use dino::domain::ports::ScenarioRunner;

/// Setup test logging
///
/// Initializes a tracing subscriber writing to the test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Two continuous features `x`, `y` over `[0, 10]`.
pub fn plane() -> ParameterSpace {
    ParameterSpace::new(vec![
        Feature::new("x", 0.0, 10.0, None),
        Feature::new("y", 0.0, 10.0, None),
    ])
    .expect("valid space")
}

/// A parameter vector with every feature pinned to the given value.
pub fn fixed_params(features: &[(&str, f64)]) -> ParameterVector {
    let space = ParameterSpace::new(
        features
            .iter()
            .map(|(name, value)| Feature::new(*name, *value, *value, None))
            .collect(),
    )
    .expect("valid space");
    space
        .project(&vec![0.0; features.len()])
        .expect("unit origin projects")
}

pub fn campaign(total_tests: usize, boundary_samples: usize, seed: u64) -> CampaignConfig {
    CampaignConfig {
        total_tests,
        boundary_samples,
        seed,
        target: Target::SideMove,
        mode: CampaignMode::Envelope,
    }
}

/// Runner whose DUT side-moves inside the disc of radius `radius`
/// around `(5, 5)`.
pub struct DiscRunner {
    pub radius: f64,
    pub runs: usize,
}

impl DiscRunner {
    pub fn new(radius: f64) -> Self {
        Self { radius, runs: 0 }
    }
}

#[async_trait]
impl ScenarioRunner for DiscRunner {
    async fn run(&mut self, params: &ParameterVector) -> DomainResult<ScoreVector> {
        self.runs += 1;
        let dx = params.require("x")? - 5.0;
        let dy = params.require("y")? - 5.0;
        let mut score = ScoreVector::default();
        score.time_at_end = 10.0;
        if dx.hypot(dy) < self.radius {
            score.side_move = 2.5;
        }
        Ok(score)
    }
}

/// DUT frame on `lane` at `position` driving at `speed`.
pub fn dut(lane: &str, position: f64, speed: f64) -> ScriptedVehicle {
    ScriptedVehicle::new("dut", "AggrCar", lane, position, speed)
}

pub fn frame(vehicles: Vec<ScriptedVehicle>) -> ScriptedFrame {
    ScriptedFrame {
        vehicles,
        ..ScriptedFrame::default()
    }
}

/// Script starting after placement with the given tick length.
pub fn script(step_length: f64, frames: Vec<ScriptedFrame>) -> ScriptedScenario {
    ScriptedScenario {
        step_length,
        frames,
        ..ScriptedScenario::default()
    }
}
