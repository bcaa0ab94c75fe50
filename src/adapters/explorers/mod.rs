//! Built-in stage explorers.

pub mod boundary;
pub mod sequence;
pub mod surface;

pub use boundary::BoundaryFollower;
pub use sequence::{SequenceExplorer, SequenceStrategy};
pub use surface::SurfaceFinder;

use crate::domain::models::config::ExplorerConfig;
use crate::domain::ports::{ExplorerFactory, StageExplorer};

/// Factory for the built-in explorers over a space of `dimension` features.
#[derive(Debug, Clone)]
pub struct BuiltinExplorers {
    dimension: usize,
    config: ExplorerConfig,
}

impl BuiltinExplorers {
    /// Factory for a space of `dimension` features.
    pub fn new(dimension: usize, config: ExplorerConfig) -> Self {
        Self { dimension, config }
    }
}

impl ExplorerFactory for BuiltinExplorers {
    fn locator(&self, seed: u32, fast_forward: u32) -> Box<dyn StageExplorer> {
        Box::new(SequenceExplorer::new(
            SequenceStrategy::Halton,
            self.dimension,
            seed,
            fast_forward,
            self.config.scramble,
        ))
    }

    fn monte_carlo(&self, seed: u32, fast_forward: u32) -> Box<dyn StageExplorer> {
        Box::new(SequenceExplorer::new(
            SequenceStrategy::MonteCarlo,
            self.dimension,
            seed,
            fast_forward,
            false,
        ))
    }

    fn surface_finder(&self, root: &[f64], seed: u32) -> Box<dyn StageExplorer> {
        Box::new(SurfaceFinder::new(
            root,
            seed,
            self.config.surface_initial_step,
            self.config.surface_tolerance,
        ))
    }

    fn boundary_follower(&self, root: &[f64], frame: Vec<Vec<f64>>) -> Box<dyn StageExplorer> {
        Box::new(BoundaryFollower::new(
            root,
            frame,
            self.config.boundary_step,
            self.config.boundary_adherence,
        ))
    }
}
