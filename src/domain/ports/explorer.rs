//! Stage explorer port.

use crate::domain::models::envelope::{Stage, StageHistory};
use crate::domain::models::parameter_space::ParameterVector;
use crate::domain::models::score::ScoreVector;

/// One stage of the exploration pipeline.
///
/// Explorers work in the unit cube. The controller asks for a point with
/// [`propose`](Self::propose), runs the scenario for it and reports the
/// outcome with [`observe`](Self::observe). The explorer owns its kept-sample
/// history.
pub trait StageExplorer: Send {
    /// Pipeline stage this explorer implements
    fn stage(&self) -> Stage;

    /// Next point to test, or `None` when this step is skipped without a test
    /// (for example a candidate outside the unit cube).
    fn propose(&mut self) -> Option<Vec<f64>>;

    /// Feed back the result for the last proposed point. Returns whether the
    /// sample was kept in the history.
    fn observe(
        &mut self,
        point: Vec<f64>,
        params: ParameterVector,
        score: ScoreVector,
        is_target: bool,
    ) -> bool;

    /// Whether the stage reached its own stop condition
    fn is_complete(&self) -> bool;

    /// Samples kept so far
    fn history(&self) -> &StageHistory;

    /// Direction from inside the envelope towards its outside, known once a
    /// surface finder has completed.
    fn boundary_normal(&self) -> Option<&[f64]> {
        None
    }
}

/// Builds the explorers of one envelope.
pub trait ExplorerFactory: Send {
    /// Quasi-random locator, scrambled by `seed` and skipping `fast_forward`
    /// sequence elements.
    fn locator(&self, seed: u32, fast_forward: u32) -> Box<dyn StageExplorer>;

    /// Uniform random sampler that never completes on its own.
    fn monte_carlo(&self, seed: u32, fast_forward: u32) -> Box<dyn StageExplorer>;

    /// Surface finder rooted at a target sample.
    fn surface_finder(&self, root: &[f64], seed: u32) -> Box<dyn StageExplorer>;

    /// Boundary follower rooted at a surface point, with an orthonormal frame
    /// whose first row is the boundary normal.
    fn boundary_follower(&self, root: &[f64], frame: Vec<Vec<f64>>) -> Box<dyn StageExplorer>;
}
