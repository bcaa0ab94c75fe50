//! Envelopes and their per-stage sample histories.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::parameter_space::ParameterVector;
use super::score::ScoreVector;
use crate::domain::ports::StageExplorer;

/// Stage of the exploration pipeline a sample was drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Quasi-random search for a first target sample
    #[serde(rename = "seq")]
    Locate,
    /// Refinement from that sample onto the envelope surface
    #[serde(rename = "fs")]
    Surface,
    /// Walk along the boundary from the surface point
    #[serde(rename = "brrt")]
    Boundary,
    /// Plain random sampling, no envelope structure
    #[serde(rename = "mc")]
    MonteCarlo,
}

impl Stage {
    /// Short tag used in file names and table rows.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Locate => "seq",
            Self::Surface => "fs",
            Self::Boundary => "brrt",
            Self::MonteCarlo => "mc",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Ordered kept samples of one stage.
///
/// Unit-cube points, parameter vectors and score vectors are stored as
/// parallel columns; [`is_consistent`](Self::is_consistent) reports whether
/// they are still row-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageHistory {
    points: Vec<Vec<f64>>,
    params: Vec<ParameterVector>,
    scores: Vec<ScoreVector>,
}

impl StageHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a history from columns produced elsewhere. No alignment check
    /// is made here; the aggregator rejects misaligned histories.
    pub fn from_columns(
        points: Vec<Vec<f64>>,
        params: Vec<ParameterVector>,
        scores: Vec<ScoreVector>,
    ) -> Self {
        Self {
            points,
            params,
            scores,
        }
    }

    /// Append one kept sample.
    pub fn push(&mut self, point: Vec<f64>, params: ParameterVector, score: ScoreVector) {
        self.points.push(point);
        self.params.push(params);
        self.scores.push(score);
    }

    /// Number of kept samples.
    pub fn kept(&self) -> usize {
        self.params.len()
    }

    /// Whether nothing was kept yet.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Unit-cube points, in keep order.
    pub fn points(&self) -> &[Vec<f64>] {
        &self.points
    }

    /// Projected parameter vectors, in keep order.
    pub fn params(&self) -> &[ParameterVector] {
        &self.params
    }

    /// Score vectors, in keep order.
    pub fn scores(&self) -> &[ScoreVector] {
        &self.scores
    }

    /// Most recently kept point.
    pub fn last_point(&self) -> Option<&[f64]> {
        self.points.last().map(Vec::as_slice)
    }

    /// Whether all three columns have the same length.
    pub fn is_consistent(&self) -> bool {
        self.params.len() == self.scores.len() && self.points.len() == self.params.len()
    }
}

/// One stage's explorer plus the controller's step accounting for it.
pub struct StageRun {
    /// Pipeline stage this run belongs to
    pub stage: Stage,
    /// Explorer owning the stage's history
    pub explorer: Box<dyn StageExplorer>,
    /// Explorer steps taken, kept or skipped
    pub steps: usize,
    /// The stage stopped because the global budget ran out
    pub truncated: bool,
}

impl StageRun {
    /// A fresh, untruncated stage run.
    pub fn new(stage: Stage, explorer: Box<dyn StageExplorer>) -> Self {
        Self {
            stage,
            explorer,
            steps: 0,
            truncated: false,
        }
    }

    /// Samples kept by the explorer.
    pub fn history(&self) -> &StageHistory {
        self.explorer.history()
    }

    /// Number of kept samples.
    pub fn kept(&self) -> usize {
        self.history().kept()
    }

    /// Steps that spent budget without keeping a sample.
    pub fn skipped(&self) -> usize {
        self.steps.saturating_sub(self.kept())
    }
}

impl fmt::Debug for StageRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageRun")
            .field("stage", &self.stage)
            .field("steps", &self.steps)
            .field("kept", &self.kept())
            .field("truncated", &self.truncated)
            .finish()
    }
}

/// One run of the locate / surface / boundary pipeline.
#[derive(Debug)]
pub struct Envelope {
    /// Position in campaign order, starting at 0
    pub id: usize,
    stages: Vec<StageRun>,
}

impl Envelope {
    /// Envelope with no stages yet.
    pub fn new(id: usize) -> Self {
        Self {
            id,
            stages: Vec::with_capacity(3),
        }
    }

    /// Append the next stage of the pipeline.
    pub fn push_stage(&mut self, run: StageRun) {
        self.stages.push(run);
    }

    /// Stages run so far, in pipeline order.
    pub fn stages(&self) -> &[StageRun] {
        &self.stages
    }

    /// The run of `stage`, if it was reached.
    pub fn stage(&self, stage: Stage) -> Option<&StageRun> {
        self.stages.iter().find(|run| run.stage == stage)
    }

    /// Kept samples across all stages.
    pub fn kept(&self) -> usize {
        self.stages.iter().map(StageRun::kept).sum()
    }

    /// Whether the budget cut this envelope short.
    pub fn is_truncated(&self) -> bool {
        self.stages.iter().any(|run| run.truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::parameter_space::{Feature, ParameterSpace};

    #[test]
    fn test_stage_tags() {
        assert_eq!(Stage::Locate.to_string(), "seq");
        assert_eq!(Stage::Surface.to_string(), "fs");
        assert_eq!(Stage::Boundary.to_string(), "brrt");
        assert_eq!(serde_json::to_string(&Stage::MonteCarlo).unwrap(), "\"mc\"");
    }

    #[test]
    fn test_history_columns_stay_aligned() {
        let space = ParameterSpace::new(vec![Feature::new("x", 0.0, 10.0, None)]).unwrap();
        let mut history = StageHistory::new();
        assert!(history.is_empty());
        assert!(history.last_point().is_none());

        history.push(vec![0.2], space.project(&[0.2]).unwrap(), ScoreVector::default());
        history.push(vec![0.7], space.project(&[0.7]).unwrap(), ScoreVector::default());

        assert_eq!(history.kept(), 2);
        assert!(history.is_consistent());
        assert_eq!(history.last_point(), Some(&[0.7][..]));

        let broken = StageHistory::from_columns(
            vec![vec![0.2]],
            vec![space.project(&[0.2]).unwrap()],
            vec![],
        );
        assert!(!broken.is_consistent());
    }
}
