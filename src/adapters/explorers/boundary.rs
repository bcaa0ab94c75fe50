//! Boundary follower: walks along the envelope surface from a surface point.
//!
//! Each step moves along one tangent direction of the local frame. After
//! every sample the walk nudges itself back towards the boundary: outwards
//! along the normal after a target sample, inwards after a miss. Candidates
//! outside the unit cube are skipped.

use crate::domain::models::envelope::{Stage, StageHistory};
use crate::domain::models::parameter_space::ParameterVector;
use crate::domain::models::score::ScoreVector;
use crate::domain::ports::StageExplorer;

/// Fixed-step walk along the tangent space of a surface point.
pub struct BoundaryFollower {
    /// Row 0 is the outward normal, the rest span the tangent space
    frame: Vec<Vec<f64>>,
    current: Vec<f64>,
    step: f64,
    adherence: f64,
    moves: usize,
    history: StageHistory,
}

impl BoundaryFollower {
    /// Walker starting at `root` that moves `step` along a tangent and
    /// `adherence` along the normal per sample.
    pub fn new(root: &[f64], frame: Vec<Vec<f64>>, step: f64, adherence: f64) -> Self {
        Self {
            frame,
            current: root.to_vec(),
            step,
            adherence,
            moves: 0,
            history: StageHistory::new(),
        }
    }

    /// Direction and length of the next move.
    fn next_move(&mut self) -> (usize, f64) {
        let tangents = self.frame.len().saturating_sub(1);
        let k = self.moves;
        self.moves += 1;
        if tangents == 0 {
            // One-dimensional space: alternate sides of the boundary
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            return (0, sign * self.adherence);
        }
        // Sweep every tangent forwards, then every tangent backwards
        let sign = if (k / tangents) % 2 == 0 { 1.0 } else { -1.0 };
        (1 + k % tangents, sign * self.step)
    }
}

impl StageExplorer for BoundaryFollower {
    fn stage(&self) -> Stage {
        Stage::Boundary
    }

    fn propose(&mut self) -> Option<Vec<f64>> {
        let (row, length) = self.next_move();
        let direction = self.frame.get(row)?;
        let candidate: Vec<f64> = self
            .current
            .iter()
            .zip(direction)
            .map(|(c, d)| c + length * d)
            .collect();
        candidate
            .iter()
            .all(|u| (0.0..=1.0).contains(u))
            .then_some(candidate)
    }

    fn observe(
        &mut self,
        point: Vec<f64>,
        params: ParameterVector,
        score: ScoreVector,
        is_target: bool,
    ) -> bool {
        let correction = if is_target {
            self.adherence
        } else {
            -self.adherence
        };
        if let Some(normal) = self.frame.first() {
            self.current = point
                .iter()
                .zip(normal)
                .map(|(p, n)| (p + correction * n).clamp(0.0, 1.0))
                .collect();
        }
        self.history.push(point, params, score);
        true
    }

    fn is_complete(&self) -> bool {
        false
    }

    fn history(&self) -> &StageHistory {
        &self.history
    }
}
