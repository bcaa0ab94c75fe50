//! Surface finder: from a target sample, search outwards along one random
//! direction for the edge of the envelope.
//!
//! The step doubles while samples stay on target. The first non-target sample
//! brackets the surface, which is then bisected down to the tolerance. If the
//! walk reaches a face of the unit cube while still on target, the face is
//! taken as the surface.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::TAU;

use crate::domain::models::envelope::{Stage, StageHistory};
use crate::domain::models::parameter_space::ParameterVector;
use crate::domain::models::score::ScoreVector;
use crate::domain::ports::StageExplorer;

/// Random unit vector, uniform on the sphere.
fn random_direction(rng: &mut ChaCha8Rng, dimension: usize) -> Vec<f64> {
    loop {
        // Box-Muller normals
        let v: Vec<f64> = (0..dimension)
            .map(|_| {
                let u1: f64 = 1.0 - rng.gen::<f64>();
                let u2: f64 = rng.gen();
                (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
            })
            .collect();
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 1e-12 {
            return v.into_iter().map(|x| x / norm).collect();
        }
    }
}

/// Largest `t` with `origin + t * direction` inside the unit cube.
fn max_travel(origin: &[f64], direction: &[f64]) -> f64 {
    origin
        .iter()
        .zip(direction)
        .filter_map(|(&o, &d)| {
            if d > 0.0 {
                Some((1.0 - o) / d)
            } else if d < 0.0 {
                Some(-o / d)
            } else {
                None
            }
        })
        .fold(f64::INFINITY, f64::min)
        .max(0.0)
}

/// Bracketing search for the envelope surface along one ray from a root.
pub struct SurfaceFinder {
    root: Vec<f64>,
    direction: Vec<f64>,
    limit: f64,
    step: f64,
    tolerance: f64,
    /// Farthest distance known to be on target
    inside: f64,
    /// Nearest distance known to be off target
    outside: Option<f64>,
    pending: Option<f64>,
    complete: bool,
    history: StageHistory,
}

impl SurfaceFinder {
    /// Finder walking along a direction drawn from `seed`.
    pub fn new(root: &[f64], seed: u32, initial_step: f64, tolerance: f64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(u64::from(seed));
        let direction = random_direction(&mut rng, root.len());
        Self::with_direction(root, direction, initial_step, tolerance)
    }

    /// Finder walking along a given unit `direction`.
    pub fn with_direction(root: &[f64], direction: Vec<f64>, initial_step: f64, tolerance: f64) -> Self {
        let limit = max_travel(root, &direction);
        Self {
            root: root.to_vec(),
            direction,
            limit,
            step: initial_step,
            tolerance,
            inside: 0.0,
            outside: None,
            pending: None,
            complete: limit <= 0.0,
            history: StageHistory::new(),
        }
    }

    fn at(&self, t: f64) -> Vec<f64> {
        self.root
            .iter()
            .zip(&self.direction)
            .map(|(&r, &d)| (r + t * d).clamp(0.0, 1.0))
            .collect()
    }

    fn bracket_closed(&self) -> bool {
        self.outside
            .is_some_and(|outside| outside - self.inside <= self.tolerance)
    }
}

impl StageExplorer for SurfaceFinder {
    fn stage(&self) -> Stage {
        Stage::Surface
    }

    fn propose(&mut self) -> Option<Vec<f64>> {
        if self.complete {
            return None;
        }
        let t = match self.outside {
            Some(outside) => (self.inside + outside) / 2.0,
            None => {
                if self.limit - self.inside <= self.tolerance {
                    // On target up to the cube face
                    self.complete = true;
                    return None;
                }
                (self.inside + self.step).min(self.limit)
            }
        };
        self.pending = Some(t);
        Some(self.at(t))
    }

    fn observe(
        &mut self,
        point: Vec<f64>,
        params: ParameterVector,
        score: ScoreVector,
        is_target: bool,
    ) -> bool {
        let Some(t) = self.pending.take() else {
            return false;
        };
        self.history.push(point, params, score);

        if is_target {
            self.inside = t;
            if self.outside.is_none() {
                self.step *= 2.0;
            }
        } else {
            self.outside = Some(t);
        }
        if self.bracket_closed() {
            self.complete = true;
        }
        true
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn history(&self) -> &StageHistory {
        &self.history
    }

    fn boundary_normal(&self) -> Option<&[f64]> {
        self.complete.then_some(self.direction.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::parameter_space::{Feature, ParameterSpace};

    /// Drive the finder against an envelope `x < edge`.
    fn run(finder: &mut SurfaceFinder, edge: f64) -> usize {
        let space = ParameterSpace::new(vec![Feature::new("x", 0.0, 1.0, None)]).unwrap();
        let mut steps = 0;
        while !finder.is_complete() && steps < 100 {
            steps += 1;
            let Some(point) = finder.propose() else {
                continue;
            };
            let params = space.project(&point).unwrap();
            let on_target = point[0] < edge;
            finder.observe(point, params, ScoreVector::default(), on_target);
        }
        steps
    }

    #[test]
    fn test_random_direction_is_unit() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let v = random_direction(&mut rng, 7);
        let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_brackets_and_bisects_to_tolerance() {
        let mut finder = SurfaceFinder::with_direction(&[0.2], vec![1.0], 0.02, 0.005);
        run(&mut finder, 0.5);

        assert!(finder.is_complete());
        let last = finder.history().last_point().unwrap()[0];
        assert!((last - 0.5).abs() <= 0.01, "last point {last}");
        assert_eq!(finder.boundary_normal(), Some(&[1.0][..]));
        // Expansion 0.22, 0.26, 0.34, 0.5 (off) then bisection
        assert!((finder.history().points()[2][0] - 0.34).abs() < 1e-12);
    }

    #[test]
    fn test_cube_face_ends_search() {
        let mut finder = SurfaceFinder::with_direction(&[0.9], vec![1.0], 0.05, 0.005);
        run(&mut finder, 2.0);

        assert!(finder.is_complete());
        let last = finder.history().last_point().unwrap()[0];
        assert!((last - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_root_on_face_completes_without_samples() {
        let finder = SurfaceFinder::with_direction(&[1.0], vec![1.0], 0.05, 0.005);
        assert!(finder.is_complete());
        assert!(finder.history().is_empty());
    }
}
