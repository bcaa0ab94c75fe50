//! Sequence locator: Halton or uniform random samples over the unit cube.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::domain::models::envelope::{Stage, StageHistory};
use crate::domain::models::parameter_space::ParameterVector;
use crate::domain::models::score::ScoreVector;
use crate::domain::ports::StageExplorer;

/// How the locator draws its points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceStrategy {
    /// Low-discrepancy Halton sequence
    Halton,
    /// Uniform samples from a seeded generator
    MonteCarlo,
}

/// First `n` primes, the Halton bases.
fn primes(n: usize) -> Vec<u64> {
    let mut primes: Vec<u64> = Vec::with_capacity(n);
    let mut candidate = 2u64;
    while primes.len() < n {
        if primes
            .iter()
            .take_while(|&&p| p * p <= candidate)
            .all(|&p| candidate % p != 0)
        {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}

/// Van der Corput radical inverse of `index` in `base`.
fn radical_inverse(mut index: u64, base: u64) -> f64 {
    let inv_base = 1.0 / base as f64;
    let mut factor = inv_base;
    let mut value = 0.0;
    while index > 0 {
        value += (index % base) as f64 * factor;
        index /= base;
        factor *= inv_base;
    }
    value
}

enum Source {
    Halton {
        bases: Vec<u64>,
        shift: Vec<f64>,
        index: u64,
    },
    Random(ChaCha8Rng),
}

/// Locator explorer. Every proposed point is tested and kept.
///
/// A Halton locator completes on its first target sample. A Monte Carlo
/// locator never completes; the budget ends it.
pub struct SequenceExplorer {
    stage: Stage,
    dimension: usize,
    source: Source,
    stop_on_target: bool,
    complete: bool,
    history: StageHistory,
}

impl SequenceExplorer {
    /// `scramble` shifts every Halton coordinate by a seeded random offset
    /// (mod 1). `fast_forward` skips that many leading points.
    pub fn new(
        strategy: SequenceStrategy,
        dimension: usize,
        seed: u32,
        fast_forward: u32,
        scramble: bool,
    ) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(u64::from(seed));
        let (stage, source, stop_on_target) = match strategy {
            SequenceStrategy::Halton => {
                let shift = if scramble {
                    (0..dimension).map(|_| rng.gen::<f64>()).collect()
                } else {
                    vec![0.0; dimension]
                };
                let source = Source::Halton {
                    bases: primes(dimension),
                    shift,
                    // Index 0 is the origin in every base
                    index: 1 + u64::from(fast_forward),
                };
                (Stage::Locate, source, true)
            }
            SequenceStrategy::MonteCarlo => {
                for _ in 0..u64::from(fast_forward) * dimension as u64 {
                    rng.gen::<f64>();
                }
                (Stage::MonteCarlo, Source::Random(rng), false)
            }
        };

        Self {
            stage,
            dimension,
            source,
            stop_on_target,
            complete: false,
            history: StageHistory::new(),
        }
    }
}

impl StageExplorer for SequenceExplorer {
    fn stage(&self) -> Stage {
        self.stage
    }

    fn propose(&mut self) -> Option<Vec<f64>> {
        if self.complete {
            return None;
        }
        let point = match &mut self.source {
            Source::Halton {
                bases,
                shift,
                index,
            } => {
                let point = bases
                    .iter()
                    .zip(shift.iter())
                    .map(|(&base, &offset)| (radical_inverse(*index, base) + offset).fract())
                    .collect();
                *index += 1;
                point
            }
            Source::Random(rng) => (0..self.dimension).map(|_| rng.gen::<f64>()).collect(),
        };
        Some(point)
    }

    fn observe(
        &mut self,
        point: Vec<f64>,
        params: ParameterVector,
        score: ScoreVector,
        is_target: bool,
    ) -> bool {
        self.history.push(point, params, score);
        if self.stop_on_target && is_target {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::parameter_space::{Feature, ParameterSpace};

    #[test]
    fn test_primes_and_radical_inverse() {
        assert_eq!(primes(6), vec![2, 3, 5, 7, 11, 13]);
        assert_eq!(radical_inverse(1, 2), 0.5);
        assert_eq!(radical_inverse(3, 2), 0.75);
        assert!((radical_inverse(5, 3) - 7.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_unscrambled_halton_sequence() {
        let mut explorer = SequenceExplorer::new(SequenceStrategy::Halton, 2, 7, 0, false);
        assert_eq!(explorer.propose(), Some(vec![0.5, 1.0 / 3.0]));
        assert_eq!(explorer.propose(), Some(vec![0.25, 2.0 / 3.0]));
    }

    #[test]
    fn test_fast_forward_skips_points() {
        let mut plain = SequenceExplorer::new(SequenceStrategy::Halton, 3, 7, 0, false);
        let mut skipped = SequenceExplorer::new(SequenceStrategy::Halton, 3, 7, 2, false);
        plain.propose();
        plain.propose();
        assert_eq!(plain.propose(), skipped.propose());
    }

    #[test]
    fn test_scrambled_points_stay_in_unit_cube_and_are_seeded() {
        let mut a = SequenceExplorer::new(SequenceStrategy::Halton, 5, 42, 10, true);
        let mut b = SequenceExplorer::new(SequenceStrategy::Halton, 5, 42, 10, true);
        let mut c = SequenceExplorer::new(SequenceStrategy::Halton, 5, 43, 10, true);
        for _ in 0..50 {
            let p = a.propose().unwrap();
            assert!(p.iter().all(|u| (0.0..1.0).contains(u)));
            assert_eq!(Some(p.clone()), b.propose());
            assert_ne!(Some(p), c.propose());
        }
    }

    #[test]
    fn test_halton_completes_on_target_monte_carlo_does_not() {
        let space = ParameterSpace::new(vec![Feature::new("x", 0.0, 1.0, None)]).unwrap();

        let mut halton = SequenceExplorer::new(SequenceStrategy::Halton, 1, 1, 0, true);
        let point = halton.propose().unwrap();
        let params = space.project(&point).unwrap();
        assert!(halton.observe(point, params, ScoreVector::default(), true));
        assert!(halton.is_complete());
        assert_eq!(halton.propose(), None);

        let mut mc = SequenceExplorer::new(SequenceStrategy::MonteCarlo, 1, 1, 3, false);
        assert_eq!(mc.stage(), Stage::MonteCarlo);
        let point = mc.propose().unwrap();
        let params = space.project(&point).unwrap();
        mc.observe(point, params, ScoreVector::default(), true);
        assert!(!mc.is_complete());
        assert_eq!(mc.history().kept(), 1);
    }
}
