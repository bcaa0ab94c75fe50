//! Flattens envelope stage histories into row-aligned tables.

use std::sync::Arc;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::envelope::Envelope;
use crate::domain::models::table::{FlatTables, ParamRow, ScoreRow};
use crate::domain::ports::ScoreClassifier;

/// Turns stage histories into parameter and score tables.
pub struct HistoryAggregator {
    classifier: Arc<dyn ScoreClassifier>,
}

impl HistoryAggregator {
    /// Aggregator labelling rows with `classifier`.
    pub fn new(classifier: Arc<dyn ScoreClassifier>) -> Self {
        Self { classifier }
    }

    /// One parameter row and one score row per kept sample, in envelope and
    /// stage order. Envelopes cut short by the budget contribute whatever
    /// stages they ran. A stage whose columns disagree in length is an error.
    pub fn flatten(&self, envelopes: &[Envelope]) -> DomainResult<FlatTables> {
        let mut tables = FlatTables::default();

        for envelope in envelopes {
            for run in envelope.stages() {
                let history = run.history();
                if !history.is_consistent() {
                    return Err(DomainError::DataConsistency(format!(
                        "Envelope {} stage {} has {} points, {} parameter rows and {} score rows",
                        envelope.id,
                        run.stage,
                        history.points().len(),
                        history.params().len(),
                        history.scores().len()
                    )));
                }

                for (params, score) in history.params().iter().zip(history.scores()) {
                    tables.params.push(ParamRow {
                        envelope_id: envelope.id,
                        stage: run.stage,
                        params: params.clone(),
                    });
                    tables.scores.push(ScoreRow {
                        envelope_id: envelope.id,
                        stage: run.stage,
                        score: score.clone(),
                        is_target: self.classifier.classify(score),
                    });
                }
            }
        }

        debug!(
            rows = tables.len(),
            envelopes = envelopes.len(),
            targets = tables.n_targets(),
            "Flattened campaign history"
        );
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::envelope::{Stage, StageHistory, StageRun};
    use crate::domain::models::parameter_space::{Feature, ParameterSpace, ParameterVector};
    use crate::domain::models::score::ScoreVector;
    use crate::domain::models::target::Target;
    use crate::domain::ports::StageExplorer;

    struct Recorded {
        stage: Stage,
        history: StageHistory,
    }

    impl StageExplorer for Recorded {
        fn stage(&self) -> Stage {
            self.stage
        }

        fn propose(&mut self) -> Option<Vec<f64>> {
            None
        }

        fn observe(&mut self, _: Vec<f64>, _: ParameterVector, _: ScoreVector, _: bool) -> bool {
            false
        }

        fn is_complete(&self) -> bool {
            true
        }

        fn history(&self) -> &StageHistory {
            &self.history
        }
    }

    fn history(space: &ParameterSpace, points: &[f64], side_moves: &[bool]) -> StageHistory {
        let mut history = StageHistory::new();
        for (&u, &moved) in points.iter().zip(side_moves) {
            let mut score = ScoreVector::default();
            if moved {
                score.side_move = 2.0;
            }
            history.push(vec![u], space.project(&[u]).unwrap(), score);
        }
        history
    }

    fn envelope(id: usize, stages: Vec<(Stage, StageHistory)>) -> Envelope {
        let mut envelope = Envelope::new(id);
        for (stage, history) in stages {
            envelope.push_stage(StageRun::new(stage, Box::new(Recorded { stage, history })));
        }
        envelope
    }

    #[test]
    fn test_partial_envelope_contributes_only_its_stages() {
        let space = ParameterSpace::new(vec![Feature::new("x", 0.0, 10.0, None)]).unwrap();
        let envelopes = vec![
            envelope(
                0,
                vec![
                    (Stage::Locate, history(&space, &[0.1, 0.8], &[false, true])),
                    (Stage::Surface, history(&space, &[0.6], &[false])),
                    (Stage::Boundary, history(&space, &[0.65, 0.7], &[true, false])),
                ],
            ),
            envelope(1, vec![(Stage::Locate, history(&space, &[0.2, 0.3, 0.4], &[false; 3]))]),
        ];

        let aggregator = HistoryAggregator::new(Arc::new(Target::SideMove));
        let tables = aggregator.flatten(&envelopes).unwrap();

        assert_eq!(tables.params.len(), 8);
        assert_eq!(tables.scores.len(), 8);
        let tail: Vec<_> = tables.scores[5..]
            .iter()
            .map(|row| (row.envelope_id, row.stage))
            .collect();
        assert_eq!(tail, vec![(1, Stage::Locate); 3]);
        assert!(tables.params.iter().all(|row| row.envelope_id != 1 || row.stage == Stage::Locate));
        assert_eq!(tables.n_targets(), 2);
        assert!(tables.scores[1].is_target);
        assert_eq!(tables.params[3].stage, Stage::Boundary);
        assert_eq!(tables.params[3].params.get("x"), Some(6.5));
    }

    #[test]
    fn test_misaligned_history_is_rejected() {
        let space = ParameterSpace::new(vec![Feature::new("x", 0.0, 10.0, None)]).unwrap();
        let broken = StageHistory::from_columns(
            vec![vec![0.1], vec![0.2]],
            vec![space.project(&[0.1]).unwrap(), space.project(&[0.2]).unwrap()],
            vec![ScoreVector::default()],
        );
        let envelopes = vec![envelope(0, vec![(Stage::Locate, broken)])];

        let err = HistoryAggregator::new(Arc::new(Target::SideMove))
            .flatten(&envelopes)
            .unwrap_err();
        assert!(matches!(err, DomainError::DataConsistency(_)));
    }

    #[test]
    fn test_empty_campaign_gives_empty_tables() {
        let tables = HistoryAggregator::new(Arc::new(Target::Collision))
            .flatten(&[])
            .unwrap();
        assert!(tables.is_empty());
    }
}
