//! Exploration campaign controller.
//!
//! Owns the global test budget and the campaign random source, and drives
//! envelopes through the locate, surface and boundary stages. Every stage
//! run is kept on its envelope, partial or not, so the aggregator can
//! flatten the whole campaign afterwards.
//!
//! Budget accounting is count-then-check: the counter is updated after each
//! step and the stage returns as soon as it reaches the budget, so the sample
//! that spends the last test is always recorded.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::config::CampaignConfig;
use crate::domain::models::envelope::{Envelope, Stage, StageRun};
use crate::domain::models::geometry::orthonormal_frame;
use crate::domain::models::parameter_space::ParameterSpace;
use crate::domain::models::target::CampaignMode;
use crate::domain::ports::{ExplorerFactory, ScenarioRunner, ScoreClassifier, StageExplorer};

/// Fast-forward offsets handed to locators are drawn modulo this.
const FAST_FORWARD_RANGE: u32 = 10_000;

/// Progress after one explorer step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepProgress {
    /// Envelope the step belongs to
    pub envelope_id: usize,
    /// Stage the step belongs to
    pub stage: Stage,
    /// Tests charged so far
    pub n_tests: usize,
    /// Campaign budget
    pub total: usize,
    /// Samples the stage kept
    pub kept: usize,
    /// Steps the stage skipped
    pub skipped: usize,
}

/// Receives campaign progress; every method defaults to doing nothing.
pub trait CampaignObserver: Send {
    /// Called after every explorer step
    fn on_step(&mut self, _progress: &StepProgress) {}

    /// Called when an envelope's pipeline ends, budget-truncated or not
    fn on_envelope(&mut self, _envelope: &Envelope) {}
}

/// How a stage's steps are charged to the budget.
#[derive(Debug, Clone, Copy)]
enum Charge {
    /// Every step costs one test, kept or skipped
    PerStep,
    /// Only kept samples cost a test
    PerKept,
}

/// When a stage stops on its own.
#[derive(Debug, Clone, Copy)]
enum StopRule {
    Completion,
    FixedSteps(usize),
    /// Only the budget stops the stage
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageOutcome {
    Finished,
    BudgetExhausted,
}

/// Drives a campaign: envelopes, stages, budget and the seed stream.
pub struct ExplorationController<R, F> {
    runner: R,
    factory: F,
    space: ParameterSpace,
    classifier: Arc<dyn ScoreClassifier>,
    settings: CampaignConfig,
    rng: ChaCha8Rng,
    n_tests: usize,
    envelopes: Vec<Envelope>,
    observer: Option<Box<dyn CampaignObserver>>,
}

impl<R, F> ExplorationController<R, F>
where
    R: ScenarioRunner,
    F: ExplorerFactory,
{
    /// Controller for `space` whose random source is seeded from `settings.seed`.
    pub fn new(
        runner: R,
        factory: F,
        space: ParameterSpace,
        classifier: Arc<dyn ScoreClassifier>,
        settings: CampaignConfig,
    ) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(settings.seed);
        Self {
            runner,
            factory,
            space,
            classifier,
            settings,
            rng,
            n_tests: 0,
            envelopes: Vec::new(),
            observer: None,
        }
    }

    /// Report progress to `observer`.
    pub fn with_observer(mut self, observer: Box<dyn CampaignObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Tests charged so far.
    pub fn n_tests(&self) -> usize {
        self.n_tests
    }

    /// Campaign budget.
    pub fn total(&self) -> usize {
        self.settings.total_tests
    }

    /// Space points are projected onto.
    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    /// Classifier deciding target samples.
    pub fn classifier(&self) -> &Arc<dyn ScoreClassifier> {
        &self.classifier
    }

    /// Envelopes explored so far, in campaign order.
    pub fn envelopes(&self) -> &[Envelope] {
        &self.envelopes
    }

    /// Envelope with id `id`.
    pub fn envelope(&self, id: usize) -> Option<&Envelope> {
        self.envelopes.get(id)
    }

    /// The scenario runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Consume the controller, keeping its envelopes.
    pub fn into_envelopes(self) -> Vec<Envelope> {
        self.envelopes
    }

    fn draw_seed(&mut self) -> u32 {
        self.rng.gen_range(0..u32::MAX)
    }

    /// Spend the whole budget in the configured mode.
    #[instrument(skip(self), fields(target = %self.classifier.name(), total = self.settings.total_tests))]
    pub async fn run(&mut self) -> DomainResult<()> {
        match self.settings.mode {
            CampaignMode::Envelope => {
                while self.n_tests < self.settings.total_tests {
                    let before = self.n_tests;
                    self.run_envelope().await?;
                    if self.n_tests == before {
                        warn!(
                            envelope_id = self.envelopes.len() - 1,
                            "Envelope spent no tests, stopping campaign"
                        );
                        break;
                    }
                }
            }
            CampaignMode::MonteCarlo => {
                if self.n_tests < self.settings.total_tests {
                    self.run_monte_carlo().await?;
                }
            }
        }

        info!(
            n_tests = self.n_tests,
            envelopes = self.envelopes.len(),
            "Campaign finished"
        );
        Ok(())
    }

    /// Locate and explore one envelope. The envelope is kept even when a
    /// stage fails.
    pub async fn run_envelope(&mut self) -> DomainResult<()> {
        let mut envelope = Envelope::new(self.envelopes.len());
        info!(envelope_id = envelope.id, n_tests = self.n_tests, "Exploring envelope");

        let result = self.explore(&mut envelope).await;
        if let Some(observer) = self.observer.as_mut() {
            observer.on_envelope(&envelope);
        }
        self.envelopes.push(envelope);
        result
    }

    /// One locator sampling uniformly until the budget is spent.
    pub async fn run_monte_carlo(&mut self) -> DomainResult<()> {
        let mut envelope = Envelope::new(self.envelopes.len());
        let seed = self.draw_seed();
        let fast_forward = self.draw_seed() % FAST_FORWARD_RANGE;
        info!(seed, fast_forward, "Monte Carlo sampling");

        let mut run = StageRun::new(Stage::MonteCarlo, self.factory.monte_carlo(seed, fast_forward));
        let result = self
            .drive(envelope.id, &mut run, Charge::PerStep, StopRule::Never)
            .await;
        envelope.push_stage(run);
        if let Some(observer) = self.observer.as_mut() {
            observer.on_envelope(&envelope);
        }
        self.envelopes.push(envelope);
        result.map(|_| ())
    }

    async fn explore(&mut self, envelope: &mut Envelope) -> DomainResult<()> {
        let id = envelope.id;

        let seed = self.draw_seed();
        let fast_forward = self.draw_seed() % FAST_FORWARD_RANGE;
        let locator = self.factory.locator(seed, fast_forward);
        let outcome = self
            .run_stage(envelope, Stage::Locate, locator, Charge::PerStep, StopRule::Completion)
            .await?;
        if outcome == StageOutcome::BudgetExhausted {
            return Ok(());
        }

        let locate_root = last_kept(envelope, Stage::Locate)?;
        let surface_seed = self.draw_seed();
        let surface = self.factory.surface_finder(&locate_root, surface_seed);
        let outcome = self
            .run_stage(envelope, Stage::Surface, surface, Charge::PerKept, StopRule::Completion)
            .await?;
        if outcome == StageOutcome::BudgetExhausted {
            return Ok(());
        }

        // A surface finder that kept nothing leaves the locate root as the
        // best boundary estimate.
        let root = last_kept(envelope, Stage::Surface).unwrap_or(locate_root);
        let normal = envelope
            .stage(Stage::Surface)
            .and_then(|run| run.explorer.boundary_normal())
            .map(<[f64]>::to_vec)
            .ok_or_else(|| {
                DomainError::DataConsistency(format!(
                    "Envelope {id} surface stage finished without a boundary normal"
                ))
            })?;
        let frame = orthonormal_frame(&normal)?;
        let follower = self.factory.boundary_follower(&root, frame);
        self.run_stage(
            envelope,
            Stage::Boundary,
            follower,
            Charge::PerKept,
            StopRule::FixedSteps(self.settings.boundary_samples),
        )
        .await?;

        Ok(())
    }

    async fn run_stage(
        &mut self,
        envelope: &mut Envelope,
        stage: Stage,
        explorer: Box<dyn StageExplorer>,
        charge: Charge,
        stop: StopRule,
    ) -> DomainResult<StageOutcome> {
        info!(envelope_id = envelope.id, stage = %stage, "Starting stage");
        let mut run = StageRun::new(stage, explorer);
        let result = self.drive(envelope.id, &mut run, charge, stop).await;
        debug!(
            envelope_id = envelope.id,
            stage = %stage,
            steps = run.steps,
            kept = run.kept(),
            "Stage finished"
        );
        envelope.push_stage(run);
        result
    }

    async fn drive(
        &mut self,
        envelope_id: usize,
        run: &mut StageRun,
        charge: Charge,
        stop: StopRule,
    ) -> DomainResult<StageOutcome> {
        let base = self.n_tests;
        let total = self.settings.total_tests;

        loop {
            let finished = match stop {
                StopRule::Completion => run.explorer.is_complete(),
                StopRule::FixedSteps(steps) => run.steps >= steps,
                StopRule::Never => false,
            };
            if finished {
                return Ok(StageOutcome::Finished);
            }

            self.step(run.explorer.as_mut()).await?;
            run.steps += 1;
            self.n_tests = match charge {
                Charge::PerStep => base + run.steps,
                Charge::PerKept => base + run.kept(),
            };

            let progress = StepProgress {
                envelope_id,
                stage: run.stage,
                n_tests: self.n_tests,
                total,
                kept: run.kept(),
                skipped: run.skipped(),
            };
            debug!(
                envelope_id,
                stage = %run.stage,
                n_tests = progress.n_tests,
                kept = progress.kept,
                skipped = progress.skipped,
                "Step"
            );
            if let Some(observer) = self.observer.as_mut() {
                observer.on_step(&progress);
            }

            if self.n_tests >= total {
                let done = match stop {
                    StopRule::Completion => run.explorer.is_complete(),
                    StopRule::FixedSteps(steps) => run.steps >= steps,
                    StopRule::Never => false,
                };
                run.truncated = !done;
                if run.truncated {
                    warn!(envelope_id, stage = %run.stage, n_tests = self.n_tests, "Budget exhausted mid-stage");
                }
                return Ok(StageOutcome::BudgetExhausted);
            }
        }
    }

    /// Propose, project, run, classify and feed back one sample. Returns
    /// whether the explorer kept it.
    async fn step(&mut self, explorer: &mut dyn StageExplorer) -> DomainResult<bool> {
        let Some(point) = explorer.propose() else {
            return Ok(false);
        };
        let params = self.space.project(&point)?;
        let score = self.runner.run(&params).await?;
        let is_target = self.classifier.classify(&score);
        Ok(explorer.observe(point, params, score, is_target))
    }
}

fn last_kept(envelope: &Envelope, stage: Stage) -> DomainResult<Vec<f64>> {
    envelope
        .stage(stage)
        .and_then(|run| run.history().last_point())
        .map(<[f64]>::to_vec)
        .ok_or(DomainError::EmptyStageHistory {
            envelope_id: envelope.id,
            stage,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::envelope::StageHistory;
    use crate::domain::models::parameter_space::{Feature, ParameterVector};
    use crate::domain::models::score::ScoreVector;
    use crate::domain::ports::FnClassifier;
    use async_trait::async_trait;

    /// Runner whose "side move" happens when x > 0.5.
    struct ThresholdRunner {
        runs: usize,
    }

    #[async_trait]
    impl ScenarioRunner for ThresholdRunner {
        async fn run(&mut self, params: &ParameterVector) -> DomainResult<ScoreVector> {
            self.runs += 1;
            let mut score = ScoreVector::default();
            if params.require("x")? > 5.0 {
                score.side_move = 1.0;
            }
            Ok(score)
        }
    }

    /// Explorer walking a fixed list of points; completes after a target or
    /// when the list runs out. `None` entries are skipped steps.
    struct ListExplorer {
        stage: Stage,
        points: Vec<Option<Vec<f64>>>,
        next: usize,
        complete_on_target: bool,
        found: bool,
        history: StageHistory,
    }

    impl ListExplorer {
        fn boxed(stage: Stage, points: Vec<Option<Vec<f64>>>, complete_on_target: bool) -> Box<dyn StageExplorer> {
            Box::new(Self {
                stage,
                points,
                next: 0,
                complete_on_target,
                found: false,
                history: StageHistory::new(),
            })
        }
    }

    impl StageExplorer for ListExplorer {
        fn stage(&self) -> Stage {
            self.stage
        }

        fn propose(&mut self) -> Option<Vec<f64>> {
            let point = self.points.get(self.next).cloned().flatten();
            self.next += 1;
            point
        }

        fn observe(&mut self, point: Vec<f64>, params: ParameterVector, score: ScoreVector, is_target: bool) -> bool {
            self.found |= is_target;
            self.history.push(point, params, score);
            true
        }

        fn is_complete(&self) -> bool {
            (self.complete_on_target && self.found) || self.next >= self.points.len()
        }

        fn history(&self) -> &StageHistory {
            &self.history
        }

        fn boundary_normal(&self) -> Option<&[f64]> {
            (self.stage == Stage::Surface).then_some(&[1.0][..])
        }
    }

    struct ListFactory {
        locate: Vec<Option<Vec<f64>>>,
        surface: Vec<Option<Vec<f64>>>,
    }

    impl ExplorerFactory for ListFactory {
        fn locator(&self, _seed: u32, _fast_forward: u32) -> Box<dyn StageExplorer> {
            ListExplorer::boxed(Stage::Locate, self.locate.clone(), true)
        }

        fn monte_carlo(&self, _seed: u32, _fast_forward: u32) -> Box<dyn StageExplorer> {
            ListExplorer::boxed(Stage::MonteCarlo, vec![Some(vec![0.1]); 1000], false)
        }

        fn surface_finder(&self, _root: &[f64], _seed: u32) -> Box<dyn StageExplorer> {
            ListExplorer::boxed(Stage::Surface, self.surface.clone(), false)
        }

        fn boundary_follower(&self, root: &[f64], frame: Vec<Vec<f64>>) -> Box<dyn StageExplorer> {
            assert_eq!(frame, vec![vec![1.0]]);
            ListExplorer::boxed(Stage::Boundary, vec![Some(root.to_vec()); 1000], false)
        }
    }

    fn controller(total: usize, boundary: usize, factory: ListFactory) -> ExplorationController<ThresholdRunner, ListFactory> {
        let space = ParameterSpace::new(vec![Feature::new("x", 0.0, 10.0, None)]).unwrap();
        let classifier = Arc::new(FnClassifier::new("side_move", ScoreVector::side_moved));
        let settings = CampaignConfig {
            total_tests: total,
            boundary_samples: boundary,
            ..CampaignConfig::default()
        };
        ExplorationController::new(ThresholdRunner { runs: 0 }, factory, space, classifier, settings)
    }

    fn factory() -> ListFactory {
        ListFactory {
            locate: vec![Some(vec![0.1]), None, Some(vec![0.7])],
            surface: vec![Some(vec![0.6]), None, Some(vec![0.55])],
        }
    }

    #[tokio::test]
    async fn test_full_envelope_accounting() {
        let mut controller = controller(100, 4, factory());
        controller.run_envelope().await.unwrap();

        let envelope = controller.envelope(0).unwrap();
        assert_eq!(envelope.stages().len(), 3);
        // 3 locate steps (one skipped) + 2 kept surface + 4 boundary
        assert_eq!(envelope.stage(Stage::Locate).unwrap().steps, 3);
        assert_eq!(envelope.stage(Stage::Locate).unwrap().kept(), 2);
        assert_eq!(envelope.stage(Stage::Surface).unwrap().skipped(), 1);
        assert_eq!(envelope.stage(Stage::Boundary).unwrap().steps, 4);
        assert_eq!(controller.n_tests(), 3 + 2 + 4);
        assert_eq!(controller.runner().runs, 2 + 2 + 4);
        assert!(!envelope.is_truncated());
    }

    #[tokio::test]
    async fn test_budget_exhausted_in_locate_skips_later_stages() {
        let factory = ListFactory {
            locate: vec![Some(vec![0.1]); 10],
            surface: vec![],
        };
        let mut controller = controller(4, 4, factory);
        controller.run().await.unwrap();

        assert_eq!(controller.n_tests(), 4);
        assert_eq!(controller.envelopes().len(), 1);
        let envelope = controller.envelope(0).unwrap();
        assert_eq!(envelope.stages().len(), 1);
        assert!(envelope.is_truncated());
        assert_eq!(envelope.kept(), 4);
    }

    #[tokio::test]
    async fn test_budget_truncates_boundary_stage() {
        let mut controller = controller(7, 50, factory());
        controller.run().await.unwrap();

        // 3 locate + 2 surface leaves 2 boundary samples
        assert_eq!(controller.n_tests(), 7);
        let envelope = controller.envelope(0).unwrap();
        let boundary = envelope.stage(Stage::Boundary).unwrap();
        assert_eq!(boundary.kept(), 2);
        assert!(boundary.truncated);
    }

    #[tokio::test]
    async fn test_campaign_runs_envelopes_until_budget() {
        let mut controller = controller(20, 4, factory());
        controller.run().await.unwrap();

        // Each full envelope costs 9 tests: 9, 18, then 2 more in locate
        assert_eq!(controller.envelopes().len(), 3);
        assert_eq!(controller.n_tests(), 20);
        assert_eq!(controller.envelope(2).unwrap().stages().len(), 1);
        assert!(controller.envelopes().iter().enumerate().all(|(i, e)| e.id == i));
    }

    #[tokio::test]
    async fn test_monte_carlo_spends_exact_budget() {
        let mut controller = controller(25, 4, factory());
        controller.settings.mode = CampaignMode::MonteCarlo;
        controller.run().await.unwrap();

        assert_eq!(controller.n_tests(), 25);
        let envelope = controller.envelope(0).unwrap();
        assert_eq!(envelope.stages()[0].stage, Stage::MonteCarlo);
        assert_eq!(envelope.kept(), 25);
    }

    #[tokio::test]
    async fn test_empty_locate_history_is_an_error() {
        let factory = ListFactory {
            locate: vec![None, None],
            surface: vec![],
        };
        let mut controller = controller(100, 4, factory);
        let err = controller.run_envelope().await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::EmptyStageHistory {
                envelope_id: 0,
                stage: Stage::Locate
            }
        ));
        // The failed envelope stays addressable
        assert_eq!(controller.envelopes().len(), 1);
    }
}
