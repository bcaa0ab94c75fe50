//! Progress bars for campaign runs using indicatif.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use crate::domain::models::envelope::Envelope;
use crate::services::exploration_controller::{CampaignObserver, StepProgress};

const PROGRESS_TEMPLATE: &str =
    "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg} (ETA: {eta})";
const PROGRESS_CHARS: &str = "█▓▒░ ";

/// Progress bar over `total` tests with ETA.
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(PROGRESS_TEMPLATE)
        .map(|style| style.progress_chars(PROGRESS_CHARS))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Extension trait for ProgressBar to add common utility methods
pub trait ProgressBarExt {
    /// Finish with a success message (green checkmark)
    fn finish_success(&self, message: impl Into<String>);

    /// Finish with an error message (red X)
    fn finish_error(&self, message: impl Into<String>);
}

impl ProgressBarExt for ProgressBar {
    fn finish_success(&self, message: impl Into<String>) {
        self.finish_with_message(format!("✓ {}", message.into()));
    }

    fn finish_error(&self, message: impl Into<String>) {
        self.abandon_with_message(format!("✗ {}", message.into()));
    }
}

/// Shows campaign progress: tests spent against the budget, and the
/// envelope and stage currently being sampled.
pub struct CampaignProgress {
    bar: ProgressBar,
    envelopes: usize,
    explored: usize,
}

impl CampaignProgress {
    /// Progress bar over a budget of `total` tests.
    pub fn new(total: usize) -> Self {
        Self::with_bar(create_progress_bar(total as u64))
    }

    /// A progress observer that never draws (for testing)
    pub fn hidden(total: usize) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::hidden());
        Self::with_bar(bar)
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            envelopes: 0,
            explored: 0,
        }
    }

    /// Handle to the underlying bar, e.g. to finish it after the run.
    pub fn bar(&self) -> ProgressBar {
        self.bar.clone()
    }
}

impl CampaignObserver for CampaignProgress {
    fn on_step(&mut self, progress: &StepProgress) {
        self.bar.set_position(progress.n_tests as u64);
        self.bar.set_message(format!(
            "envelope {} {} (kept {}, skipped {})",
            progress.envelope_id, progress.stage, progress.kept, progress.skipped
        ));
    }

    fn on_envelope(&mut self, envelope: &Envelope) {
        self.envelopes += 1;
        if envelope.kept() > 0 && !envelope.is_truncated() {
            self.explored += 1;
        }
        self.bar.set_message(format!(
            "{} envelopes, {} fully explored",
            self.envelopes, self.explored
        ));
    }
}
