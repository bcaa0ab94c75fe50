//! Implementation of the `dino report` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::adapters::tables::read_scores;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::envelope::Stage;
use crate::domain::models::table::ScoreRow;

/// Arguments of `dino report`.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Score table written by `dino run` (`*_scores.jsonl`)
    pub scores: PathBuf,
}

/// Totals for one stage of one envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    /// Envelope the rows belong to
    pub envelope_id: usize,
    /// Stage the rows were drawn in
    pub stage: Stage,
    /// Rows in the group
    pub tests: usize,
    /// Rows classified as target
    pub targets: usize,
    /// Target rows over all rows
    pub target_rate: f64,
    /// Collisions involving the DUT
    pub collisions: usize,
}

/// Result of `dino report`.
#[derive(Debug, Serialize)]
pub struct ReportOutput {
    /// Score table that was read
    pub path: PathBuf,
    /// Rows read
    pub rows: usize,
    /// Distinct envelopes
    pub envelopes: usize,
    /// Rows classified as target
    pub targets: usize,
    /// Per-envelope, per-stage totals
    pub stages: Vec<StageSummary>,
}

impl CommandOutput for ReportOutput {
    fn to_human(&self) -> String {
        format!(
            "{}\n{} rows, {} envelopes, {} targets",
            TableFormatter::new().format_stage_summaries(&self.stages),
            self.rows,
            self.envelopes,
            self.targets
        )
    }
}

/// Group consecutive rows of the same envelope and stage.
pub fn summarize(rows: &[ScoreRow]) -> Vec<StageSummary> {
    let mut summaries: Vec<StageSummary> = Vec::new();
    for row in rows {
        let same_group = summaries
            .last()
            .is_some_and(|s| s.envelope_id == row.envelope_id && s.stage == row.stage);
        if !same_group {
            summaries.push(StageSummary {
                envelope_id: row.envelope_id,
                stage: row.stage,
                tests: 0,
                targets: 0,
                target_rate: 0.0,
                collisions: 0,
            });
        }
        if let Some(summary) = summaries.last_mut() {
            summary.tests += 1;
            summary.targets += usize::from(row.is_target);
            summary.collisions += row.score.n_collisions();
        }
    }
    for summary in &mut summaries {
        summary.target_rate = summary.targets as f64 / summary.tests as f64;
    }
    summaries
}

/// Summarize a score table per envelope and stage.
pub async fn execute(args: ReportArgs, json_mode: bool) -> Result<()> {
    let rows = read_scores(&args.scores)
        .await
        .with_context(|| format!("Failed to read score table {}", args.scores.display()))?;
    let stages = summarize(&rows);

    let mut envelope_ids: Vec<usize> = stages.iter().map(|s| s.envelope_id).collect();
    envelope_ids.dedup();

    let output_data = ReportOutput {
        path: args.scores,
        rows: rows.len(),
        envelopes: envelope_ids.len(),
        targets: rows.iter().filter(|r| r.is_target).count(),
        stages,
    };
    output(&output_data, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::score::ScoreVector;

    fn row(envelope_id: usize, stage: Stage, is_target: bool) -> ScoreRow {
        ScoreRow {
            envelope_id,
            stage,
            score: ScoreVector::default(),
            is_target,
        }
    }

    #[test]
    fn test_summarize_groups_by_envelope_and_stage() {
        let rows = vec![
            row(0, Stage::Locate, false),
            row(0, Stage::Locate, true),
            row(0, Stage::Surface, true),
            row(0, Stage::Boundary, false),
            row(0, Stage::Boundary, true),
            row(1, Stage::Locate, false),
        ];
        let summaries = summarize(&rows);
        assert_eq!(summaries.len(), 4);
        assert_eq!(summaries[0].tests, 2);
        assert!((summaries[0].target_rate - 0.5).abs() < 1e-12);
        assert_eq!(summaries[2].stage, Stage::Boundary);
        assert_eq!(summaries[3].envelope_id, 1);
        assert_eq!(summaries[3].targets, 0);
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize(&[]).is_empty());
    }
}
