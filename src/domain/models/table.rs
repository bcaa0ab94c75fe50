//! Flattened campaign output: row-aligned parameter and score tables.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::envelope::Stage;
use super::intersection::{Route, VehicleType};
use super::parameter_space::ParameterVector;
use super::score::ScoreVector;
use super::target::{CampaignMode, Target};

/// One row of the parameter table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamRow {
    /// Envelope the test belongs to
    pub envelope_id: usize,
    /// Stage the test was drawn in
    pub stage: Stage,
    /// Parameter values, one column per feature
    #[serde(flatten)]
    pub params: ParameterVector,
}

/// One row of the score table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    /// Envelope the test belongs to
    pub envelope_id: usize,
    /// Stage the test was drawn in
    pub stage: Stage,
    /// Metrics of the run, one column per metric
    #[serde(flatten)]
    pub score: ScoreVector,
    /// Whether the classifier marked the run as target
    pub is_target: bool,
}

/// Parameter and score tables; row `i` of each describes the same test.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlatTables {
    /// Parameter rows
    pub params: Vec<ParamRow>,
    /// Score rows, aligned with `params`
    pub scores: Vec<ScoreRow>,
}

impl FlatTables {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether the tables hold no rows.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Rows classified as target.
    pub fn n_targets(&self) -> usize {
        self.scores.iter().filter(|row| row.is_target).count()
    }

    /// Fraction of rows classified as target, 0 for an empty table.
    pub fn target_rate(&self) -> f64 {
        if self.scores.is_empty() {
            0.0
        } else {
            self.n_targets() as f64 / self.scores.len() as f64
        }
    }

    /// Number of distinct envelopes represented.
    pub fn n_envelopes(&self) -> usize {
        self.scores
            .iter()
            .map(|row| row.envelope_id)
            .max()
            .map_or(0, |max| max + 1)
    }
}

/// Base name shared by a campaign's tables, e.g. `side_move_gamma_cross_a_eb_left`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    /// Name for a campaign's mode, target, DUT type and route.
    pub fn for_campaign(
        mode: CampaignMode,
        target: Target,
        dut_type: VehicleType,
        route: Route,
    ) -> Self {
        let prefix = match mode {
            CampaignMode::Envelope => target.name(),
            CampaignMode::MonteCarlo => "mc",
        };
        Self(format!("{prefix}_gamma_cross_{}_{route}", dut_type.code()))
    }

    /// The base name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the parameter table.
    pub fn params_file(&self, extension: &str) -> String {
        format!("{}_params.{extension}", self.0)
    }

    /// File name of the score table.
    pub fn scores_file(&self, extension: &str) -> String {
        format!("{}_scores.{extension}", self.0)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
