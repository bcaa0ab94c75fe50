//! Target behaviors and campaign modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::score::ScoreVector;
use crate::domain::errors::DomainError;
use crate::domain::ports::ScoreClassifier;

/// Behavior whose envelope a campaign searches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// The DUT performed a side move around a halted queue
    SideMove,
    /// The DUT entered the junction on red
    RunRedLight,
    /// The DUT was involved in at least one collision
    Collision,
}

impl Target {
    /// Name used in file names and on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::SideMove => "side_move",
            Self::RunRedLight => "run_red_light",
            Self::Collision => "collision",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "side_move" => Ok(Self::SideMove),
            "run_red_light" => Ok(Self::RunRedLight),
            "collision" => Ok(Self::Collision),
            other => Err(DomainError::config(format!(
                "unknown target '{other}', expected side_move, run_red_light or collision"
            ))),
        }
    }
}

impl ScoreClassifier for Target {
    fn name(&self) -> &str {
        Self::name(*self)
    }

    fn classify(&self, score: &ScoreVector) -> bool {
        match self {
            Self::SideMove => score.side_moved(),
            Self::RunRedLight => score.run_red_light,
            Self::Collision => !score.collisions.is_empty(),
        }
    }
}

/// How a campaign spends its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignMode {
    /// Locate, refine and follow envelopes until the budget is spent
    #[default]
    Envelope,
    /// Uniform random sampling for the whole budget
    MonteCarlo,
}

impl FromStr for CampaignMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "envelope" => Ok(Self::Envelope),
            "monte_carlo" | "mc" => Ok(Self::MonteCarlo),
            other => Err(DomainError::config(format!("unknown campaign mode '{other}'"))),
        }
    }
}
