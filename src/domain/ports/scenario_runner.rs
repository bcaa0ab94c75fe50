//! Scenario runner port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::parameter_space::ParameterVector;
use crate::domain::models::score::ScoreVector;

/// Runs one complete scenario for a parameter vector.
#[async_trait]
pub trait ScenarioRunner: Send {
    /// Run the scenario for `params` and return its metrics
    async fn run(&mut self, params: &ParameterVector) -> DomainResult<ScoreVector>;
}
