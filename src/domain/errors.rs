//! Domain errors for the envelope exploration system.

use thiserror::Error;

use super::models::envelope::Stage;

/// Domain-level errors that can occur while exploring a performance envelope.
///
/// None of these are retried: a failure either aborts the campaign before any
/// scenario runs (configuration) or aborts the in-progress scenario and
/// propagates out of the controller.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Invalid settings, parameter space or script
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The simulator rejected a command or reported an impossible state
    #[error("Simulator protocol error: {0}")]
    SimulatorProtocol(String),

    /// Columns or tables that should be row-aligned are not
    #[error("Data consistency error: {0}")]
    DataConsistency(String),

    /// A unit-cube coordinate projected outside its feature range
    #[error("Parameter {feature} = {value} outside [{min}, {max}]")]
    ParameterOutOfBounds {
        /// Feature name
        feature: String,
        /// Offending value
        value: f64,
        /// Lower bound of the feature
        min: f64,
        /// Upper bound of the feature
        max: f64,
    },

    /// A completed stage produced nothing to aggregate
    #[error("Envelope {envelope_id} has no kept samples in stage {stage}")]
    EmptyStageHistory {
        /// Envelope the stage belongs to
        envelope_id: usize,
        /// The empty stage
        stage: Stage,
    },

    /// Reading or writing a file failed
    #[error("IO error: {0}")]
    Io(String),

    /// JSON or YAML encoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result alias used throughout the domain and services.
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Shorthand for a simulator protocol violation.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::SimulatorProtocol(message.into())
    }

    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for DomainError {
    fn from(err: serde_yaml::Error) -> Self {
        DomainError::Configuration(err.to_string())
    }
}
