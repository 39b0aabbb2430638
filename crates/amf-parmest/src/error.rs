use amf_core::ModelError;
use thiserror::Error;

/// Errors raised while estimating parameters.
#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("No experiments to estimate from")]
    NoExperiments,

    /// Experiments disagree on the unknown parameters.
    #[error("Experiment {index} has parameters [{found}], expected [{expected}]")]
    ParameterMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("Normal equations are singular: {0}")]
    Singular(String),

    #[error("No convergence after {iterations} iterations (SSE {sse})")]
    NotConverged { iterations: usize, sse: f64 },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EstimationResult<T> = Result<T, EstimationError>;
