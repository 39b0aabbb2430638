//! Error types for model declaration and evaluation.

use thiserror::Error;

/// Errors raised while building, evaluating or (de)serializing a model.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A component with this name already exists on the model.
    #[error("Component '{0}' is already declared on this model")]
    DuplicateComponent(String),

    /// No component with this name exists.
    #[error("Unknown component '{0}'")]
    UnknownComponent(String),

    /// The index is not a member of the component's index set.
    #[error("Index {index} is not valid for component '{name}'")]
    InvalidIndex { name: String, index: String },

    /// A constraint handle refers to a removed constraint.
    #[error("Constraint #{0} has been removed from the model")]
    RemovedConstraint(usize),

    /// A variable has no value and one is required.
    #[error("No value for variable '{0}'")]
    NoValue(String),

    /// Lower bound exceeds upper bound.
    #[error("Invalid bounds for '{name}': lower bound {lower} exceeds upper bound {upper}")]
    InvalidBounds { name: String, lower: f64, upper: f64 },

    /// Numeric evaluation failed (domain error, division by zero).
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Symbol map inconsistency.
    #[error("Symbol error: {0}")]
    Symbol(String),

    /// The model has no active objective.
    #[error("Model has no active objective")]
    NoObjective,

    /// The model has more than one active objective.
    #[error("Model has {0} active objectives; expected exactly one")]
    MultipleObjectives(usize),

    /// Invalid argument passed to a builder.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON (de)serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for results of model operations.
pub type ModelResult<T> = Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModelError::InvalidIndex {
            name: "x".into(),
            index: "[3]".into(),
        };
        assert_eq!(err.to_string(), "Index [3] is not valid for component 'x'");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ModelError = io_err.into();
        assert!(matches!(err, ModelError::Io(_)));
    }
}
