//! Error types and exit codes for solver invocation.

use amf_core::ModelError;
use thiserror::Error;

/// Exit codes of solver executables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success (check the termination condition in the results)
    Success = 0,
    /// Bad command line or unreadable input file
    InvalidInput = 1,
    /// Solver error (license, numerical issues)
    SolverError = 2,
    /// Time limit hit inside the solver
    Timeout = 3,
    /// Killed by a signal (no exit status)
    Killed = -1,
    /// Segfault (SIGSEGV) - native crash
    Segfault = 139,
}

impl ExitCode {
    /// Convert from raw exit code to ExitCode enum.
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => ExitCode::Success,
            1 => ExitCode::InvalidInput,
            2 => ExitCode::SolverError,
            3 => ExitCode::Timeout,
            -1 => ExitCode::Killed,
            139 => ExitCode::Segfault,
            _ => ExitCode::SolverError,
        }
    }

    /// Check if this exit code indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

/// Errors that can occur while writing, running or reading back a solve.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Unknown solver name.
    #[error("Unknown solver '{name}'. Known solvers: {known}")]
    UnknownSolver { name: String, known: String },

    /// Solver executable not found.
    #[error("Solver executable '{0}' was not found in the search directories or on PATH")]
    NotInstalled(String),

    /// The license server has no token for this solver.
    #[error("No license token is available for solver {0}")]
    LicenseUnavailable(String),

    /// The solver cannot handle this kind of model.
    #[error("Solver {solver} does not support {what}")]
    Unsupported { solver: String, what: String },

    /// The model cannot be expressed in the target file format.
    #[error("Cannot write '{component}': {reason}")]
    Format { component: String, reason: String },

    /// Solver process failed to start.
    #[error("Failed to start solver process: {0}")]
    ProcessStart(#[source] std::io::Error),

    /// Solver process returned an error.
    #[error("Solver process failed with exit code {exit_code:?}: {message}")]
    ProcessFailed { exit_code: ExitCode, message: String },

    /// Timeout while waiting for solver.
    #[error("Solver timed out after {seconds} seconds")]
    Timeout { seconds: u64, message: String },

    /// Could not parse solver output.
    #[error("Failed to parse solver output: {0}")]
    Parse(String),

    /// Persistent solver bookkeeping error.
    #[error("{0}")]
    Persistent(String),

    /// Invalid solver option.
    #[error("Invalid option '{name}': {reason}")]
    InvalidOption { name: String, reason: String },

    /// The solver was used before a model was loaded.
    #[error("No model has been set on solver {0}")]
    NoInstance(String),

    /// Model declaration or evaluation error.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Generic IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for solver operations.
pub type SolverResult<T> = Result<T, SolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_from_raw() {
        assert_eq!(ExitCode::from_raw(0), ExitCode::Success);
        assert_eq!(ExitCode::from_raw(139), ExitCode::Segfault);
        assert_eq!(ExitCode::from_raw(-1), ExitCode::Killed);
        assert_eq!(ExitCode::from_raw(42), ExitCode::SolverError);
        assert!(!ExitCode::Timeout.is_success());
    }

    #[test]
    fn model_errors_pass_through() {
        let err: SolverError = ModelError::NoObjective.into();
        assert_eq!(err.to_string(), "Model has no active objective");
    }
}
