//! Experiments and their labelled models.

use crate::error::EstimationResult;
use amf_core::{Expr, Model, Var};

/// One measured output and the model expression predicting it.
#[derive(Debug, Clone)]
pub struct ExperimentOutput {
    pub name: String,
    pub measured: f64,
    pub response: Expr,
}

impl ExperimentOutput {
    pub fn new(name: &str, measured: f64, response: impl Into<Expr>) -> Self {
        Self {
            name: name.to_string(),
            measured,
            response: response.into(),
        }
    }
}

/// A model annotated with what is unknown and what was measured.
///
/// Unknown parameters are matched across experiments by variable name,
/// and their current values are the starting point of the fit.
#[derive(Debug, Clone)]
pub struct LabeledModel {
    pub model: Model,
    pub unknown_parameters: Vec<Var>,
    pub outputs: Vec<ExperimentOutput>,
}

impl LabeledModel {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            unknown_parameters: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, v: Var) -> Self {
        self.unknown_parameters.push(v);
        self
    }

    pub fn with_output(mut self, output: ExperimentOutput) -> Self {
        self.outputs.push(output);
        self
    }

    /// Names of the unknown parameters, in declaration order.
    pub fn parameter_names(&self) -> Vec<String> {
        self.unknown_parameters
            .iter()
            .map(|v| self.model.var_name(*v).to_string())
            .collect()
    }

    /// Sum of squared residuals at the current variable values.
    pub fn sse(&self) -> EstimationResult<f64> {
        let mut total = 0.0;
        for output in &self.outputs {
            let r = output.measured - self.model.evaluate(&output.response)?;
            total += r * r;
        }
        Ok(total)
    }
}

/// A single data point or run that can build its labelled model.
pub trait Experiment {
    fn labeled_model(&self) -> EstimationResult<LabeledModel>;
}
