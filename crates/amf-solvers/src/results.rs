//! Solver results and loading them back into a model.

use amf_core::{Model, SymbolMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCondition {
    /// Proven optimal solution.
    Optimal,
    /// Feasible solution without optimality proof.
    Feasible,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
    /// Solver hit its time limit.
    MaxTimeLimit,
    /// Solver hit an iteration or node limit.
    MaxIterations,
    /// Solver reported an error.
    Error,
    /// Status could not be determined.
    #[default]
    Unknown,
}

impl TerminationCondition {
    /// Whether the results carry a usable primal solution.
    pub fn has_solution(&self) -> bool {
        matches!(
            self,
            TerminationCondition::Optimal | TerminationCondition::Feasible
        )
    }
}

impl std::fmt::Display for TerminationCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationCondition::Optimal => write!(f, "optimal"),
            TerminationCondition::Feasible => write!(f, "feasible"),
            TerminationCondition::Infeasible => write!(f, "infeasible"),
            TerminationCondition::Unbounded => write!(f, "unbounded"),
            TerminationCondition::MaxTimeLimit => write!(f, "max_time_limit"),
            TerminationCondition::MaxIterations => write!(f, "max_iterations"),
            TerminationCondition::Error => write!(f, "error"),
            TerminationCondition::Unknown => write!(f, "unknown"),
        }
    }
}

/// Overall status of the solver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    Ok,
    Warning,
    Error,
    Aborted,
    #[default]
    Unknown,
}

impl SolverStatus {
    pub fn from_termination(tc: TerminationCondition) -> Self {
        match tc {
            TerminationCondition::Optimal => SolverStatus::Ok,
            TerminationCondition::Feasible
            | TerminationCondition::Infeasible
            | TerminationCondition::Unbounded => SolverStatus::Warning,
            TerminationCondition::MaxTimeLimit | TerminationCondition::MaxIterations => {
                SolverStatus::Aborted
            }
            TerminationCondition::Error => SolverStatus::Error,
            TerminationCondition::Unknown => SolverStatus::Unknown,
        }
    }
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SolverStatus::Ok => "ok",
            SolverStatus::Warning => "warning",
            SolverStatus::Error => "error",
            SolverStatus::Aborted => "aborted",
            SolverStatus::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Results of one solve, keyed by solver symbol.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolverResults {
    pub solver: String,
    pub status: SolverStatus,
    pub termination: TerminationCondition,
    pub objective: Option<f64>,
    /// Primal values by variable symbol.
    pub values: BTreeMap<String, f64>,
    /// Reduced costs by variable symbol.
    pub reduced_costs: BTreeMap<String, f64>,
    /// Duals by constraint symbol.
    pub duals: BTreeMap<String, f64>,
    /// Wall time in seconds.
    pub wall_time: f64,
    /// Captured solver log.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub log: String,
    pub message: Option<String>,
}

impl SolverResults {
    pub fn new(solver: &str, termination: TerminationCondition) -> Self {
        Self {
            solver: solver.to_string(),
            status: SolverStatus::from_termination(termination),
            termination,
            ..Default::default()
        }
    }

    /// Load primal values into `model`. Symbols that do not map to a
    /// variable are skipped. Returns the number of values loaded.
    pub fn load_into(&self, model: &mut Model, symbol_map: &SymbolMap) -> usize {
        let mut assignments = Vec::with_capacity(self.values.len());
        for (symbol, value) in &self.values {
            match symbol_map.var(symbol) {
                Some(v) => assignments.push((v, *value)),
                None => warn!(symbol = %symbol, "result symbol does not map to a model variable"),
            }
        }
        let loaded = assignments.len();
        model.load_values(assignments);
        debug!(solver = %self.solver, loaded, "loaded results into model");
        loaded
    }

    /// Results translated to model variable names.
    pub fn named_values(&self, model: &Model, symbol_map: &SymbolMap) -> Vec<(String, f64)> {
        self.values
            .iter()
            .filter_map(|(symbol, value)| {
                symbol_map
                    .var(symbol)
                    .map(|v| (model.var_name(v).to_string(), *value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amf_core::{Domain, TextLabeler};

    #[test]
    fn status_follows_termination() {
        let r = SolverResults::new("cbc", TerminationCondition::Optimal);
        assert_eq!(r.status, SolverStatus::Ok);
        let r = SolverResults::new("cbc", TerminationCondition::MaxTimeLimit);
        assert_eq!(r.status, SolverStatus::Aborted);
        assert!(!r.termination.has_solution());
    }

    #[test]
    fn load_skips_unknown_symbols() {
        let mut m = Model::new("r");
        let x = m.add_var("x", Domain::Reals, (None, None)).unwrap();
        let mut map = SymbolMap::new();
        map.get_symbol(&m, x, &mut TextLabeler).unwrap();

        let mut r = SolverResults::new("cbc", TerminationCondition::Optimal);
        r.values.insert("x".into(), 2.5);
        r.values.insert("ONE_VAR_CONSTANT".into(), 1.0);
        assert_eq!(r.load_into(&mut m, &map), 1);
        assert_eq!(m.value(x).unwrap(), 2.5);
        assert_eq!(r.named_values(&m, &map), vec![("x".to_string(), 2.5)]);
    }

    #[test]
    fn serializes_snake_case() {
        let r = SolverResults::new("cbc", TerminationCondition::MaxIterations);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"termination\":\"max_iterations\""));
        assert!(json.contains("\"status\":\"aborted\""));
    }
}
