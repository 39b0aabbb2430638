//! In-process LP solver on the pure-Rust Clarabel backend of `good_lp`.
//!
//! Only continuous linear models are accepted. Clarabel is an interior point
//! method, so values are accurate to its default tolerances rather than
//! exactly at a vertex.

use crate::error::{SolverError, SolverResult};
use crate::options::SolverOptions;
use crate::results::{SolverResults, TerminationCondition};
use amf_core::{Model, Sense, SymbolMap, TextLabeler, Var};
use good_lp::solvers::clarabel::clarabel;
use good_lp::{
    constraint, variable, variables, Expression, ResolutionError, Solution, SolverModel,
    Variable,
};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

/// Direct (in-memory) LP solver.
#[derive(Debug, Clone, Default)]
pub struct DirectLpSolver {
    options: SolverOptions,
}

impl DirectLpSolver {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut SolverOptions {
        &mut self.options
    }

    /// Solve `model` and load the values back into it.
    pub fn solve(&self, model: &mut Model) -> SolverResult<SolverResults> {
        let start = Instant::now();
        let class = model.problem_class();
        if !class.is_linear() || class.has_integers() {
            return Err(SolverError::Unsupported {
                solver: "clarabel".to_string(),
                what: format!("{} models", class),
            });
        }
        let (_, objective) = model.active_objective()?;
        let sense = objective.sense;
        let objective_repn = model.repn(&objective.expr);

        let mut vars = variables!();
        let mut columns: BTreeMap<Var, Variable> = BTreeMap::new();
        for v in model.referenced_vars() {
            if model.fixed_value(v).is_some() {
                continue;
            }
            let (lb, ub) = model.var(v).effective_bounds();
            let mut def = variable();
            if let Some(lb) = lb {
                def = def.min(lb);
            }
            if let Some(ub) = ub {
                def = def.max(ub);
            }
            columns.insert(v, vars.add(def));
        }

        let linear = |repn: &amf_core::StandardRepn| -> Expression {
            repn.linear
                .iter()
                .filter_map(|(v, c)| columns.get(v).map(|col| *c * *col))
                .fold(Expression::from(repn.constant), |acc, term| acc + term)
        };

        let objective_expr = linear(&objective_repn);
        let mut problem = match sense {
            Sense::Minimize => vars.minimise(objective_expr).using(clarabel),
            Sense::Maximize => vars.maximise(objective_expr).using(clarabel),
        };

        let mut rows = 0usize;
        for (_, c) in model.active_constraints() {
            let repn = model.repn(&c.body);
            if repn.is_constant() {
                continue;
            }
            let body = linear(&repn);
            match (c.lower, c.upper) {
                (Some(l), Some(u)) if l == u => {
                    problem = problem.with(constraint!(body == l));
                    rows += 1;
                }
                (lower, upper) => {
                    if let Some(l) = lower {
                        problem = problem.with(constraint!(body.clone() >= l));
                        rows += 1;
                    }
                    if let Some(u) = upper {
                        problem = problem.with(constraint!(body <= u));
                        rows += 1;
                    }
                }
            }
        }
        debug!(columns = columns.len(), rows, "built clarabel problem");

        let mut symbol_map = SymbolMap::new();
        let mut results = match problem.solve() {
            Ok(solution) => {
                let mut results = SolverResults::new("clarabel", TerminationCondition::Optimal);
                for (v, col) in &columns {
                    let symbol = symbol_map.get_symbol(model, *v, &mut TextLabeler)?;
                    results.values.insert(symbol, solution.value(*col));
                }
                results
            }
            Err(ResolutionError::Infeasible) => {
                SolverResults::new("clarabel", TerminationCondition::Infeasible)
            }
            Err(ResolutionError::Unbounded) => {
                SolverResults::new("clarabel", TerminationCondition::Unbounded)
            }
            Err(e) => {
                let mut results = SolverResults::new("clarabel", TerminationCondition::Error);
                results.message = Some(format!("{:?}", e));
                results
            }
        };
        results.wall_time = start.elapsed().as_secs_f64();

        if results.termination.has_solution() {
            results.load_into(model, &symbol_map);
            results.objective = Some(model.objective_value()?);
        }
        info!(
            termination = %results.termination,
            seconds = results.wall_time,
            "clarabel finished"
        );
        Ok(results)
    }
}
