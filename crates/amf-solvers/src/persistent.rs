//! Persistent solver interface.
//!
//! A [`PersistentSolver`] owns a numeric copy of a model (the [`LpTask`])
//! that is kept in sync with the [`Model`] through explicit notifications.
//! Changing one constraint, fixing a variable or generating a column only
//! touches the affected part of the task instead of lowering the whole model
//! again before every solve.
//!
//! The task is dispatched to a [`SystemCallSolver`] backend on `solve`.

use crate::error::{SolverError, SolverResult};
use crate::lp_writer::{
    column_for, format_error, lower_repn, rows_for, ColumnKind, LpColumn, LpProblem, LpRow, LpSos,
};
use crate::results::SolverResults;
use crate::shellcmd::SystemCallSolver;
use crate::tabu::IncumbentTabuList;
use amf_core::{
    ComponentRef, ConstraintId, Expr, Model, ModelError, ObjectiveId, Sense, StandardRepn,
    SymbolMap, TextLabeler, Var,
};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// In-memory solver model.
#[derive(Debug, Clone, Default)]
pub struct LpTask {
    pub name: String,
    pub sense: Sense,
    pub objective_name: String,
    pub objective_linear: Vec<(String, f64)>,
    pub objective_quadratic: Vec<(String, String, f64)>,
    pub objective_constant: f64,
    /// Dense, in column index order.
    pub columns: Vec<LpColumn>,
    pub linear_rows: Vec<(ConstraintId, Vec<LpRow>)>,
    pub quadratic_rows: Vec<(ConstraintId, Vec<LpRow>)>,
    pub sos: Vec<LpSos>,
}

impl LpTask {
    /// Snapshot as a printable problem.
    pub fn to_problem(&self) -> LpProblem {
        let rows = self
            .linear_rows
            .iter()
            .chain(&self.quadratic_rows)
            .flat_map(|(_, rows)| rows.iter().cloned())
            .collect();
        LpProblem {
            name: self.name.clone(),
            sense: self.sense,
            objective_name: self.objective_name.clone(),
            objective_linear: self.objective_linear.clone(),
            objective_quadratic: self.objective_quadratic.clone(),
            objective_constant: self.objective_constant,
            rows,
            columns: self.columns.clone(),
            sos: self.sos.clone(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.linear_rows
            .iter()
            .chain(&self.quadratic_rows)
            .map(|(_, rows)| rows.len())
            .sum()
    }
}

/// Solver keeping a persistent task synchronised with a model.
#[derive(Debug)]
pub struct PersistentSolver {
    backend: SystemCallSolver,
    task: LpTask,
    has_instance: bool,
    symbol_map: SymbolMap,
    labeler: TextLabeler,
    /// Var to column index, dense in `0..ndx_count`.
    var_ndx: HashMap<Var, usize>,
    ndx_count: usize,
    /// Number of constraints, SOS sets and objectives referencing each var.
    referenced: HashMap<Var, usize>,
    con_vars: HashMap<ConstraintId, Vec<Var>>,
    sos_vars: HashMap<String, Vec<Var>>,
    objective: Option<ObjectiveId>,
    obj_vars: Vec<Var>,
    warm_start: bool,
    incumbents: Option<IncumbentTabuList>,
}

impl PersistentSolver {
    pub fn new(backend: SystemCallSolver) -> Self {
        Self {
            backend,
            task: LpTask::default(),
            has_instance: false,
            symbol_map: SymbolMap::new(),
            labeler: TextLabeler,
            var_ndx: HashMap::new(),
            ndx_count: 0,
            referenced: HashMap::new(),
            con_vars: HashMap::new(),
            sos_vars: HashMap::new(),
            objective: None,
            obj_vars: Vec::new(),
            warm_start: false,
            incumbents: None,
        }
    }

    pub fn backend(&self) -> &SystemCallSolver {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut SystemCallSolver {
        &mut self.backend
    }

    pub fn task(&self) -> &LpTask {
        &self.task
    }

    pub fn symbol_map(&self) -> &SymbolMap {
        &self.symbol_map
    }

    /// Column index of `v`, if it has been added.
    pub fn column_index(&self, v: Var) -> Option<usize> {
        self.var_ndx.get(&v).copied()
    }

    /// Number of constraints, SOS sets and objectives using `v`.
    pub fn reference_count(&self, v: Var) -> usize {
        self.referenced.get(&v).copied().unwrap_or(0)
    }

    /// Pass current variable values to the solver as a MIP start.
    pub fn set_warm_start(&mut self, enabled: bool) {
        self.warm_start = enabled;
    }

    /// Filter solutions through `filter`: a solution whose integer
    /// assignment was already explored is not loaded into the model, and
    /// every accepted assignment is recorded.
    pub fn set_incumbent_filter(&mut self, filter: Option<IncumbentTabuList>) {
        self.incumbents = filter;
    }

    pub fn incumbent_filter(&self) -> Option<&IncumbentTabuList> {
        self.incumbents.as_ref()
    }

    fn ensure_instance(&self) -> SolverResult<()> {
        if self.has_instance {
            Ok(())
        } else {
            Err(SolverError::NoInstance(self.backend.name().to_string()))
        }
    }

    /// Rebuild the task from scratch for `model`.
    pub fn set_instance(&mut self, model: &Model) -> SolverResult<()> {
        self.task = LpTask::default();
        self.symbol_map = SymbolMap::new();
        self.var_ndx.clear();
        self.ndx_count = 0;
        self.referenced.clear();
        self.con_vars.clear();
        self.sos_vars.clear();
        self.objective = None;
        self.obj_vars.clear();
        self.task.name = model.name().to_string();
        self.has_instance = true;

        for (v, _) in model.vars() {
            self.add_var(model, v)?;
        }
        for (id, _) in model.active_constraints() {
            self.add_constraint(model, id)?;
        }
        self.set_objective(model)?;
        info!(
            model = %self.task.name,
            columns = self.task.columns.len(),
            rows = self.task.num_rows(),
            "persistent instance set"
        );
        Ok(())
    }

    pub fn add_var(&mut self, model: &Model, v: Var) -> SolverResult<()> {
        self.ensure_instance()?;
        if self.var_ndx.contains_key(&v) {
            return Err(SolverError::Persistent(format!(
                "Variable {} has already been added",
                model.var_name(v)
            )));
        }
        let symbol = self.symbol_map.get_symbol(model, v, &mut self.labeler)?;
        self.task.columns.push(column_for(model, v, symbol));
        self.var_ndx.insert(v, self.ndx_count);
        self.ndx_count += 1;
        self.referenced.insert(v, 0);
        Ok(())
    }

    /// Solver symbol of an added variable.
    fn var_symbol(&self, model: &Model, v: Var) -> SolverResult<String> {
        self.symbol_map.symbol(v).map(str::to_string).ok_or_else(|| {
            SolverError::Persistent(format!(
                "Variable {} needs to be added first",
                model.var_name(v)
            ))
        })
    }

    fn terms(
        &self,
        model: &Model,
        repn: &StandardRepn,
    ) -> SolverResult<(Vec<(String, f64)>, Vec<(String, String, f64)>)> {
        let linear = repn
            .linear
            .iter()
            .map(|(v, c)| Ok((self.var_symbol(model, *v)?, *c)))
            .collect::<SolverResult<Vec<_>>>()?;
        let quadratic = repn
            .quadratic
            .iter()
            .map(|((a, b), q)| Ok((self.var_symbol(model, *a)?, self.var_symbol(model, *b)?, *q)))
            .collect::<SolverResult<Vec<_>>>()?;
        Ok((linear, quadratic))
    }

    fn reference(&mut self, vars: &[Var]) {
        for v in vars {
            *self.referenced.entry(*v).or_insert(0) += 1;
        }
    }

    fn dereference(&mut self, vars: &[Var]) {
        for v in vars {
            if let Some(count) = self.referenced.get_mut(v) {
                *count = count.saturating_sub(1);
            }
        }
    }

    pub fn add_constraint(&mut self, model: &Model, id: ConstraintId) -> SolverResult<()> {
        self.ensure_instance()?;
        if self.con_vars.contains_key(&id) {
            return Err(SolverError::Persistent(format!(
                "Constraint {} has already been added",
                model.constraint(id)?.name
            )));
        }
        let data = model.constraint(id)?;
        let repn = lower_repn(model, &data.body);
        if repn.is_nonlinear() {
            return Err(format_error(&data.name, &repn));
        }
        if repn.is_constant() {
            debug!(constraint = %data.name, "constraint without variables has no rows");
            self.task.linear_rows.push((id, Vec::new()));
            self.con_vars.insert(id, Vec::new());
            return Ok(());
        }
        let (linear, quadratic) = self.terms(model, &repn)?;
        let symbol = self.symbol_map.get_symbol(model, id, &mut self.labeler)?;
        let is_quadratic = !quadratic.is_empty();
        let rows = rows_for(
            &symbol,
            linear,
            quadratic,
            data.lower.map(|l| l - repn.constant),
            data.upper.map(|u| u - repn.constant),
        );
        if is_quadratic {
            self.task.quadratic_rows.push((id, rows));
        } else {
            self.task.linear_rows.push((id, rows));
        }
        let vars = repn.variables();
        self.reference(&vars);
        self.con_vars.insert(id, vars);
        debug!(constraint = %symbol, quadratic = is_quadratic, "added constraint");
        Ok(())
    }

    /// Add a special ordered set over `members` with their weights.
    pub fn add_sos_constraint(
        &mut self,
        model: &Model,
        name: &str,
        level: u8,
        members: &[(Var, f64)],
    ) -> SolverResult<()> {
        self.ensure_instance()?;
        if !(1..=2).contains(&level) {
            return Err(SolverError::Persistent(format!(
                "Unsupported SOS level {} for {}",
                level, name
            )));
        }
        if self.sos_vars.contains_key(name) {
            return Err(SolverError::Persistent(format!(
                "SOS constraint {} has already been added",
                name
            )));
        }
        let named = members
            .iter()
            .map(|(v, w)| Ok((self.var_symbol(model, *v)?, *w)))
            .collect::<SolverResult<Vec<_>>>()?;
        self.task.sos.push(LpSos {
            name: name.to_string(),
            level,
            members: named,
        });
        let vars: Vec<Var> = members.iter().map(|(v, _)| *v).collect();
        self.reference(&vars);
        self.sos_vars.insert(name.to_string(), vars);
        Ok(())
    }

    pub fn remove_sos_constraint(&mut self, name: &str) -> SolverResult<()> {
        let vars = self.sos_vars.remove(name).ok_or_else(|| {
            SolverError::Persistent(format!("Failed to find the SOS constraint {}", name))
        })?;
        self.task.sos.retain(|s| s.name != name);
        self.dereference(&vars);
        Ok(())
    }

    /// Remove a constraint from the task, looking in the linear rows first
    /// and the quadratic rows second.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> SolverResult<()> {
        if let Some(pos) = self.task.linear_rows.iter().position(|(c, _)| *c == id) {
            self.task.linear_rows.remove(pos);
        } else if let Some(pos) = self.task.quadratic_rows.iter().position(|(c, _)| *c == id) {
            self.task.quadratic_rows.remove(pos);
        } else {
            return Err(SolverError::Persistent(format!(
                "Failed to find the constraint {}",
                self.symbol_map
                    .symbol(id)
                    .map(str::to_string)
                    .unwrap_or_else(|| id.to_string())
            )));
        }
        if let Some(vars) = self.con_vars.remove(&id) {
            self.dereference(&vars);
        }
        self.symbol_map.remove(id);
        Ok(())
    }

    /// Remove an unreferenced variable; column indices above it shift down.
    pub fn remove_var(&mut self, model: &Model, v: Var) -> SolverResult<()> {
        let ndx = self.var_ndx.get(&v).copied().ok_or_else(|| {
            SolverError::Persistent(format!(
                "Variable {} has not been added",
                model.var_name(v)
            ))
        })?;
        let refs = self.reference_count(v);
        if refs > 0 {
            return Err(SolverError::Persistent(format!(
                "Cannot remove variable {} because it is still referenced by {} components",
                model.var_name(v),
                refs
            )));
        }
        self.task.columns.remove(ndx);
        self.var_ndx.remove(&v);
        for other in self.var_ndx.values_mut() {
            if *other > ndx {
                *other -= 1;
            }
        }
        self.ndx_count -= 1;
        self.referenced.remove(&v);
        self.symbol_map.remove(v);
        Ok(())
    }

    /// Push new bounds, fixing and domain of `v` to the task.
    pub fn update_var(&mut self, model: &Model, v: Var) -> SolverResult<()> {
        let ndx = self.var_ndx.get(&v).copied().ok_or_else(|| {
            SolverError::Persistent(format!(
                "The variable provided to update_var needs to be added first: {}",
                model.var_name(v)
            ))
        })?;
        let symbol = self.var_symbol(model, v)?;
        self.task.columns[ndx] = column_for(model, v, symbol);
        Ok(())
    }

    /// Replace the task objective with the active objective of `model`.
    pub fn set_objective(&mut self, model: &Model) -> SolverResult<()> {
        self.ensure_instance()?;
        let (id, objective) = model.active_objective()?;
        let repn = lower_repn(model, &objective.expr);
        if repn.is_nonlinear() {
            return Err(format_error(&objective.name, &repn));
        }
        let (linear, quadratic) = self.terms(model, &repn)?;

        if let Some(old) = self.objective.take() {
            self.symbol_map.remove(ComponentRef::Objective(old));
        }
        let old_vars = std::mem::take(&mut self.obj_vars);
        self.dereference(&old_vars);

        self.task.objective_name =
            self.symbol_map
                .get_symbol(model, ComponentRef::Objective(id), &mut self.labeler)?;
        self.task.sense = objective.sense;
        self.task.objective_linear = linear;
        self.task.objective_quadratic = quadratic;
        self.task.objective_constant = repn.constant;
        self.obj_vars = repn.variables();
        let vars = self.obj_vars.clone();
        self.reference(&vars);
        self.objective = Some(id);
        Ok(())
    }

    /// Add `v` as a new column with objective coefficient `obj_coef` and
    /// coefficients in existing constraints. The model's objective and
    /// constraint bodies are extended to match.
    pub fn add_column(
        &mut self,
        model: &mut Model,
        v: Var,
        obj_coef: f64,
        constraints: &[ConstraintId],
        coefficients: &[f64],
    ) -> SolverResult<()> {
        self.ensure_instance()?;
        if constraints.len() != coefficients.len() {
            return Err(ModelError::InvalidArgument(format!(
                "{} constraints but {} coefficients",
                constraints.len(),
                coefficients.len()
            ))
            .into());
        }
        let objective = self.objective.ok_or(ModelError::NoObjective)?;
        for id in constraints {
            if !self.con_vars.contains_key(id) {
                return Err(SolverError::Persistent(format!(
                    "Constraint {} needs to be added first",
                    model.constraint(*id)?.name
                )));
            }
        }

        self.add_var(model, v)?;
        let symbol = self.var_symbol(model, v)?;

        if obj_coef != 0.0 {
            self.task.objective_linear.push((symbol.clone(), obj_coef));
            self.obj_vars.push(v);
            let expr = &mut model.objective_mut(objective).expr;
            *expr = std::mem::take(expr) + obj_coef * v;
        }

        for (id, coef) in constraints.iter().zip(coefficients) {
            let rows = self
                .task
                .linear_rows
                .iter_mut()
                .chain(self.task.quadratic_rows.iter_mut())
                .find(|(c, _)| c == id)
                .map(|(_, rows)| rows);
            if let Some(rows) = rows {
                for row in rows.iter_mut() {
                    row.linear.push((symbol.clone(), *coef));
                }
            }
            if let Some(vars) = self.con_vars.get_mut(id) {
                vars.push(v);
            }
            let body = &mut model.constraint_mut(*id)?.body;
            *body = std::mem::take(body) + *coef * Expr::from(v);
        }
        self.referenced
            .insert(v, coefficients.len() + usize::from(obj_coef != 0.0));
        debug!(column = %symbol, rows = coefficients.len(), "added column");
        Ok(())
    }

    /// Write the current task as an LP file.
    pub fn write(&self, path: &Path) -> SolverResult<()> {
        self.ensure_instance()?;
        self.task.to_problem().write_file(path)
    }

    fn warm_start_values(&self, model: &Model) -> Vec<(String, f64)> {
        let mut values: Vec<(usize, String, f64)> = self
            .var_ndx
            .iter()
            .filter_map(|(v, ndx)| {
                let value = model.var(*v).value?;
                let symbol = self.symbol_map.symbol(*v)?;
                Some((*ndx, symbol.to_string(), value))
            })
            .collect();
        values.sort_by_key(|(ndx, _, _)| *ndx);
        values.into_iter().map(|(_, s, v)| (s, v)).collect()
    }

    /// Solve the task with the backend and load the values into `model`.
    pub fn solve(&mut self, model: &mut Model) -> SolverResult<SolverResults> {
        self.ensure_instance()?;
        let warm_start = if self.warm_start {
            self.warm_start_values(model)
        } else {
            Vec::new()
        };
        let problem = self.task.to_problem();
        let mut results = self.backend.solve_problem_blocking(&problem, &warm_start)?;
        if self.accept_incumbent(&mut results) {
            SystemCallSolver::load(&results, model, &self.symbol_map);
        }
        Ok(results)
    }

    /// Values of the integer columns in column order, if all are present.
    fn discrete_values(&self, results: &SolverResults) -> Option<Vec<f64>> {
        self.task
            .columns
            .iter()
            .filter(|c| c.kind != ColumnKind::Continuous)
            .map(|c| results.values.get(&c.name).copied())
            .collect()
    }

    fn accept_incumbent(&mut self, results: &mut SolverResults) -> bool {
        if self.incumbents.is_none() || !results.termination.has_solution() {
            return true;
        }
        let Some(values) = self.discrete_values(results) else {
            return true;
        };
        let Some(filter) = self.incumbents.as_mut() else {
            return true;
        };
        if filter.reject(&values) {
            warn!(solver = self.backend.name(), "incumbent rejected by tabu list");
            results.message = Some("incumbent rejected: integer assignment already explored".into());
            false
        } else {
            filter.record(&values);
            true
        }
    }
}
