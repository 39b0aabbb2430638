//! The [`Model`] container and problem classification.

use crate::constraint::{ConstraintData, ConstraintId, ConstraintRule, IndexedConstraint, Relation};
use crate::error::{ModelError, ModelResult};
use crate::expr::{Expr, StandardRepn};
use crate::objective::{ObjectiveData, ObjectiveId, Sense};
use crate::set::Index;
use crate::var::{Bounds, Domain, IndexedVar, Var, VarData};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Problem class of the active part of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProblemClass {
    Lp,
    Milp,
    Qp,
    Miqp,
    Nlp,
    Minlp,
}

impl ProblemClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemClass::Lp => "LP",
            ProblemClass::Milp => "MILP",
            ProblemClass::Qp => "QP",
            ProblemClass::Miqp => "MIQP",
            ProblemClass::Nlp => "NLP",
            ProblemClass::Minlp => "MINLP",
        }
    }

    pub fn has_integers(&self) -> bool {
        matches!(self, ProblemClass::Milp | ProblemClass::Miqp | ProblemClass::Minlp)
    }

    pub fn is_nonlinear(&self) -> bool {
        matches!(self, ProblemClass::Nlp | ProblemClass::Minlp)
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, ProblemClass::Lp | ProblemClass::Milp)
    }
}

impl fmt::Display for ProblemClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProblemClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LP" => Ok(ProblemClass::Lp),
            "MILP" => Ok(ProblemClass::Milp),
            "QP" => Ok(ProblemClass::Qp),
            "MIQP" => Ok(ProblemClass::Miqp),
            "NLP" => Ok(ProblemClass::Nlp),
            "MINLP" => Ok(ProblemClass::Minlp),
            other => Err(format!("unknown problem class '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Component<H> {
    name: String,
    entries: Vec<(Index, H)>,
}

/// An optimization model: variables, constraints and objectives.
///
/// Component names are unique across all component kinds. Constraint ids
/// stay stable when other constraints are removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    name: String,
    vars: Vec<VarData>,
    constraints: Vec<Option<ConstraintData>>,
    objectives: Vec<ObjectiveData>,
    var_components: Vec<Component<Var>>,
    constraint_components: Vec<Component<ConstraintId>>,
}

impl Model {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn ensure_unique(&self, name: &str) -> ModelResult<()> {
        let taken = self.var_components.iter().any(|c| c.name == name)
            || self.constraint_components.iter().any(|c| c.name == name)
            || self.objectives.iter().any(|o| o.name == name);
        if taken {
            return Err(ModelError::DuplicateComponent(name.to_string()));
        }
        Ok(())
    }

    fn check_bounds(name: &str, (lb, ub): Bounds) -> ModelResult<()> {
        if let (Some(lower), Some(upper)) = (lb, ub) {
            if lower > upper {
                return Err(ModelError::InvalidBounds {
                    name: name.to_string(),
                    lower,
                    upper,
                });
            }
        }
        Ok(())
    }

    // ---- variables ----

    /// Declare a scalar variable.
    pub fn add_var(&mut self, name: &str, domain: Domain, bounds: Bounds) -> ModelResult<Var> {
        self.ensure_unique(name)?;
        Self::check_bounds(name, bounds)?;
        let v = Var(self.vars.len());
        self.vars.push(VarData::new(name, Index::scalar(), domain, bounds));
        self.var_components.push(Component {
            name: name.to_string(),
            entries: vec![(Index::scalar(), v)],
        });
        debug!(name, "added variable");
        Ok(v)
    }

    /// Declare one variable per index, optionally initialised to a value.
    pub fn add_indexed_var<I, K>(
        &mut self,
        name: &str,
        indices: I,
        domain: Domain,
        bounds: Bounds,
        initialize: Option<f64>,
    ) -> ModelResult<IndexedVar>
    where
        I: IntoIterator<Item = K>,
        K: Into<Index>,
    {
        self.ensure_unique(name)?;
        Self::check_bounds(name, bounds)?;
        let mut entries = BTreeMap::new();
        let mut declared = Vec::new();
        for index in indices {
            let index = index.into();
            if entries.contains_key(&index) {
                continue;
            }
            let v = Var(self.vars.len());
            let mut data = VarData::new(name, index.clone(), domain, bounds);
            data.value = initialize;
            self.vars.push(data);
            declared.push((index.clone(), v));
            entries.insert(index, v);
        }
        self.var_components.push(Component {
            name: name.to_string(),
            entries: declared,
        });
        debug!(name, count = entries.len(), "added indexed variable");
        Ok(IndexedVar::new(name, entries))
    }

    /// Data of a variable. Panics if `v` belongs to another model.
    pub fn var(&self, v: Var) -> &VarData {
        &self.vars[v.0]
    }

    pub fn var_mut(&mut self, v: Var) -> &mut VarData {
        &mut self.vars[v.0]
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn vars(&self) -> impl Iterator<Item = (Var, &VarData)> {
        self.vars.iter().enumerate().map(|(k, d)| (Var(k), d))
    }

    /// Look up a variable by its qualified name, e.g. `y[3,4]`.
    pub fn var_by_name(&self, name: &str) -> ModelResult<Var> {
        self.vars
            .iter()
            .position(|d| d.name == name)
            .map(Var)
            .ok_or_else(|| ModelError::UnknownComponent(name.to_string()))
    }

    /// Look up a variable component by name.
    pub fn indexed_var(&self, name: &str) -> ModelResult<IndexedVar> {
        let component = self
            .var_components
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ModelError::UnknownComponent(name.to_string()))?;
        Ok(IndexedVar::new(name, component.entries.iter().cloned().collect()))
    }

    /// Element of an indexed variable, erroring on an invalid index.
    pub fn var_at(&self, name: &str, index: impl Into<Index>) -> ModelResult<Var> {
        let index = index.into();
        self.indexed_var(name)?
            .get(&index)
            .ok_or_else(|| ModelError::InvalidIndex {
                name: name.to_string(),
                index: index.to_string(),
            })
    }

    pub fn fix(&mut self, v: Var, value: f64) {
        self.vars[v.0].fix(value);
    }

    pub fn unfix(&mut self, v: Var) {
        self.vars[v.0].unfix();
    }

    pub fn set_value(&mut self, v: Var, value: f64) {
        self.vars[v.0].set_value(value);
    }

    pub fn set_bounds(&mut self, v: Var, bounds: Bounds) -> ModelResult<()> {
        Self::check_bounds(&self.vars[v.0].name, bounds)?;
        self.vars[v.0].set_bounds(bounds);
        Ok(())
    }

    /// Current value of a variable.
    pub fn value(&self, v: Var) -> ModelResult<f64> {
        let data = &self.vars[v.0];
        data.value.ok_or_else(|| ModelError::NoValue(data.name.clone()))
    }

    /// Value of a fixed variable, `None` for free ones.
    pub fn fixed_value(&self, v: Var) -> Option<f64> {
        let data = &self.vars[v.0];
        if data.fixed {
            data.value
        } else {
            None
        }
    }

    /// Write solver values back into the variables.
    pub fn load_values<I>(&mut self, assignments: I)
    where
        I: IntoIterator<Item = (Var, f64)>,
    {
        let mut count = 0usize;
        for (v, value) in assignments {
            if let Some(data) = self.vars.get_mut(v.0) {
                data.value = Some(value);
                count += 1;
            }
        }
        debug!(model = %self.name, count, "loaded variable values");
    }

    // ---- constraints ----

    pub fn add_constraint(&mut self, name: &str, relation: Relation) -> ModelResult<ConstraintId> {
        self.ensure_unique(name)?;
        let id = self.push_constraint(ConstraintData::new(name, Index::scalar(), relation))?;
        self.constraint_components.push(Component {
            name: name.to_string(),
            entries: vec![(Index::scalar(), id)],
        });
        debug!(name, "added constraint");
        Ok(id)
    }

    /// Declare one constraint per index from `rule`; indices for which the
    /// rule returns [`ConstraintRule::Skip`] get no constraint.
    pub fn add_indexed_constraint<I, K, F>(
        &mut self,
        name: &str,
        indices: I,
        mut rule: F,
    ) -> ModelResult<IndexedConstraint>
    where
        I: IntoIterator<Item = K>,
        K: Into<Index>,
        F: FnMut(&Index) -> ConstraintRule,
    {
        self.ensure_unique(name)?;
        let mut entries = BTreeMap::new();
        let mut declared = Vec::new();
        for index in indices {
            let index = index.into();
            if entries.contains_key(&index) {
                continue;
            }
            match rule(&index) {
                ConstraintRule::Skip => continue,
                ConstraintRule::Constraint(relation) => {
                    let data = ConstraintData::new(name, index.clone(), relation);
                    let id = self.push_constraint(data)?;
                    declared.push((index.clone(), id));
                    entries.insert(index, id);
                }
            }
        }
        self.constraint_components.push(Component {
            name: name.to_string(),
            entries: declared,
        });
        debug!(name, count = entries.len(), "added indexed constraint");
        Ok(IndexedConstraint::new(name, entries))
    }

    fn push_constraint(&mut self, data: ConstraintData) -> ModelResult<ConstraintId> {
        if let (Some(lower), Some(upper)) = (data.lower, data.upper) {
            if lower > upper {
                return Err(ModelError::InvalidBounds {
                    name: data.name,
                    lower,
                    upper,
                });
            }
        }
        let id = ConstraintId(self.constraints.len());
        self.constraints.push(Some(data));
        Ok(id)
    }

    pub fn constraint(&self, id: ConstraintId) -> ModelResult<&ConstraintData> {
        self.constraints
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(ModelError::RemovedConstraint(id.0))
    }

    pub fn constraint_mut(&mut self, id: ConstraintId) -> ModelResult<&mut ConstraintData> {
        self.constraints
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(ModelError::RemovedConstraint(id.0))
    }

    /// Remove a constraint; its id is never reused.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> ModelResult<ConstraintData> {
        let data = self
            .constraints
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(ModelError::RemovedConstraint(id.0))?;
        for component in &mut self.constraint_components {
            component.entries.retain(|(_, c)| *c != id);
        }
        debug!(name = %data.name, "removed constraint");
        Ok(data)
    }

    pub fn activate_constraint(&mut self, id: ConstraintId) -> ModelResult<()> {
        self.constraint_mut(id)?.active = true;
        Ok(())
    }

    pub fn deactivate_constraint(&mut self, id: ConstraintId) -> ModelResult<()> {
        self.constraint_mut(id)?.active = false;
        Ok(())
    }

    /// Live constraints in declaration order.
    pub fn constraints(&self) -> impl Iterator<Item = (ConstraintId, &ConstraintData)> {
        self.constraints
            .iter()
            .enumerate()
            .filter_map(|(k, c)| c.as_ref().map(|c| (ConstraintId(k), c)))
    }

    pub fn active_constraints(&self) -> impl Iterator<Item = (ConstraintId, &ConstraintData)> {
        self.constraints().filter(|(_, c)| c.active)
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints().count()
    }

    pub fn constraint_by_name(&self, name: &str) -> ModelResult<ConstraintId> {
        self.constraints()
            .find(|(_, c)| c.name == name)
            .map(|(id, _)| id)
            .ok_or_else(|| ModelError::UnknownComponent(name.to_string()))
    }

    pub fn indexed_constraint(&self, name: &str) -> ModelResult<IndexedConstraint> {
        let component = self
            .constraint_components
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ModelError::UnknownComponent(name.to_string()))?;
        Ok(IndexedConstraint::new(
            name,
            component.entries.iter().cloned().collect(),
        ))
    }

    // ---- objectives ----

    /// Add an objective. It is active; other objectives are left as they are.
    pub fn set_objective(
        &mut self,
        name: &str,
        expr: impl Into<Expr>,
        sense: Sense,
    ) -> ModelResult<ObjectiveId> {
        self.ensure_unique(name)?;
        let id = ObjectiveId(self.objectives.len());
        self.objectives.push(ObjectiveData::new(name, expr.into(), sense));
        Ok(id)
    }

    pub fn objective(&self, id: ObjectiveId) -> &ObjectiveData {
        &self.objectives[id.0]
    }

    pub fn objective_mut(&mut self, id: ObjectiveId) -> &mut ObjectiveData {
        &mut self.objectives[id.0]
    }

    pub fn objectives(&self) -> impl Iterator<Item = (ObjectiveId, &ObjectiveData)> {
        self.objectives
            .iter()
            .enumerate()
            .map(|(k, o)| (ObjectiveId(k), o))
    }

    pub fn activate_objective(&mut self, id: ObjectiveId) {
        self.objectives[id.0].active = true;
    }

    pub fn deactivate_objective(&mut self, id: ObjectiveId) {
        self.objectives[id.0].active = false;
    }

    /// The single active objective.
    pub fn active_objective(&self) -> ModelResult<(ObjectiveId, &ObjectiveData)> {
        let mut active = self.objectives().filter(|(_, o)| o.active);
        let first = active.next().ok_or(ModelError::NoObjective)?;
        let extra = active.count();
        if extra > 0 {
            return Err(ModelError::MultipleObjectives(extra + 1));
        }
        Ok(first)
    }

    // ---- evaluation ----

    pub fn evaluate(&self, expr: &Expr) -> ModelResult<f64> {
        expr.evaluate(&|v: Var| self.value(v))
    }

    pub fn objective_value(&self) -> ModelResult<f64> {
        let (_, objective) = self.active_objective()?;
        self.evaluate(&objective.expr)
    }

    /// Standard representation with fixed variables substituted.
    pub fn repn(&self, expr: &Expr) -> StandardRepn {
        expr.standard_repn_with(&|v| self.fixed_value(v))
    }

    /// Largest bound violation over the active constraints at the current
    /// variable values.
    pub fn max_violation(&self) -> ModelResult<f64> {
        let mut worst = 0.0f64;
        for (_, c) in self.active_constraints() {
            worst = worst.max(c.violation(self.evaluate(&c.body)?));
        }
        Ok(worst)
    }

    /// Distinct variables referenced by the active objective and constraints.
    pub fn referenced_vars(&self) -> Vec<Var> {
        let mut seen = vec![false; self.vars.len()];
        let exprs = self
            .objectives
            .iter()
            .filter(|o| o.active)
            .map(|o| &o.expr)
            .chain(self.active_constraints().map(|(_, c)| &c.body));
        for e in exprs {
            for v in e.variables() {
                if let Some(flag) = seen.get_mut(v.0) {
                    *flag = true;
                }
            }
        }
        seen.iter()
            .enumerate()
            .filter(|(_, s)| **s)
            .map(|(k, _)| Var(k))
            .collect()
    }

    /// Classify the active part of the model.
    ///
    /// Fixed variables count as constants. Quadratic constraints classify
    /// as QP/MIQP since the LP file format carries them.
    pub fn problem_class(&self) -> ProblemClass {
        let mut degree = 1u8;
        let exprs = self
            .objectives
            .iter()
            .filter(|o| o.active)
            .map(|o| &o.expr)
            .chain(self.active_constraints().map(|(_, c)| &c.body));
        for e in exprs {
            let repn = self.repn(e);
            if repn.is_nonlinear() {
                degree = 3;
                break;
            }
            if !repn.quadratic.is_empty() {
                degree = 2;
            }
        }
        let integer = self
            .referenced_vars()
            .into_iter()
            .any(|v| self.vars[v.0].is_integer() && !self.vars[v.0].fixed);
        match (degree, integer) {
            (1, false) => ProblemClass::Lp,
            (1, true) => ProblemClass::Milp,
            (2, false) => ProblemClass::Qp,
            (2, true) => ProblemClass::Miqp,
            (_, false) => ProblemClass::Nlp,
            (_, true) => ProblemClass::Minlp,
        }
    }

    /// Human readable name of a variable.
    pub fn var_name(&self, v: Var) -> &str {
        &self.vars[v.0].name
    }

    pub fn expr_to_string(&self, expr: &Expr) -> String {
        expr.to_string_with(&|v| {
            self.vars
                .get(v.0)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| v.to_string())
        })
    }

    // ---- serialization ----

    pub fn to_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> ModelResult<Self> {
        let model: Model = serde_json::from_str(s)?;
        model.validate()?;
        Ok(model)
    }

    pub fn write_json(&self, path: &Path) -> ModelResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> ModelResult<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json(&s)
    }

    /// Reject deserialised models whose expressions reference unknown
    /// variables.
    fn validate(&self) -> ModelResult<()> {
        let exprs = self
            .objectives
            .iter()
            .map(|o| (&o.name, &o.expr))
            .chain(self.constraints().map(|(_, c)| (&c.name, &c.body)));
        for (name, e) in exprs {
            if let Some(v) = e.variables().into_iter().find(|v| v.0 >= self.vars.len()) {
                return Err(ModelError::InvalidArgument(format!(
                    "'{}' references unknown variable {}",
                    name, v
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let integer = self.vars.iter().filter(|v| v.is_integer()).count();
        let binary = self.vars.iter().filter(|v| v.is_binary()).count();
        let fixed = self.vars.iter().filter(|v| v.fixed).count();
        let active = self.active_constraints().count();
        writeln!(f, "Model '{}'", self.name)?;
        writeln!(
            f,
            "  Variables:   {} ({} integer, {} binary, {} fixed)",
            self.vars.len(),
            integer,
            binary,
            fixed
        )?;
        writeln!(
            f,
            "  Constraints: {} ({} active)",
            self.num_constraints(),
            active
        )?;
        writeln!(f, "  Objectives:  {}", self.objectives.len())?;
        write!(f, "  Class:       {}", self.problem_class())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::RangeSet;

    fn small_lp() -> (Model, Var, Var) {
        let mut m = Model::new("small");
        let x = m.add_var("x", Domain::NonNegativeReals, (None, Some(4.0))).unwrap();
        let y = m.add_var("y", Domain::NonNegativeReals, (None, None)).unwrap();
        m.add_constraint("c1", (x + y).leq(6.0)).unwrap();
        m.add_constraint("c2", (x - y).geq(-2.0)).unwrap();
        m.set_objective("obj", 3.0 * x + 2.0 * y, Sense::Maximize).unwrap();
        (m, x, y)
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let (mut m, x, _) = small_lp();
        let err = m.add_var("x", Domain::Reals, (None, None)).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateComponent(ref n) if n == "x"));
        assert!(m.add_constraint("obj", x.leq(1.0)).is_err());
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        let mut m = Model::new("b");
        let err = m.add_var("x", Domain::Reals, (Some(2.0), Some(1.0))).unwrap_err();
        assert!(matches!(err, ModelError::InvalidBounds { .. }));
    }

    #[test]
    fn indexed_vars_and_lookup() {
        let mut m = Model::new("idx");
        let s = RangeSet::new(1, 3);
        let x = m
            .add_indexed_var("x", &s, Domain::Reals, (Some(-1.0), Some(1.0)), Some(0.5))
            .unwrap();
        assert_eq!(x.len(), 3);
        assert_eq!(m.var(x[2]).name, "x[2]");
        assert_eq!(m.value(x[3]).unwrap(), 0.5);
        assert_eq!(m.var_by_name("x[1]").unwrap(), x[1]);
        let err = m.var_at("x", 7).unwrap_err();
        assert_eq!(err.to_string(), "Index [7] is not valid for component 'x'");
    }

    #[test]
    fn indexed_components_keep_declaration_order() {
        let mut m = Model::new("order");
        let x = m
            .add_indexed_var("x", vec![3i64, 1, 2, 1], Domain::Reals, (None, None), None)
            .unwrap();
        assert_eq!(x.len(), 3);
        let names: Vec<&str> = x.iter().map(|(_, v)| m.var_name(v)).collect();
        assert_eq!(names, vec!["x[3]", "x[1]", "x[2]"]);
        let again: Vec<Var> = m.indexed_var("x").unwrap().vars().collect();
        assert_eq!(again, x.vars().collect::<Vec<_>>());

        let c = m
            .add_indexed_constraint("c", vec![2i64, 3], |i| {
                let k = i.as_slice()[0];
                x[k].leq(1.0).into()
            })
            .unwrap();
        let bodies: Vec<String> = c
            .ids()
            .map(|id| m.constraint(id).unwrap().name.clone())
            .collect();
        assert_eq!(bodies, vec!["c[2]", "c[3]"]);
    }

    #[test]
    fn indexed_constraint_rule_can_skip() {
        let mut m = Model::new("skip");
        let x = m
            .add_indexed_var("x", RangeSet::new(0, 4), Domain::Reals, (None, None), None)
            .unwrap();
        let c = m
            .add_indexed_constraint("even", RangeSet::new(0, 4), |i| {
                let k = i.as_slice()[0];
                if k % 2 == 0 {
                    x[k].leq(k as f64).into()
                } else {
                    ConstraintRule::Skip
                }
            })
            .unwrap();
        assert_eq!(c.len(), 3);
        assert!(c.get(1).is_none());
        assert_eq!(m.constraint(c[4]).unwrap().upper, Some(4.0));
    }

    #[test]
    fn removed_constraints_keep_other_ids() {
        let (mut m, _, _) = small_lp();
        let c1 = m.constraint_by_name("c1").unwrap();
        let c2 = m.constraint_by_name("c2").unwrap();
        m.remove_constraint(c1).unwrap();
        assert!(matches!(m.constraint(c1), Err(ModelError::RemovedConstraint(_))));
        assert_eq!(m.constraint(c2).unwrap().name, "c2");
        assert!(m.remove_constraint(c1).is_err());
        assert_eq!(m.num_constraints(), 1);
    }

    #[test]
    fn problem_classes() {
        let (mut m, x, y) = small_lp();
        assert_eq!(m.problem_class(), ProblemClass::Lp);

        let z = m.add_var("z", Domain::Binary, (None, None)).unwrap();
        m.add_constraint("link", (x - 4.0 * z).leq(0.0)).unwrap();
        assert_eq!(m.problem_class(), ProblemClass::Milp);

        m.fix(z, 1.0);
        assert_eq!(m.problem_class(), ProblemClass::Lp);
        m.unfix(z);

        let q = m.add_constraint("q", (x * y).leq(3.0)).unwrap();
        assert_eq!(m.problem_class(), ProblemClass::Miqp);
        m.deactivate_constraint(q).unwrap();

        m.add_constraint("nl", (x + 1.0).log().geq(0.0)).unwrap();
        assert_eq!(m.problem_class(), ProblemClass::Minlp);
    }

    #[test]
    fn active_objective_must_be_unique() {
        let (mut m, x, _) = small_lp();
        let second = m.set_objective("obj2", x, Sense::Minimize).unwrap();
        assert!(matches!(m.active_objective(), Err(ModelError::MultipleObjectives(2))));
        m.deactivate_objective(second);
        assert_eq!(m.active_objective().unwrap().1.name, "obj");

        let empty = Model::new("empty");
        assert!(matches!(empty.active_objective(), Err(ModelError::NoObjective)));
    }

    #[test]
    fn evaluation_and_violation() {
        let (mut m, x, y) = small_lp();
        assert!(matches!(m.objective_value(), Err(ModelError::NoValue(ref n)) if n == "x"));
        m.load_values([(x, 4.0), (y, 2.0)]);
        assert_eq!(m.objective_value().unwrap(), 16.0);
        assert_eq!(m.max_violation().unwrap(), 0.0);
        m.set_value(y, 3.0);
        assert_eq!(m.max_violation().unwrap(), 1.0);
    }

    #[test]
    fn json_roundtrip_preserves_structure() {
        let (mut m, x, _) = small_lp();
        let c1 = m.constraint_by_name("c1").unwrap();
        m.remove_constraint(c1).unwrap();
        m.fix(x, 1.0);
        let back = Model::from_json(&m.to_json().unwrap()).unwrap();
        assert_eq!(back.num_vars(), 2);
        assert_eq!(back.num_constraints(), 1);
        assert!(back.var(x).fixed);
        assert_eq!(back.constraint_by_name("c2").unwrap(), m.constraint_by_name("c2").unwrap());
        assert_eq!(back.problem_class(), m.problem_class());
    }

    #[test]
    fn display_summarises() {
        let (m, _, _) = small_lp();
        let s = m.to_string();
        assert!(s.contains("Model 'small'"));
        assert!(s.contains("Constraints: 2 (2 active)"));
        assert!(s.contains("Class:       LP"));
    }
}
