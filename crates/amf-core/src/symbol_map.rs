//! Translation between model components and solver symbols.
//!
//! File based solvers cannot use names like `y[3,4]`; a [`Labeler`] turns
//! component names into legal identifiers and a [`SymbolMap`] remembers the
//! mapping so results can be mapped back.

use crate::constraint::ConstraintId;
use crate::error::{ModelError, ModelResult};
use crate::model::Model;
use crate::objective::ObjectiveId;
use crate::var::Var;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A model component that can carry a solver symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentRef {
    Var(Var),
    Constraint(ConstraintId),
    Objective(ObjectiveId),
}

impl ComponentRef {
    /// Name of the component in `model`.
    pub fn name(&self, model: &Model) -> ModelResult<String> {
        match self {
            ComponentRef::Var(v) => Ok(model.var_name(*v).to_string()),
            ComponentRef::Constraint(c) => Ok(model.constraint(*c)?.name.clone()),
            ComponentRef::Objective(o) => Ok(model.objective(*o).name.clone()),
        }
    }
}

impl From<Var> for ComponentRef {
    fn from(v: Var) -> Self {
        ComponentRef::Var(v)
    }
}

impl From<ConstraintId> for ComponentRef {
    fn from(c: ConstraintId) -> Self {
        ComponentRef::Constraint(c)
    }
}

impl From<ObjectiveId> for ComponentRef {
    fn from(o: ObjectiveId) -> Self {
        ComponentRef::Objective(o)
    }
}

/// Produces solver symbols for components.
pub trait Labeler {
    fn label(&mut self, component: ComponentRef, name: &str) -> String;
}

/// Keeps the component name, replacing characters LP files do not accept.
///
/// `x[1,2]` becomes `x(1_2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLabeler;

impl TextLabeler {
    pub fn sanitize(name: &str) -> String {
        name.chars()
            .map(|c| match c {
                '[' | '{' => '(',
                ']' | '}' => ')',
                c if c.is_ascii_alphanumeric() => c,
                '_' | '(' | ')' | '.' | '#' => c,
                _ => '_',
            })
            .collect()
    }
}

impl Labeler for TextLabeler {
    fn label(&mut self, _component: ComponentRef, name: &str) -> String {
        Self::sanitize(name)
    }
}

/// Sequential labels: `x1, x2, …` for variables, `c1, …` for constraints and
/// `o1, …` for objectives.
#[derive(Debug, Clone, Default)]
pub struct NumericLabeler {
    vars: usize,
    constraints: usize,
    objectives: usize,
}

impl NumericLabeler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Labeler for NumericLabeler {
    fn label(&mut self, component: ComponentRef, _name: &str) -> String {
        let (prefix, counter) = match component {
            ComponentRef::Var(_) => ("x", &mut self.vars),
            ComponentRef::Constraint(_) => ("c", &mut self.constraints),
            ComponentRef::Objective(_) => ("o", &mut self.objectives),
        };
        *counter += 1;
        format!("{}{}", prefix, counter)
    }
}

/// Bidirectional symbol ↔ component map.
#[derive(Debug, Clone, Default)]
pub struct SymbolMap {
    by_symbol: HashMap<String, ComponentRef>,
    by_component: HashMap<ComponentRef, String>,
}

impl SymbolMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symbol of `component`, assigning one with `labeler` on first use.
    pub fn get_symbol(
        &mut self,
        model: &Model,
        component: impl Into<ComponentRef>,
        labeler: &mut dyn Labeler,
    ) -> ModelResult<String> {
        let component = component.into();
        if let Some(symbol) = self.by_component.get(&component) {
            return Ok(symbol.clone());
        }
        let symbol = labeler.label(component, &component.name(model)?);
        self.add_symbol(component, symbol.clone())?;
        Ok(symbol)
    }

    /// Register an explicit symbol.
    pub fn add_symbol(&mut self, component: impl Into<ComponentRef>, symbol: String) -> ModelResult<()> {
        let component = component.into();
        if let Some(existing) = self.by_symbol.get(&symbol) {
            if *existing != component {
                return Err(ModelError::Symbol(format!(
                    "Symbol '{}' is already assigned to another component",
                    symbol
                )));
            }
            return Ok(());
        }
        if let Some(old) = self.by_component.insert(component, symbol.clone()) {
            self.by_symbol.remove(&old);
        }
        self.by_symbol.insert(symbol, component);
        Ok(())
    }

    pub fn symbol(&self, component: impl Into<ComponentRef>) -> Option<&str> {
        self.by_component.get(&component.into()).map(String::as_str)
    }

    pub fn component(&self, symbol: &str) -> Option<ComponentRef> {
        self.by_symbol.get(symbol).copied()
    }

    pub fn var(&self, symbol: &str) -> Option<Var> {
        match self.component(symbol)? {
            ComponentRef::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn remove(&mut self, component: impl Into<ComponentRef>) -> Option<String> {
        let symbol = self.by_component.remove(&component.into())?;
        self.by_symbol.remove(&symbol);
        Some(symbol)
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ComponentRef)> {
        self.by_symbol.iter().map(|(s, c)| (s.as_str(), *c))
    }
}
