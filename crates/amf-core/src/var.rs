//! Decision variables.

use crate::set::Index;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Optional `(lower, upper)` bounds. `None` means unbounded on that side.
pub type Bounds = (Option<f64>, Option<f64>);

/// Handle to a variable owned by a [`crate::Model`].
///
/// Handles are dense ids; they stay valid for the lifetime of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Var(pub(crate) usize);

impl Var {
    pub fn id(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Value domain of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    #[default]
    Reals,
    NonNegativeReals,
    NonPositiveReals,
    Integers,
    NonNegativeIntegers,
    Binary,
}

impl Domain {
    /// Bounds implied by the domain itself.
    pub fn bounds(&self) -> Bounds {
        match self {
            Domain::Reals | Domain::Integers => (None, None),
            Domain::NonNegativeReals | Domain::NonNegativeIntegers => (Some(0.0), None),
            Domain::NonPositiveReals => (None, Some(0.0)),
            Domain::Binary => (Some(0.0), Some(1.0)),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Domain::Integers | Domain::NonNegativeIntegers | Domain::Binary
        )
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Domain::Reals => "Reals",
            Domain::NonNegativeReals => "NonNegativeReals",
            Domain::NonPositiveReals => "NonPositiveReals",
            Domain::Integers => "Integers",
            Domain::NonNegativeIntegers => "NonNegativeIntegers",
            Domain::Binary => "Binary",
        };
        write!(f, "{}", s)
    }
}

/// Data of a single (scalar or indexed-element) variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarData {
    /// Fully qualified name, e.g. `y[3,4]`.
    pub name: String,
    /// Name of the owning component, e.g. `y`.
    pub component: String,
    pub index: Index,
    pub domain: Domain,
    pub lb: Option<f64>,
    pub ub: Option<f64>,
    pub value: Option<f64>,
    pub fixed: bool,
}

impl VarData {
    pub fn new(component: &str, index: Index, domain: Domain, (lb, ub): Bounds) -> Self {
        Self {
            name: index.qualify(component),
            component: component.to_string(),
            index,
            domain,
            lb,
            ub,
            value: None,
            fixed: false,
        }
    }

    /// Declared bounds intersected with the domain bounds.
    pub fn effective_bounds(&self) -> Bounds {
        let (dlb, dub) = self.domain.bounds();
        let lb = match (self.lb, dlb) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let ub = match (self.ub, dub) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        (lb, ub)
    }

    pub fn fix(&mut self, value: f64) {
        self.value = Some(value);
        self.fixed = true;
    }

    pub fn unfix(&mut self) {
        self.fixed = false;
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = Some(value);
    }

    pub fn set_bounds(&mut self, (lb, ub): Bounds) {
        self.lb = lb;
        self.ub = ub;
    }

    pub fn set_domain(&mut self, domain: Domain) {
        self.domain = domain;
    }

    pub fn is_integer(&self) -> bool {
        self.domain.is_integer()
    }

    /// Binary domain, or an integer domain restricted to `[0, 1]`.
    pub fn is_binary(&self) -> bool {
        if self.domain == Domain::Binary {
            return true;
        }
        self.is_integer() && self.effective_bounds() == (Some(0.0), Some(1.0))
    }

    pub fn is_continuous(&self) -> bool {
        !self.is_integer()
    }
}

/// All elements of an indexed variable component.
#[derive(Debug, Clone, Default)]
pub struct IndexedVar {
    name: String,
    entries: BTreeMap<Index, Var>,
}

impl IndexedVar {
    pub(crate) fn new(name: &str, entries: BTreeMap<Index, Var>) -> Self {
        Self {
            name: name.to_string(),
            entries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, index: impl Into<Index>) -> Option<Var> {
        self.entries.get(&index.into()).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Elements in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&Index, Var)> {
        let mut elements: Vec<(&Index, Var)> = self.entries.iter().map(|(k, v)| (k, *v)).collect();
        elements.sort_by_key(|(_, v)| *v);
        elements.into_iter()
    }

    pub fn vars(&self) -> impl Iterator<Item = Var> {
        let mut vars: Vec<Var> = self.entries.values().copied().collect();
        vars.sort_unstable();
        vars.into_iter()
    }
}

impl<I: Into<Index>> std::ops::Index<I> for IndexedVar {
    type Output = Var;

    fn index(&self, index: I) -> &Var {
        let index = index.into();
        match self.entries.get(&index) {
            Some(v) => v,
            None => panic!("Index {} is not valid for component '{}'", index, self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_bounds_intersect_domain() {
        let v = VarData::new("x", Index::scalar(), Domain::NonNegativeReals, (Some(-3.0), Some(5.0)));
        assert_eq!(v.effective_bounds(), (Some(0.0), Some(5.0)));

        let b = VarData::new("b", Index::from(1), Domain::Binary, (None, None));
        assert_eq!(b.effective_bounds(), (Some(0.0), Some(1.0)));
        assert!(b.is_binary());
    }

    #[test]
    fn integer_in_unit_interval_is_binary() {
        let v = VarData::new("z", Index::scalar(), Domain::Integers, (Some(0.0), Some(1.0)));
        assert!(v.is_binary());
        let w = VarData::new("w", Index::scalar(), Domain::Integers, (Some(0.0), Some(2.0)));
        assert!(!w.is_binary());
    }

    #[test]
    fn fixing_sets_value() {
        let mut v = VarData::new("x", Index::scalar(), Domain::Reals, (None, None));
        v.fix(2.5);
        assert!(v.fixed);
        assert_eq!(v.value, Some(2.5));
        v.unfix();
        assert!(!v.fixed);
        assert_eq!(v.value, Some(2.5));
    }
}
