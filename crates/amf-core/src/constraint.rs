//! Constraints `lower <= body <= upper`.

use crate::expr::Expr;
use crate::set::Index;
use crate::var::Var;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Handle to a constraint owned by a [`crate::Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintId(pub(crate) usize);

impl ConstraintId {
    pub fn id(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A relational expression, not yet attached to a model.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub body: Expr,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Split the constant terms off the top level of `e`.
fn split_constant(e: Expr) -> (Expr, f64) {
    match e {
        Expr::Const(c) => (Expr::Const(0.0), c),
        Expr::Sum(terms) => {
            let mut constant = 0.0;
            let mut rest = Vec::with_capacity(terms.len());
            for t in terms {
                match t {
                    Expr::Const(c) => constant += c,
                    other => rest.push(other),
                }
            }
            let body = match rest.len() {
                0 => Expr::Const(0.0),
                1 => rest.remove(0),
                _ => Expr::Sum(rest),
            };
            (body, constant)
        }
        other => (other, 0.0),
    }
}

impl Relation {
    /// `lhs - rhs <= 0`, constants moved to the bound.
    pub fn leq(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        let (body, c) = split_constant(lhs.into() - rhs.into());
        Self {
            body,
            lower: None,
            upper: Some(0.0 - c),
        }
    }

    pub fn geq(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        let (body, c) = split_constant(lhs.into() - rhs.into());
        Self {
            body,
            lower: Some(0.0 - c),
            upper: None,
        }
    }

    pub fn equals(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        let (body, c) = split_constant(lhs.into() - rhs.into());
        Self {
            body,
            lower: Some(0.0 - c),
            upper: Some(0.0 - c),
        }
    }

    /// `lower <= body <= upper`.
    pub fn ranged(lower: Option<f64>, body: impl Into<Expr>, upper: Option<f64>) -> Self {
        let (body, c) = split_constant(body.into());
        Self {
            body,
            lower: lower.map(|l| l - c),
            upper: upper.map(|u| u - c),
        }
    }
}

impl Expr {
    pub fn leq(self, rhs: impl Into<Expr>) -> Relation {
        Relation::leq(self, rhs)
    }

    pub fn geq(self, rhs: impl Into<Expr>) -> Relation {
        Relation::geq(self, rhs)
    }

    pub fn equals(self, rhs: impl Into<Expr>) -> Relation {
        Relation::equals(self, rhs)
    }
}

impl Var {
    pub fn leq(self, rhs: impl Into<Expr>) -> Relation {
        Relation::leq(self, rhs)
    }

    pub fn geq(self, rhs: impl Into<Expr>) -> Relation {
        Relation::geq(self, rhs)
    }

    pub fn equals(self, rhs: impl Into<Expr>) -> Relation {
        Relation::equals(self, rhs)
    }
}

/// Result of an indexed constraint rule for one index.
#[derive(Debug, Clone)]
pub enum ConstraintRule {
    Constraint(Relation),
    Skip,
}

impl From<Relation> for ConstraintRule {
    fn from(r: Relation) -> Self {
        ConstraintRule::Constraint(r)
    }
}

/// A constraint attached to a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintData {
    pub name: String,
    pub component: String,
    pub index: Index,
    pub body: Expr,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub active: bool,
}

impl ConstraintData {
    pub fn new(component: &str, index: Index, relation: Relation) -> Self {
        Self {
            name: index.qualify(component),
            component: component.to_string(),
            index,
            body: relation.body,
            lower: relation.lower,
            upper: relation.upper,
            active: true,
        }
    }

    pub fn is_equality(&self) -> bool {
        matches!((self.lower, self.upper), (Some(l), Some(u)) if l == u)
    }

    /// Both bounds present and distinct.
    pub fn is_ranged(&self) -> bool {
        matches!((self.lower, self.upper), (Some(l), Some(u)) if l != u)
    }

    pub fn has_lb(&self) -> bool {
        self.lower.is_some()
    }

    pub fn has_ub(&self) -> bool {
        self.upper.is_some()
    }

    /// Amount by which `value` (the body's value) violates the bounds.
    pub fn violation(&self, value: f64) -> f64 {
        let below = self.lower.map_or(0.0, |l| (l - value).max(0.0));
        let above = self.upper.map_or(0.0, |u| (value - u).max(0.0));
        below.max(above)
    }
}

/// All elements of an indexed constraint component.
#[derive(Debug, Clone, Default)]
pub struct IndexedConstraint {
    name: String,
    entries: BTreeMap<Index, ConstraintId>,
}

impl IndexedConstraint {
    pub(crate) fn new(name: &str, entries: BTreeMap<Index, ConstraintId>) -> Self {
        Self {
            name: name.to_string(),
            entries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, index: impl Into<Index>) -> Option<ConstraintId> {
        self.entries.get(&index.into()).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Constraint ids in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = ConstraintId> {
        let mut ids: Vec<ConstraintId> = self.entries.values().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
    }
}

impl<I: Into<Index>> std::ops::Index<I> for IndexedConstraint {
    type Output = ConstraintId;

    fn index(&self, index: I) -> &ConstraintId {
        let index = index.into();
        match self.entries.get(&index) {
            Some(c) => c,
            None => panic!("Index {} is not valid for component '{}'", index, self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_move_into_bounds() {
        let (x, y) = (Var(0), Var(1));
        let r = (x + y + 2.0).leq(10.0);
        assert_eq!(r.upper, Some(8.0));
        assert_eq!(r.lower, None);
        assert_eq!(r.body, x + y);

        let r = x.geq(y - 1.0);
        assert_eq!(r.lower, Some(-1.0));
    }

    #[test]
    fn equality_and_ranged() {
        let x = Var(0);
        let r = (2.0 * x).equals(4.0);
        let c = ConstraintData::new("e", Index::scalar(), r);
        assert!(c.is_equality());
        assert!(!c.is_ranged());

        let r = Relation::ranged(Some(1.0), x + 1.0, Some(3.0));
        assert_eq!((r.lower, r.upper), (Some(0.0), Some(2.0)));
        let c = ConstraintData::new("r", Index::from(2), r);
        assert!(c.is_ranged());
        assert_eq!(c.name, "r[2]");
    }

    #[test]
    fn violation_measures_distance() {
        let c = ConstraintData::new("c", Index::scalar(), Relation::ranged(Some(0.0), Var(0), Some(1.0)));
        assert_eq!(c.violation(0.5), 0.0);
        assert_eq!(c.violation(1.5), 0.5);
        assert_eq!(c.violation(-2.0), 2.0);
    }
}
