//! Symbolic expression trees.
//!
//! Expressions are built with ordinary arithmetic operators on [`Var`],
//! [`Expr`] and `f64`:
//!
//! ```
//! use amf_core::{Domain, Model};
//!
//! let mut m = Model::new("demo");
//! let x = m.add_var("x", Domain::Reals, (None, None)).unwrap();
//! let y = m.add_var("y", Domain::Reals, (None, None)).unwrap();
//! let e = 10.0 * x.powi(2) - y + 5.0 * (y - 1.0);
//! assert_eq!(e.polynomial_degree(), Some(2));
//! ```
//!
//! [`Expr::standard_repn`] flattens a tree into the constant, linear and
//! quadratic coefficients that file writers and solver interfaces consume.

use crate::error::{ModelError, ModelResult};
use crate::var::Var;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Intrinsic functions of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryFunction {
    Log,
    Exp,
    Sqrt,
}

impl UnaryFunction {
    pub fn name(&self) -> &'static str {
        match self {
            UnaryFunction::Log => "log",
            UnaryFunction::Exp => "exp",
            UnaryFunction::Sqrt => "sqrt",
        }
    }

    fn apply(&self, x: f64) -> ModelResult<f64> {
        match self {
            UnaryFunction::Log if x <= 0.0 => Err(ModelError::Evaluation(format!(
                "log of non-positive value {}",
                x
            ))),
            UnaryFunction::Sqrt if x < 0.0 => Err(ModelError::Evaluation(format!(
                "sqrt of negative value {}",
                x
            ))),
            UnaryFunction::Log => Ok(x.ln()),
            UnaryFunction::Exp => Ok(x.exp()),
            UnaryFunction::Sqrt => Ok(x.sqrt()),
        }
    }
}

/// An expression tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Const(f64),
    Var(Var),
    Sum(Vec<Expr>),
    Product(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Func(UnaryFunction, Box<Expr>),
}

impl Default for Expr {
    fn default() -> Self {
        Expr::Const(0.0)
    }
}

impl From<f64> for Expr {
    fn from(c: f64) -> Self {
        Expr::Const(c)
    }
}

impl From<Var> for Expr {
    fn from(v: Var) -> Self {
        Expr::Var(v)
    }
}

impl From<&Expr> for Expr {
    fn from(e: &Expr) -> Self {
        e.clone()
    }
}

/// Integer powers of non-constant bases above this stay unexpanded and end
/// up in the nonlinear remainder.
const MAX_EXPANDED_POWER: f64 = 8.0;

/// Flattened polynomial form `constant + Σ aᵢxᵢ + Σ qᵢⱼxᵢxⱼ (+ nonlinear)`.
///
/// Quadratic keys are ordered so that `i <= j`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandardRepn {
    pub constant: f64,
    pub linear: BTreeMap<Var, f64>,
    pub quadratic: BTreeMap<(Var, Var), f64>,
    pub nonlinear: Option<Expr>,
}

impl StandardRepn {
    pub fn is_constant(&self) -> bool {
        self.linear.is_empty() && self.quadratic.is_empty() && self.nonlinear.is_none()
    }

    pub fn is_linear(&self) -> bool {
        self.quadratic.is_empty() && self.nonlinear.is_none()
    }

    pub fn is_quadratic(&self) -> bool {
        !self.quadratic.is_empty() && self.nonlinear.is_none()
    }

    pub fn is_nonlinear(&self) -> bool {
        self.nonlinear.is_some()
    }

    /// Variables with a non-zero linear or quadratic coefficient.
    pub fn variables(&self) -> Vec<Var> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let quad = self.quadratic.keys().flat_map(|&(a, b)| [a, b]);
        for v in self.linear.keys().copied().chain(quad) {
            if seen.insert(v) {
                out.push(v);
            }
        }
        out
    }
}

/// Monomial (sorted variable multiset) to coefficient.
type Poly = BTreeMap<Vec<Var>, f64>;

fn poly_const(c: f64) -> Poly {
    let mut p = Poly::new();
    if c != 0.0 {
        p.insert(Vec::new(), c);
    }
    p
}

fn poly_add_into(acc: &mut Poly, other: Poly, scale: f64) {
    for (mono, c) in other {
        *acc.entry(mono).or_insert(0.0) += scale * c;
    }
    acc.retain(|_, c| *c != 0.0);
}

fn poly_mul(a: &Poly, b: &Poly) -> Poly {
    let mut out = Poly::new();
    for (ma, ca) in a {
        for (mb, cb) in b {
            let mut mono = ma.clone();
            mono.extend_from_slice(mb);
            mono.sort();
            *out.entry(mono).or_insert(0.0) += ca * cb;
        }
    }
    out.retain(|_, c| *c != 0.0);
    out
}

fn poly_constant_value(p: &Poly) -> Option<f64> {
    match p.len() {
        0 => Some(0.0),
        1 => p.get(&Vec::new()).copied(),
        _ => None,
    }
}

fn monomial_expr(mono: &[Var], coef: f64) -> Expr {
    let mut e = Expr::Const(coef);
    for &v in mono {
        e = e * v;
    }
    e
}

impl Expr {
    pub fn constant(c: f64) -> Self {
        Expr::Const(c)
    }

    /// Sum of an iterator of terms.
    pub fn sum<I, T>(terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Expr>,
    {
        let terms: Vec<Expr> = terms.into_iter().map(Into::into).collect();
        match terms.len() {
            0 => Expr::Const(0.0),
            _ => Expr::Sum(terms),
        }
    }

    pub fn pow(self, exponent: impl Into<Expr>) -> Expr {
        Expr::Pow(Box::new(self), Box::new(exponent.into()))
    }

    pub fn powi(self, exponent: i32) -> Expr {
        self.pow(exponent as f64)
    }

    pub fn log(self) -> Expr {
        Expr::Func(UnaryFunction::Log, Box::new(self))
    }

    pub fn exp(self) -> Expr {
        Expr::Func(UnaryFunction::Exp, Box::new(self))
    }

    pub fn sqrt(self) -> Expr {
        Expr::Func(UnaryFunction::Sqrt, Box::new(self))
    }

    pub fn as_constant(&self) -> Option<f64> {
        match self {
            Expr::Const(c) => Some(*c),
            _ => None,
        }
    }

    /// Evaluate with a caller-supplied variable lookup.
    pub fn evaluate<F>(&self, value_of: &F) -> ModelResult<f64>
    where
        F: Fn(Var) -> ModelResult<f64>,
    {
        match self {
            Expr::Const(c) => Ok(*c),
            Expr::Var(v) => value_of(*v),
            Expr::Sum(terms) => terms.iter().try_fold(0.0, |acc, t| Ok(acc + t.evaluate(value_of)?)),
            Expr::Product(a, b) => Ok(a.evaluate(value_of)? * b.evaluate(value_of)?),
            Expr::Div(a, b) => {
                let den = b.evaluate(value_of)?;
                if den == 0.0 {
                    return Err(ModelError::Evaluation("division by zero".to_string()));
                }
                Ok(a.evaluate(value_of)? / den)
            }
            Expr::Neg(a) => Ok(-a.evaluate(value_of)?),
            Expr::Pow(a, b) => {
                let base = a.evaluate(value_of)?;
                let exponent = b.evaluate(value_of)?;
                let r = if exponent.fract() == 0.0 && exponent.abs() <= i32::MAX as f64 {
                    base.powi(exponent as i32)
                } else {
                    base.powf(exponent)
                };
                if r.is_nan() {
                    return Err(ModelError::Evaluation(format!(
                        "{} ** {} is undefined",
                        base, exponent
                    )));
                }
                Ok(r)
            }
            Expr::Func(f, a) => f.apply(a.evaluate(value_of)?),
        }
    }

    /// Degree of the expression as a polynomial, `None` if it is not one.
    pub fn polynomial_degree(&self) -> Option<u32> {
        match self {
            Expr::Const(_) => Some(0),
            Expr::Var(_) => Some(1),
            Expr::Sum(terms) => terms
                .iter()
                .map(Expr::polynomial_degree)
                .try_fold(0, |acc, d| d.map(|d| acc.max(d))),
            Expr::Product(a, b) => Some(a.polynomial_degree()? + b.polynomial_degree()?),
            Expr::Div(a, b) => match b.polynomial_degree()? {
                0 => a.polynomial_degree(),
                _ => None,
            },
            Expr::Neg(a) => a.polynomial_degree(),
            Expr::Pow(a, b) => {
                let base = a.polynomial_degree()?;
                if b.polynomial_degree()? != 0 {
                    return None;
                }
                if base == 0 {
                    return Some(0);
                }
                match b.as_constant() {
                    Some(n) if n >= 0.0 && n.fract() == 0.0 => Some(base.saturating_mul(n as u32)),
                    _ => None,
                }
            }
            Expr::Func(_, a) => match a.polynomial_degree()? {
                0 => Some(0),
                _ => None,
            },
        }
    }

    /// Variables referenced by the expression, in first-seen order.
    pub fn variables(&self) -> Vec<Var> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_vars(&mut seen, &mut out);
        out
    }

    fn collect_vars(&self, seen: &mut HashSet<Var>, out: &mut Vec<Var>) {
        match self {
            Expr::Const(_) => {}
            Expr::Var(v) => {
                if seen.insert(*v) {
                    out.push(*v);
                }
            }
            Expr::Sum(terms) => terms.iter().for_each(|t| t.collect_vars(seen, out)),
            Expr::Product(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
                a.collect_vars(seen, out);
                b.collect_vars(seen, out);
            }
            Expr::Neg(a) | Expr::Func(_, a) => a.collect_vars(seen, out),
        }
    }

    pub fn depends_on(&self, var: Var) -> bool {
        match self {
            Expr::Const(_) => false,
            Expr::Var(v) => *v == var,
            Expr::Sum(terms) => terms.iter().any(|t| t.depends_on(var)),
            Expr::Product(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
                a.depends_on(var) || b.depends_on(var)
            }
            Expr::Neg(a) | Expr::Func(_, a) => a.depends_on(var),
        }
    }

    /// Standard representation without substituting any variable.
    pub fn standard_repn(&self) -> StandardRepn {
        self.standard_repn_with(&|_| None)
    }

    /// Standard representation, replacing each variable for which `fixed`
    /// returns a value by that constant.
    pub fn standard_repn_with(&self, fixed: &dyn Fn(Var) -> Option<f64>) -> StandardRepn {
        let terms: Vec<&Expr> = match self {
            Expr::Sum(terms) => terms.iter().collect(),
            other => vec![other],
        };

        let mut poly = Poly::new();
        let mut nonlinear = Vec::new();
        for term in terms {
            match term.expand(fixed) {
                Some(p) => poly_add_into(&mut poly, p, 1.0),
                None => nonlinear.push(term.clone()),
            }
        }

        let mut repn = StandardRepn::default();
        for (mono, coef) in poly {
            match mono.as_slice() {
                [] => repn.constant += coef,
                [v] => {
                    repn.linear.insert(*v, coef);
                }
                [a, b] => {
                    repn.quadratic.insert((*a, *b), coef);
                }
                _ => nonlinear.push(monomial_expr(&mono, coef)),
            }
        }
        if !nonlinear.is_empty() {
            repn.nonlinear = Some(if nonlinear.len() == 1 {
                nonlinear.remove(0)
            } else {
                Expr::Sum(nonlinear)
            });
        }
        repn
    }

    /// Expand into a polynomial; `None` for non-polynomial subtrees.
    fn expand(&self, fixed: &dyn Fn(Var) -> Option<f64>) -> Option<Poly> {
        match self {
            Expr::Const(c) => Some(poly_const(*c)),
            Expr::Var(v) => match fixed(*v) {
                Some(value) => Some(poly_const(value)),
                None => {
                    let mut p = Poly::new();
                    p.insert(vec![*v], 1.0);
                    Some(p)
                }
            },
            Expr::Sum(terms) => {
                let mut acc = Poly::new();
                for t in terms {
                    poly_add_into(&mut acc, t.expand(fixed)?, 1.0);
                }
                Some(acc)
            }
            Expr::Product(a, b) => Some(poly_mul(&a.expand(fixed)?, &b.expand(fixed)?)),
            Expr::Div(a, b) => {
                let den = poly_constant_value(&b.expand(fixed)?)?;
                if den == 0.0 {
                    return None;
                }
                let mut acc = Poly::new();
                poly_add_into(&mut acc, a.expand(fixed)?, 1.0 / den);
                Some(acc)
            }
            Expr::Neg(a) => {
                let mut acc = Poly::new();
                poly_add_into(&mut acc, a.expand(fixed)?, -1.0);
                Some(acc)
            }
            Expr::Pow(a, b) => {
                let exponent = poly_constant_value(&b.expand(fixed)?)?;
                let base = a.expand(fixed)?;
                if let Some(c) = poly_constant_value(&base) {
                    return Some(poly_const(c.powf(exponent)));
                }
                if exponent < 0.0 || exponent.fract() != 0.0 || exponent > MAX_EXPANDED_POWER {
                    return None;
                }
                let mut acc = poly_const(1.0);
                for _ in 0..exponent as u32 {
                    acc = poly_mul(&acc, &base);
                }
                Some(acc)
            }
            Expr::Func(f, a) => {
                let c = poly_constant_value(&a.expand(fixed)?)?;
                f.apply(c).ok().map(poly_const)
            }
        }
    }

    /// Symbolic derivative with respect to `var`.
    pub fn differentiate(&self, var: Var) -> Expr {
        if !self.depends_on(var) {
            return Expr::Const(0.0);
        }
        match self {
            Expr::Const(_) => Expr::Const(0.0),
            Expr::Var(v) => Expr::Const(if *v == var { 1.0 } else { 0.0 }),
            Expr::Sum(terms) => {
                let parts: Vec<Expr> = terms
                    .iter()
                    .filter(|t| t.depends_on(var))
                    .map(|t| t.differentiate(var))
                    .collect();
                if parts.len() == 1 {
                    parts.into_iter().next().unwrap_or_default()
                } else {
                    Expr::Sum(parts)
                }
            }
            Expr::Product(a, b) => {
                let da = a.differentiate(var);
                let db = b.differentiate(var);
                mul(da, (**b).clone()) + mul((**a).clone(), db)
            }
            Expr::Div(a, b) => {
                let da = a.differentiate(var);
                if !b.depends_on(var) {
                    return da / (**b).clone();
                }
                let db = b.differentiate(var);
                (mul(da, (**b).clone()) - mul((**a).clone(), db)) / (**b).clone().powi(2)
            }
            Expr::Neg(a) => -a.differentiate(var),
            Expr::Pow(a, b) => {
                let da = a.differentiate(var);
                if !b.depends_on(var) {
                    let n = (**b).clone();
                    let reduced = match n.as_constant() {
                        Some(c) if c == 1.0 => return da,
                        Some(c) if c == 2.0 => (**a).clone(),
                        Some(c) => (**a).clone().pow(c - 1.0),
                        None => (**a).clone().pow(n.clone() - 1.0),
                    };
                    return mul(mul(n, reduced), da);
                }
                let db = b.differentiate(var);
                let log_a = (**a).clone().log();
                let inner = mul(db, log_a) + mul((**b).clone(), da) / (**a).clone();
                mul(self.clone(), inner)
            }
            Expr::Func(f, a) => {
                let da = a.differentiate(var);
                match f {
                    UnaryFunction::Log => da / (**a).clone(),
                    UnaryFunction::Exp => mul(self.clone(), da),
                    UnaryFunction::Sqrt => da / (2.0 * self.clone()),
                }
            }
        }
    }

    /// Render with caller-supplied variable names.
    pub fn to_string_with(&self, name_of: &dyn Fn(Var) -> String) -> String {
        match self {
            Expr::Const(c) => format!("{}", c),
            Expr::Var(v) => name_of(*v),
            Expr::Sum(terms) => {
                let mut s = String::new();
                for (k, t) in terms.iter().enumerate() {
                    match t {
                        Expr::Neg(inner) if k > 0 => {
                            s.push_str(" - ");
                            s.push_str(&inner.to_string_with(name_of));
                        }
                        Expr::Const(c) if k > 0 && *c < 0.0 => {
                            s.push_str(&format!(" - {}", -c));
                        }
                        _ => {
                            if k > 0 {
                                s.push_str(" + ");
                            }
                            s.push_str(&t.to_string_with(name_of));
                        }
                    }
                }
                s
            }
            Expr::Product(a, b) => format!("{}*{}", a.wrapped(name_of), b.wrapped(name_of)),
            Expr::Div(a, b) => format!("{}/{}", a.wrapped(name_of), b.wrapped(name_of)),
            Expr::Neg(a) => format!("- {}", a.wrapped(name_of)),
            Expr::Pow(a, b) => format!("{}**{}", a.wrapped(name_of), b.wrapped(name_of)),
            Expr::Func(f, a) => format!("{}({})", f.name(), a.to_string_with(name_of)),
        }
    }

    fn wrapped(&self, name_of: &dyn Fn(Var) -> String) -> String {
        match self {
            Expr::Sum(_) | Expr::Neg(_) => format!("({})", self.to_string_with(name_of)),
            Expr::Const(c) if *c < 0.0 => format!("({})", c),
            _ => self.to_string_with(name_of),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_with(&|v| v.to_string()))
    }
}

/// Product with constant folding, used by the differentiator.
fn mul(a: Expr, b: Expr) -> Expr {
    match (a.as_constant(), b.as_constant()) {
        (Some(x), Some(y)) => Expr::Const(x * y),
        (Some(x), _) if x == 0.0 => Expr::Const(0.0),
        (_, Some(y)) if y == 0.0 => Expr::Const(0.0),
        (Some(x), _) if x == 1.0 => b,
        (_, Some(y)) if y == 1.0 => a,
        _ => Expr::Product(Box::new(a), Box::new(b)),
    }
}

fn negate(e: Expr) -> Expr {
    match e {
        Expr::Const(c) => Expr::Const(-c),
        Expr::Neg(inner) => *inner,
        Expr::Sum(terms) => Expr::Sum(terms.into_iter().map(negate).collect()),
        other => Expr::Neg(Box::new(other)),
    }
}

fn add(lhs: Expr, rhs: Expr) -> Expr {
    let mut terms = match lhs {
        Expr::Sum(terms) => terms,
        Expr::Const(c) if c == 0.0 => Vec::new(),
        other => vec![other],
    };
    match rhs {
        Expr::Sum(more) => terms.extend(more),
        Expr::Const(c) if c == 0.0 && !terms.is_empty() => {}
        other => terms.push(other),
    }
    match terms.len() {
        0 => Expr::Const(0.0),
        1 => terms.remove(0),
        _ => Expr::Sum(terms),
    }
}

impl<R: Into<Expr>> Add<R> for Expr {
    type Output = Expr;
    fn add(self, rhs: R) -> Expr {
        add(self, rhs.into())
    }
}

impl<R: Into<Expr>> Sub<R> for Expr {
    type Output = Expr;
    fn sub(self, rhs: R) -> Expr {
        add(self, negate(rhs.into()))
    }
}

impl<R: Into<Expr>> Mul<R> for Expr {
    type Output = Expr;
    fn mul(self, rhs: R) -> Expr {
        let rhs = rhs.into();
        match (self.as_constant(), rhs.as_constant()) {
            (Some(a), Some(b)) => Expr::Const(a * b),
            _ => Expr::Product(Box::new(self), Box::new(rhs)),
        }
    }
}

impl<R: Into<Expr>> Div<R> for Expr {
    type Output = Expr;
    fn div(self, rhs: R) -> Expr {
        Expr::Div(Box::new(self), Box::new(rhs.into()))
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        negate(self)
    }
}

impl<R: Into<Expr>> AddAssign<R> for Expr {
    fn add_assign(&mut self, rhs: R) {
        let lhs = std::mem::take(self);
        *self = add(lhs, rhs.into());
    }
}

impl<R: Into<Expr>> SubAssign<R> for Expr {
    fn sub_assign(&mut self, rhs: R) {
        let lhs = std::mem::take(self);
        *self = add(lhs, negate(rhs.into()));
    }
}

impl<R: Into<Expr>> Add<R> for Var {
    type Output = Expr;
    fn add(self, rhs: R) -> Expr {
        Expr::Var(self) + rhs
    }
}

impl<R: Into<Expr>> Sub<R> for Var {
    type Output = Expr;
    fn sub(self, rhs: R) -> Expr {
        Expr::Var(self) - rhs
    }
}

impl<R: Into<Expr>> Mul<R> for Var {
    type Output = Expr;
    fn mul(self, rhs: R) -> Expr {
        Expr::Var(self) * rhs
    }
}

impl<R: Into<Expr>> Div<R> for Var {
    type Output = Expr;
    fn div(self, rhs: R) -> Expr {
        Expr::Var(self) / rhs
    }
}

impl Neg for Var {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Neg(Box::new(Expr::Var(self)))
    }
}

macro_rules! scalar_lhs_ops {
    ($($rhs:ty),*) => {$(
        impl Add<$rhs> for f64 {
            type Output = Expr;
            fn add(self, rhs: $rhs) -> Expr {
                Expr::Const(self) + rhs
            }
        }

        impl Sub<$rhs> for f64 {
            type Output = Expr;
            fn sub(self, rhs: $rhs) -> Expr {
                Expr::Const(self) - rhs
            }
        }

        impl Mul<$rhs> for f64 {
            type Output = Expr;
            fn mul(self, rhs: $rhs) -> Expr {
                Expr::Const(self) * rhs
            }
        }

        impl Div<$rhs> for f64 {
            type Output = Expr;
            fn div(self, rhs: $rhs) -> Expr {
                Expr::Const(self) / rhs
            }
        }
    )*};
}

scalar_lhs_ops!(Expr, Var);

impl Var {
    pub fn pow(self, exponent: impl Into<Expr>) -> Expr {
        Expr::Var(self).pow(exponent)
    }

    pub fn powi(self, exponent: i32) -> Expr {
        Expr::Var(self).powi(exponent)
    }

    pub fn log(self) -> Expr {
        Expr::Var(self).log()
    }

    pub fn exp(self) -> Expr {
        Expr::Var(self).exp()
    }

    pub fn sqrt(self) -> Expr {
        Expr::Var(self).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> (Var, Var, Var) {
        (Var(0), Var(1), Var(2))
    }

    fn lookup(values: &[f64]) -> impl Fn(Var) -> ModelResult<f64> + '_ {
        move |v: Var| Ok(values[v.0])
    }

    #[test]
    fn operators_build_flat_sums() {
        let (x, y, z) = vars();
        let e = x + y + z - 3.0;
        match &e {
            Expr::Sum(terms) => assert_eq!(terms.len(), 4),
            other => panic!("expected sum, got {:?}", other),
        }
        assert_eq!(e.evaluate(&lookup(&[1.0, 2.0, 3.0])).unwrap(), 3.0);
    }

    #[test]
    fn degree_classification() {
        let (x, y, _) = vars();
        assert_eq!((2.0 * x + y).polynomial_degree(), Some(1));
        assert_eq!((x * y + 1.0).polynomial_degree(), Some(2));
        assert_eq!(x.powi(3).polynomial_degree(), Some(3));
        assert_eq!((x + 1.0).log().polynomial_degree(), None);
        assert_eq!((x / y).polynomial_degree(), None);
        assert_eq!((x / 4.0).polynomial_degree(), Some(1));
    }

    #[test]
    fn standard_repn_collects_terms() {
        let (x, y, _) = vars();
        let e = 10.0 * x.powi(2) - y + 5.0 * (y - 1.0);
        let repn = e.standard_repn();
        assert_eq!(repn.constant, -5.0);
        assert_eq!(repn.linear.get(&y), Some(&4.0));
        assert_eq!(repn.quadratic.get(&(x, x)), Some(&10.0));
        assert!(repn.nonlinear.is_none());
        assert!(repn.is_quadratic());
    }

    #[test]
    fn huge_powers_are_not_expanded() {
        let (x, y, _) = vars();
        let e = 2.0 * y + (x + y).powi(1_000_000_000);
        let repn = e.standard_repn();
        assert_eq!(repn.linear.get(&y), Some(&2.0));
        assert!(repn.is_nonlinear());
        assert_eq!(x.pow(1e12).polynomial_degree(), Some(u32::MAX));

        let cubic = x.powi(3).standard_repn();
        assert!(cubic.is_nonlinear());
        assert_eq!(cubic.nonlinear.and_then(|e| e.polynomial_degree()), Some(3));
    }

    #[test]
    fn standard_repn_keeps_nonlinear_remainder() {
        let (x, y, _) = vars();
        let e = -1.0 * y + 5.0 * (x + 1.0).log() + 3.0 * x;
        let repn = e.standard_repn();
        assert_eq!(repn.linear.get(&y), Some(&-1.0));
        assert_eq!(repn.linear.get(&x), Some(&3.0));
        assert!(repn.is_nonlinear());
    }

    #[test]
    fn standard_repn_substitutes_fixed_values() {
        let (x, y, _) = vars();
        let e = 2.0 * x * y + y;
        let repn = e.standard_repn_with(&|v| if v == x { Some(3.0) } else { None });
        assert!(repn.quadratic.is_empty());
        assert_eq!(repn.linear.get(&y), Some(&7.0));
    }

    #[test]
    fn cancelling_terms_are_dropped() {
        let (x, y, _) = vars();
        let repn = (x + y - x).standard_repn();
        assert!(!repn.linear.contains_key(&x));
        assert_eq!(repn.variables(), vec![y]);
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let (x, y, _) = vars();
        let e = x * (-1.0 * y).exp() + x.powi(2) / y + (x + 1.0).log();
        let point = [0.7, 1.3, 0.0];
        for v in [x, y] {
            let d = e.differentiate(v).evaluate(&lookup(&point)).unwrap();
            let h = 1e-6;
            let mut hi = point;
            hi[v.0] += h;
            let mut lo = point;
            lo[v.0] -= h;
            let fd = (e.evaluate(&lookup(&hi)).unwrap() - e.evaluate(&lookup(&lo)).unwrap())
                / (2.0 * h);
            assert!((d - fd).abs() < 1e-6, "d/d{} = {} vs {}", v, d, fd);
        }
    }

    #[test]
    fn evaluation_reports_domain_errors() {
        let (x, _, _) = vars();
        let err = x.log().evaluate(&lookup(&[-1.0])).unwrap_err();
        assert!(matches!(err, ModelError::Evaluation(_)));
        assert!((1.0 / Expr::from(x)).evaluate(&lookup(&[0.0])).is_err());
    }

    #[test]
    fn display_uses_names() {
        let (x, y, _) = vars();
        let e = 2.0 * x - y;
        let s = e.to_string_with(&|v| if v == x { "x".into() } else { "y".into() });
        assert_eq!(s, "2*x - y");
    }
}
