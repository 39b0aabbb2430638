//! Index sets for indexed components.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of one element of an indexed component.
///
/// Scalar components use the empty index; integer indices of any arity are
/// supported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Index(Vec<i64>);

impl Index {
    /// The index of a scalar (non-indexed) component.
    pub fn scalar() -> Self {
        Self(Vec::new())
    }

    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// Append this index to a component name: `x` + `[1,2]` = `x[1,2]`.
    pub fn qualify(&self, name: &str) -> String {
        if self.is_scalar() {
            name.to_string()
        } else {
            format!("{}{}", name, self)
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        write!(f, "[")?;
        for (k, v) in self.0.iter().enumerate() {
            if k > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}

impl From<()> for Index {
    fn from(_: ()) -> Self {
        Index::scalar()
    }
}

impl From<i64> for Index {
    fn from(i: i64) -> Self {
        Index(vec![i])
    }
}

impl From<(i64, i64)> for Index {
    fn from((i, j): (i64, i64)) -> Self {
        Index(vec![i, j])
    }
}

impl From<(i64, i64, i64)> for Index {
    fn from((i, j, k): (i64, i64, i64)) -> Self {
        Index(vec![i, j, k])
    }
}

impl From<Vec<i64>> for Index {
    fn from(v: Vec<i64>) -> Self {
        Index(v)
    }
}

impl From<&[i64]> for Index {
    fn from(v: &[i64]) -> Self {
        Index(v.to_vec())
    }
}

impl From<&Index> for Index {
    fn from(v: &Index) -> Self {
        v.clone()
    }
}

/// Inclusive integer range `start..=end` with a positive step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSet {
    start: i64,
    end: i64,
    step: i64,
}

impl RangeSet {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            step: 1,
        }
    }

    pub fn with_step(start: i64, end: i64, step: i64) -> ModelResult<Self> {
        if step <= 0 {
            return Err(ModelError::InvalidArgument(format!(
                "RangeSet step must be positive, got {}",
                step
            )));
        }
        Ok(Self { start, end, step })
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            ((self.end - self.start) / self.step + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, value: i64) -> bool {
        value >= self.start && value <= self.end && (value - self.start) % self.step == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> {
        let RangeSet { start, step, .. } = *self;
        (0..self.len() as i64).map(move |k| start + k * step)
    }

    /// One [`Index`] per member.
    pub fn indices(&self) -> Vec<Index> {
        self.iter().map(Index::from).collect()
    }
}

impl IntoIterator for &RangeSet {
    type Item = i64;
    type IntoIter = std::vec::IntoIter<i64>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter().collect::<Vec<_>>().into_iter()
    }
}

impl IntoIterator for RangeSet {
    type Item = i64;
    type IntoIter = std::vec::IntoIter<i64>;

    fn into_iter(self) -> Self::IntoIter {
        (&self).into_iter()
    }
}

/// Cartesian product of two sets in row-major order.
pub fn product(a: &RangeSet, b: &RangeSet) -> Vec<Index> {
    let mut out = Vec::with_capacity(a.len() * b.len());
    for i in a.iter() {
        for j in b.iter() {
            out.push(Index::from((i, j)));
        }
    }
    out
}
