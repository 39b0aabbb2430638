//! Incumbent filtering for decomposition MINLP algorithms.
//!
//! An outer-approximation style algorithm explores one integer assignment
//! per iteration. When the MILP master solver proposes a new incumbent, the
//! assignment of its discrete variables is compared against the ones already
//! explored, and repeats are rejected so the master keeps branching.

use std::collections::HashSet;
use tracing::trace;

/// Integer combinations already explored.
#[derive(Debug, Clone, Default)]
pub struct IncumbentTabuList {
    /// In single-tree mode every incumbent is rejected; the algorithm adds
    /// its own cuts from the rejection callback.
    pub single_tree: bool,
    explored: HashSet<Vec<i64>>,
}

fn rounded(values: &[f64]) -> Vec<i64> {
    values.iter().map(|v| v.round() as i64).collect()
}

impl IncumbentTabuList {
    pub fn new(single_tree: bool) -> Self {
        Self {
            single_tree,
            explored: HashSet::new(),
        }
    }

    /// Mark the rounded `values` as explored.
    pub fn record(&mut self, values: &[f64]) {
        self.explored.insert(rounded(values));
    }

    pub fn is_explored(&self, values: &[f64]) -> bool {
        self.explored.contains(&rounded(values))
    }

    /// Whether the incumbent with these discrete values should be rejected.
    pub fn reject(&self, values: &[f64]) -> bool {
        let reject = self.single_tree || self.is_explored(values);
        trace!(?values, reject, "incumbent check");
        reject
    }

    pub fn len(&self) -> usize {
        self.explored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.explored.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_explored_combinations() {
        let mut tabu = IncumbentTabuList::new(false);
        assert!(!tabu.reject(&[1.0, 0.0]));
        tabu.record(&[1.0, 0.0]);
        assert!(tabu.reject(&[0.9999997, 2e-7]));
        assert!(!tabu.reject(&[0.0, 1.0]));
        tabu.record(&[1.0000001, 0.0]);
        assert_eq!(tabu.len(), 1);
    }

    #[test]
    fn single_tree_rejects_everything() {
        let tabu = IncumbentTabuList::new(true);
        assert!(tabu.is_empty());
        assert!(tabu.reject(&[3.0]));
    }
}
