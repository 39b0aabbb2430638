//! Example models used by tests, benchmarks and `amf library`.

use crate::error::{ModelError, ModelResult};
use crate::expr::Expr;
use crate::model::Model;
use crate::objective::Sense;
use crate::set::{product, RangeSet};
use crate::var::Domain;
use serde::Serialize;

/// Known optimum of a library model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnownOptimum {
    pub value: f64,
    /// `(variable name, value)` pairs.
    pub solution: Vec<(String, f64)>,
}

/// A named entry of the model library.
#[derive(Debug, Clone, Copy)]
pub struct LibraryEntry {
    pub name: &'static str,
    pub description: &'static str,
    /// Whether the model takes a size parameter.
    pub sized: bool,
}

pub const LIBRARY: &[LibraryEntry] = &[
    LibraryEntry {
        name: "lqcp",
        description: "Linear-quadratic control of a heat equation on an (n+1)x(n+1) grid (QP)",
        sized: true,
    },
    LibraryEntry {
        name: "simple_minlp3",
        description: "Convex MINLP of Quesada and Grossmann, example 1 (MINLP)",
        sized: false,
    },
];

/// Build a library model by name. `size` is used by sized models only.
pub fn build(name: &str, size: Option<usize>) -> ModelResult<Model> {
    match name {
        "simple_minlp3" => simple_minlp3(),
        "lqcp" => lqcp(size.unwrap_or(50)),
        other => Err(ModelError::UnknownComponent(format!(
            "{} (available: {})",
            other,
            LIBRARY.iter().map(|e| e.name).collect::<Vec<_>>().join(", ")
        ))),
    }
}

/// Example 1 of Quesada and Grossmann, "An LP/NLP based branch and bound
/// algorithm for convex MINLP optimization problems" (1992).
///
/// One binary, two continuous variables, four constraints.
pub fn simple_minlp3() -> ModelResult<Model> {
    let mut m = Model::new("SimpleMINLP3");
    let i = RangeSet::new(1, 2);
    let j = RangeSet::new(1, 1);

    let y = m.add_indexed_var("Y", &j, Domain::Binary, (None, None), Some(1.0))?;
    let x = m.add_indexed_var("X", &i, Domain::Reals, (Some(-0.9), Some(50.0)), Some(0.0))?;

    m.add_constraint(
        "const1",
        (-x[2] + 5.0 * (x[1] + 1.0).log() + 3.0 * y[1]).geq(0.0),
    )?;
    m.add_constraint("const2", (-x[2] + x[1].powi(2) - y[1]).leq(1.0))?;
    m.add_constraint("const3", (x[1] + x[2] + 20.0 * y[1]).leq(24.0))?;
    m.add_constraint("const4", (2.0 * x[2] + 3.0 * x[1]).leq(10.0))?;

    m.set_objective(
        "objective",
        10.0 * x[1].powi(2) - x[2] + 5.0 * (y[1] - 1.0),
        Sense::Minimize,
    )?;
    Ok(m)
}

pub fn simple_minlp3_optimum() -> KnownOptimum {
    KnownOptimum {
        value: -5.512,
        solution: vec![
            ("X[1]".to_string(), 0.20710677582302733),
            ("X[2]".to_string(), 0.9411320859243828),
            ("Y[1]".to_string(), 0.0),
        ],
    }
}

/// Linear-quadratic control problem: drive the final temperature profile of
/// a 1-D heat equation towards a target using the boundary control `u`.
///
/// `n = 1000` gives the benchmark size (about one million variables).
pub fn lqcp(n: usize) -> ModelResult<Model> {
    if n < 2 {
        return Err(ModelError::InvalidArgument(format!(
            "lqcp needs a grid size of at least 2, got {}",
            n
        )));
    }
    let n = n as i64;
    let m_steps = n;
    let dx = 1.0 / n as f64;
    let t_final = 1.58;
    let dt = t_final / n as f64;
    let h2 = dx * dx;
    let a = 0.001;
    let yt = |j: i64| 0.5 * (1.0 - (j as f64 * dx) * (j as f64 * dx));

    let mut m = Model::new("lqcp");
    let ns = RangeSet::new(0, n);
    let y = m.add_indexed_var("y", product(&ns, &ns), Domain::Reals, (Some(0.0), Some(1.0)), None)?;
    let u = m.add_indexed_var("u", &ns, Domain::Reals, (Some(-1.0), Some(1.0)), None)?;

    let interior = Expr::sum((1..n).map(|j| (y[(m_steps, j)] - yt(j)).powi(2)));
    let controls = Expr::sum((1..m_steps).map(|i| u[i].powi(2)));
    let objective = 0.25
        * dx
        * ((y[(m_steps, 0)] - yt(0)).powi(2) + 2.0 * interior + (y[(m_steps, n)] - yt(n)).powi(2))
        + 0.25 * a * dt * (2.0 * controls + u[m_steps].powi(2));
    m.set_objective("obj", objective, Sense::Minimize)?;

    m.add_indexed_constraint("pde", product(&RangeSet::new(0, n - 1), &RangeSet::new(1, n - 1)), |idx| {
        let (i, j) = (idx.as_slice()[0], idx.as_slice()[1]);
        let lhs = (y[(i + 1, j)] - y[(i, j)]) / dt;
        let rhs = 0.5
            * (y[(i, j - 1)] - 2.0 * y[(i, j)] + y[(i, j + 1)] + y[(i + 1, j - 1)]
                - 2.0 * y[(i + 1, j)]
                + y[(i + 1, j + 1)])
            / h2;
        lhs.equals(rhs).into()
    })?;

    m.add_indexed_constraint("ic", &ns, |idx| y[(0, idx.as_slice()[0])].equals(0.0).into())?;

    m.add_indexed_constraint("bc1", RangeSet::new(1, n), |idx| {
        let i = idx.as_slice()[0];
        (y[(i, 2)] - 4.0 * y[(i, 1)] + 3.0 * y[(i, 0)]).equals(0.0).into()
    })?;

    m.add_indexed_constraint("bc2", RangeSet::new(1, n), |idx| {
        let i = idx.as_slice()[0];
        let lhs = y[(i, n - 2)] - 4.0 * y[(i, n - 1)] + 3.0 * y[(i, n)];
        lhs.equals(2.0 * dx * (u[i] - y[(i, n)])).into()
    })?;

    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProblemClass;

    #[test]
    fn minlp3_structure() {
        let m = simple_minlp3().unwrap();
        assert_eq!(m.num_vars(), 3);
        assert_eq!(m.num_constraints(), 4);
        assert_eq!(m.problem_class(), ProblemClass::Minlp);
        let y1 = m.var_by_name("Y[1]").unwrap();
        assert!(m.var(y1).is_binary());
        assert_eq!(m.value(y1).unwrap(), 1.0);
        let x1 = m.var_by_name("X[1]").unwrap();
        assert_eq!(m.var(x1).effective_bounds(), (Some(-0.9), Some(50.0)));
    }

    #[test]
    fn minlp3_known_optimum_is_feasible() {
        let mut m = simple_minlp3().unwrap();
        let opt = simple_minlp3_optimum();
        let values: Vec<_> = opt
            .solution
            .iter()
            .map(|(name, v)| (m.var_by_name(name).unwrap(), *v))
            .collect();
        m.load_values(values);
        assert!(m.max_violation().unwrap() < 1e-3);
        assert!((m.objective_value().unwrap() - opt.value).abs() < 1e-3);
    }

    #[test]
    fn lqcp_sizes() {
        let n = 4usize;
        let m = lqcp(n).unwrap();
        let side = n + 1;
        assert_eq!(m.num_vars(), side * side + side);
        // pde: n*(n-1), ic: n+1, bc1: n, bc2: n
        assert_eq!(m.num_constraints(), n * (n - 1) + side + 2 * n);
        assert_eq!(m.problem_class(), ProblemClass::Qp);
        assert!(lqcp(1).is_err());
    }

    #[test]
    fn lqcp_constraints_are_linear_equalities() {
        let m = lqcp(3).unwrap();
        for (_, c) in m.constraints() {
            assert!(c.is_equality(), "{} is not an equality", c.name);
            assert!(m.repn(&c.body).is_linear());
        }
    }

    #[test]
    fn unknown_library_model() {
        assert!(build("nope", None).is_err());
        assert_eq!(build("lqcp", Some(2)).unwrap().name(), "lqcp");
    }
}
