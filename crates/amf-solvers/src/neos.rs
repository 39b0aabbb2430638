//! Solvers offered on the NEOS server, with one-line descriptions.

/// `(name, description)` for every documented NEOS solver.
pub const NEOS_SOLVERS: &[(&str, &str)] = &[
    ("bonmin", "Heuristic MINLP solver"),
    ("cbc", "MILP solver"),
    ("conopt", "Feasible path NLP solver"),
    ("couenne", "Deterministic global MINLP solver"),
    ("cplex", "MILP solver"),
    ("filmint", "Heuristic MINLP solver"),
    ("filter", "SQP NLP solver"),
    ("ipopt", "Interior point NLP solver"),
    ("knitro", "Convex MINLP solver"),
    ("l-bfgs-b", "Bound-constrained NLP solver"),
    ("lancelot", "Augmented Lagrangian NLP solver"),
    ("loqo", "Interior point NLP solver"),
    ("minlp", "Heuristic MINLP solver"),
    ("minos", "SLC NLP solver"),
    ("minto", "MILP solver"),
    ("mosek", "Interior point NLP solver"),
    ("ooqp", "Convex QP solver"),
    ("path", "Nonlinear MCP solver"),
    ("snopt", "SQP NLP solver"),
    ("raposa", "A Global Solver for Polynomial Programming Problems"),
    ("lgo", "Lipschitz-Continuous Global Optimizer"),
];

/// Description of a NEOS solver, case-insensitive.
pub fn doc(name: &str) -> Option<&'static str> {
    let name = name.to_lowercase();
    NEOS_SOLVERS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, d)| *d)
}

/// All NEOS solvers sorted by name.
pub fn list() -> Vec<(&'static str, &'static str)> {
    let mut all = NEOS_SOLVERS.to_vec();
    all.sort_by_key(|(n, _)| *n);
    all
}
