//! Solver trait and the registry of named solvers.
//!
//! Create with `SolverFactory::new()` for an empty registry or
//! `SolverFactory::with_defaults()` for the built-in solvers.

use crate::error::{SolverError, SolverResult};
use crate::ilm::IlmLicensedSolver;
use crate::options::SolverOptions;
use crate::persistent::PersistentSolver;
use crate::results::SolverResults;
use crate::shellcmd::SystemCallSolver;
use amf_core::{Model, ProblemClass};
use std::collections::HashMap;
use tracing::debug;

/// Common interface of every solver.
pub trait Solver: std::fmt::Debug {
    fn name(&self) -> &str;

    /// Problem classes this solver accepts.
    fn supported_classes(&self) -> &'static [ProblemClass];

    /// Whether the solver can run right now.
    fn available(&self) -> SolverResult<bool>;

    /// Solve `model` and load the solution into it.
    fn solve(&mut self, model: &mut Model) -> SolverResult<SolverResults>;

    fn options(&self) -> &SolverOptions;

    fn options_mut(&mut self) -> &mut SolverOptions;

    /// Set a solver specific option.
    fn set_option(&mut self, key: &str, value: &str) {
        self.options_mut().set(key, value);
    }

    fn supports(&self, class: ProblemClass) -> bool {
        self.supported_classes().contains(&class)
    }
}

const MIXED_INTEGER_QUADRATIC: &[ProblemClass] = &[
    ProblemClass::Lp,
    ProblemClass::Milp,
    ProblemClass::Qp,
    ProblemClass::Miqp,
];

const CBC_CLASSES: &[ProblemClass] = &[ProblemClass::Lp, ProblemClass::Milp];

impl Solver for SystemCallSolver {
    fn name(&self) -> &str {
        SystemCallSolver::name(self)
    }

    fn supported_classes(&self) -> &'static [ProblemClass] {
        if self.dialect().executable() == "cbc" {
            CBC_CLASSES
        } else {
            MIXED_INTEGER_QUADRATIC
        }
    }

    fn available(&self) -> SolverResult<bool> {
        Ok(SystemCallSolver::available(self))
    }

    fn solve(&mut self, model: &mut Model) -> SolverResult<SolverResults> {
        check_class(self, model)?;
        SystemCallSolver::solve(self, model)
    }

    fn options(&self) -> &SolverOptions {
        SystemCallSolver::options(self)
    }

    fn options_mut(&mut self) -> &mut SolverOptions {
        SystemCallSolver::options_mut(self)
    }
}

impl Solver for IlmLicensedSolver {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn supported_classes(&self) -> &'static [ProblemClass] {
        MIXED_INTEGER_QUADRATIC
    }

    fn available(&self) -> SolverResult<bool> {
        IlmLicensedSolver::available(self)
    }

    fn solve(&mut self, model: &mut Model) -> SolverResult<SolverResults> {
        check_class(self, model)?;
        IlmLicensedSolver::solve(self, model)
    }

    fn options(&self) -> &SolverOptions {
        self.inner().options()
    }

    fn options_mut(&mut self) -> &mut SolverOptions {
        self.inner_mut().options_mut()
    }
}

#[cfg(feature = "solver-clarabel")]
impl Solver for crate::direct::DirectLpSolver {
    fn name(&self) -> &str {
        "clarabel"
    }

    fn supported_classes(&self) -> &'static [ProblemClass] {
        &[ProblemClass::Lp]
    }

    fn available(&self) -> SolverResult<bool> {
        Ok(true)
    }

    fn solve(&mut self, model: &mut Model) -> SolverResult<SolverResults> {
        crate::direct::DirectLpSolver::solve(self, model)
    }

    fn options(&self) -> &SolverOptions {
        crate::direct::DirectLpSolver::options(self)
    }

    fn options_mut(&mut self) -> &mut SolverOptions {
        crate::direct::DirectLpSolver::options_mut(self)
    }
}

impl Solver for PersistentSolver {
    fn name(&self) -> &str {
        self.backend().name()
    }

    fn supported_classes(&self) -> &'static [ProblemClass] {
        CBC_CLASSES
    }

    fn available(&self) -> SolverResult<bool> {
        Ok(self.backend().available())
    }

    /// Loads `model` as the instance, then solves it.
    fn solve(&mut self, model: &mut Model) -> SolverResult<SolverResults> {
        check_class(self, model)?;
        self.set_instance(model)?;
        PersistentSolver::solve(self, model)
    }

    fn options(&self) -> &SolverOptions {
        self.backend().options()
    }

    fn options_mut(&mut self) -> &mut SolverOptions {
        self.backend_mut().options_mut()
    }
}

fn check_class(solver: &dyn Solver, model: &Model) -> SolverResult<()> {
    let class = model.problem_class();
    if solver.supports(class) {
        Ok(())
    } else {
        Err(SolverError::Unsupported {
            solver: solver.name().to_string(),
            what: format!("{} models", class),
        })
    }
}

type Constructor = fn(SolverOptions) -> Box<dyn Solver>;

struct Registration {
    doc: &'static str,
    create: Constructor,
}

/// Registry of named solver constructors.
#[derive(Default)]
pub struct SolverFactory {
    solvers: HashMap<String, Registration>,
}

impl std::fmt::Debug for SolverFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverFactory")
            .field("solvers", &self.names())
            .finish()
    }
}

impl SolverFactory {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in solvers:
    /// `cbc`, `cplex`, `cbc_persistent` and, with the `solver-clarabel`
    /// feature, `clarabel`.
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        factory.register("cbc", "COIN-OR CBC MILP solver (system call)", |o| {
            Box::new(SystemCallSolver::cbc(o))
        });
        factory.register(
            "cplex",
            "IBM ILOG CPLEX MIQP solver (system call, ILM licensed)",
            |o| Box::new(IlmLicensedSolver::new(SystemCallSolver::cplex(o))),
        );
        factory.register(
            "cbc_persistent",
            "CBC with a persistent in-memory model",
            |o| Box::new(PersistentSolver::new(SystemCallSolver::cbc(o))),
        );
        #[cfg(feature = "solver-clarabel")]
        factory.register("clarabel", "Clarabel interior point LP solver (in-process)", |o| {
            Box::new(crate::direct::DirectLpSolver::new(o))
        });
        factory
    }

    /// Register a solver constructor, replacing any previous one of that name.
    pub fn register(&mut self, name: &str, doc: &'static str, create: Constructor) {
        self.solvers
            .insert(name.to_string(), Registration { doc, create });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.solvers.contains_key(name)
    }

    fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.solvers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Instantiate the solver called `name`.
    pub fn create(&self, name: &str, options: SolverOptions) -> SolverResult<Box<dyn Solver>> {
        let registration = self
            .solvers
            .get(name)
            .ok_or_else(|| SolverError::UnknownSolver {
                name: name.to_string(),
                known: self.names().join(", "),
            })?;
        debug!(solver = name, "creating solver");
        Ok((registration.create)(options))
    }

    /// `(name, doc)` of every registered solver, sorted by name.
    pub fn list(&self) -> Vec<(&str, &'static str)> {
        self.names()
            .into_iter()
            .filter_map(|n| self.solvers.get(n).map(|r| (n, r.doc)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amf_core::{library, Domain, Sense};

    #[test]
    fn lists_defaults_sorted() {
        let factory = SolverFactory::with_defaults();
        let names: Vec<&str> = factory.list().into_iter().map(|(n, _)| n).collect();
        #[cfg(feature = "solver-clarabel")]
        assert_eq!(names, vec!["cbc", "cbc_persistent", "clarabel", "cplex"]);
        #[cfg(not(feature = "solver-clarabel"))]
        assert_eq!(names, vec!["cbc", "cbc_persistent", "cplex"]);
    }

    #[test]
    fn unknown_solver_lists_known_names() {
        let factory = SolverFactory::with_defaults();
        let err = factory.create("gurobi", SolverOptions::new()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("gurobi"));
        assert!(msg.contains("cbc, cbc_persistent"));
    }

    #[test]
    fn options_flow_through() {
        let factory = SolverFactory::with_defaults();
        let mut solver = factory
            .create("cplex", SolverOptions::new().with_timeout(5))
            .unwrap();
        solver.set_option("threads", "2");
        assert_eq!(solver.name(), "cplex");
        assert_eq!(solver.options().timeout_seconds, 5);
        assert_eq!(solver.options().get("threads"), Some("2"));
    }

    #[test]
    fn rejects_unsupported_class_before_running() {
        let factory = SolverFactory::with_defaults();
        let mut solver = factory.create("cbc", SolverOptions::new()).unwrap();
        let mut m = library::simple_minlp3().unwrap();
        let err = solver.solve(&mut m).unwrap_err();
        assert!(matches!(err, SolverError::Unsupported { .. }));
        assert!(!solver.supports(ProblemClass::Minlp));
    }

    #[cfg(feature = "solver-clarabel")]
    #[test]
    fn clarabel_through_trait() {
        let factory = SolverFactory::with_defaults();
        let mut solver = factory.create("clarabel", SolverOptions::new()).unwrap();
        assert!(solver.available().unwrap());
        let mut m = Model::new("lp");
        let x = m.add_var("x", Domain::NonNegativeReals, (None, None)).unwrap();
        m.add_constraint("c", x.geq(2.0)).unwrap();
        m.set_objective("obj", 1.0 * x, Sense::Minimize).unwrap();
        solver.solve(&mut m).unwrap();
        assert!((m.value(x).unwrap() - 2.0).abs() < 1e-4);
    }

    #[cfg(unix)]
    #[test]
    fn persistent_through_trait() {
        use crate::shellcmd::tests::{fake_solver, small_model, FAKE_CBC};
        let dir = tempfile::tempdir().unwrap();
        fake_solver(dir.path(), "cbc", FAKE_CBC);
        let factory = SolverFactory::with_defaults();
        let mut solver = factory
            .create("cbc_persistent", SolverOptions::new().with_search_dir(dir.path()))
            .unwrap();
        assert!(solver.available().unwrap());
        let mut m = small_model();
        let results = solver.solve(&mut m).unwrap();
        assert_eq!(results.objective, Some(16.0));
    }
}
