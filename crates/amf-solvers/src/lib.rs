//! Solver interfaces for AMF models.
//!
//! # Architecture
//!
//! Models are lowered to a numeric LP/QP form and handed to a solver. Three
//! kinds of interface exist:
//!
//! ```text
//!                 ┌── SystemCallSolver ── model.lp ──> cbc / cplex ──> model.sol
//! Model ──lower──>├── PersistentSolver (LpTask kept in sync, then system call)
//!                 └── DirectLpSolver (good_lp + Clarabel, in-process)
//! ```
//!
//! Results come back keyed by solver symbol and are mapped to model
//! variables through the [`amf_core::SymbolMap`] built while lowering.
//!
//! # Supported Solvers
//!
//! | Name | Interface | Problem classes |
//! |------|-----------|-----------------|
//! | `cbc` | system call | LP, MILP |
//! | `cplex` | system call, ILM licensed | LP, MILP, QP, MIQP |
//! | `cbc_persistent` | persistent | LP, MILP |
//! | `clarabel` | direct (feature `solver-clarabel`) | LP |
//!
//! Executables are looked up in the configured search directories, then in
//! `~/.amf/solvers`, then on `PATH`.

#[cfg(feature = "solver-clarabel")]
pub mod direct;
pub mod error;
pub mod factory;
pub mod ilm;
pub mod lp_writer;
pub mod neos;
pub mod options;
pub mod persistent;
pub mod results;
pub mod shellcmd;
pub mod sol_reader;
pub mod tabu;

#[cfg(feature = "solver-clarabel")]
pub use direct::DirectLpSolver;
pub use error::{ExitCode, SolverError, SolverResult};
pub use factory::{Solver, SolverFactory};
pub use ilm::{interpret_ilmlist, IlmLicensedSolver};
pub use lp_writer::{write_lp_file, LpProblem};
pub use options::SolverOptions;
pub use persistent::{LpTask, PersistentSolver};
pub use results::{SolverResults, SolverStatus, TerminationCondition};
pub use shellcmd::{find_executable, CbcDialect, CommandDialect, CplexDialect, SystemCallSolver};
pub use tabu::IncumbentTabuList;
