//! # amf-core: Algebraic Model Declaration
//!
//! Symbolic optimization models: index sets, (indexed) variables, expression
//! trees, constraints and objectives, plus the symbol maps used to hand a
//! model to an external solver and read its answer back.
//!
//! ## Quick Start
//!
//! ```rust
//! use amf_core::*;
//!
//! let mut m = Model::new("diet");
//! let x = m.add_var("x", Domain::NonNegativeReals, (None, Some(4.0))).unwrap();
//! let y = m.add_var("y", Domain::NonNegativeIntegers, (None, None)).unwrap();
//! m.add_constraint("capacity", (x + y).leq(6.0)).unwrap();
//! m.set_objective("profit", 3.0 * x + 2.0 * y, Sense::Maximize).unwrap();
//!
//! assert_eq!(m.problem_class(), ProblemClass::Milp);
//! ```
//!
//! ## Problem Classes
//!
//! | Class | Objective | Constraints | Integers |
//! |-------|-----------|-------------|----------|
//! | LP    | linear    | linear      | no  |
//! | MILP  | linear    | linear      | yes |
//! | QP    | ≤ quadratic | ≤ quadratic | no  |
//! | MIQP  | ≤ quadratic | ≤ quadratic | yes |
//! | NLP   | any       | any         | no  |
//! | MINLP | any       | any         | yes |

pub mod constraint;
pub mod error;
pub mod expr;
pub mod library;
pub mod model;
pub mod objective;
pub mod set;
pub mod symbol_map;
pub mod var;

pub use constraint::{ConstraintData, ConstraintId, ConstraintRule, IndexedConstraint, Relation};
pub use error::{ModelError, ModelResult};
pub use expr::{Expr, StandardRepn, UnaryFunction};
pub use model::{Model, ProblemClass};
pub use objective::{ObjectiveData, ObjectiveId, Sense};
pub use set::{product, Index, RangeSet};
pub use symbol_map::{ComponentRef, Labeler, NumericLabeler, SymbolMap, TextLabeler};
pub use var::{Bounds, Domain, IndexedVar, Var, VarData};
