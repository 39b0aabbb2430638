//! CPLEX LP file writer.
//!
//! A model is first lowered into an [`LpProblem`] (named columns and rows,
//! all coefficients numeric) and then printed. Ranged constraints become
//! two rows, `r_l_<name>_` and `r_u_<name>_`; other rows are prefixed
//! `c_e_`, `c_l_` or `c_u_` by sense.
//!
//! ```text
//! \* Source model name=demo *\
//!
//! max
//! obj:
//! +3 x
//! +2 y
//!
//! s.t.
//!
//! c_u_c1_:
//! +1 x
//! +1 y
//! <= 6
//!
//! bounds
//!    0 <= x <= 4
//!    0 <= y <= +inf
//! general
//!   y
//! end
//! ```

use crate::error::{SolverError, SolverResult};
use amf_core::{ComponentRef, Expr, Labeler, Model, Sense, StandardRepn, SymbolMap, Var};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Name of the auxiliary column carrying constant objective terms.
pub const ONE_VAR_CONSTANT: &str = "ONE_VAR_CONSTANT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSense {
    Le,
    Ge,
    Eq,
}

impl RowSense {
    fn as_str(&self) -> &'static str {
        match self {
            RowSense::Le => "<=",
            RowSense::Ge => ">=",
            RowSense::Eq => "=",
        }
    }
}

/// One linear or quadratic row.
#[derive(Debug, Clone, PartialEq)]
pub struct LpRow {
    pub name: String,
    pub linear: Vec<(String, f64)>,
    /// `(a, b, q)` meaning `q * a * b`.
    pub quadratic: Vec<(String, String, f64)>,
    pub sense: RowSense,
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Continuous,
    Integer,
    Binary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LpColumn {
    pub name: String,
    pub lb: Option<f64>,
    pub ub: Option<f64>,
    /// Fixed columns are written as `name = value`.
    pub fixed: Option<f64>,
    pub kind: ColumnKind,
}

/// Special ordered set.
#[derive(Debug, Clone, PartialEq)]
pub struct LpSos {
    pub name: String,
    /// 1 or 2.
    pub level: u8,
    pub members: Vec<(String, f64)>,
}

/// A fully numeric LP/QP ready to be printed.
#[derive(Debug, Clone, PartialEq)]
pub struct LpProblem {
    pub name: String,
    pub sense: Sense,
    pub objective_name: String,
    pub objective_linear: Vec<(String, f64)>,
    /// `(a, b, q)` meaning `q * a * b` in the objective.
    pub objective_quadratic: Vec<(String, String, f64)>,
    pub objective_constant: f64,
    pub rows: Vec<LpRow>,
    pub columns: Vec<LpColumn>,
    pub sos: Vec<LpSos>,
}

pub(crate) fn format_error(component: &str, repn: &StandardRepn) -> SolverError {
    let reason = match &repn.nonlinear {
        Some(e) if e.polynomial_degree().is_some() => {
            "polynomial terms of degree greater than 2 are not supported by the LP format"
        }
        _ => "nonlinear expressions are not supported by the LP format",
    };
    SolverError::Format {
        component: component.to_string(),
        reason: reason.to_string(),
    }
}

/// Polynomial form of `expr` as written to a solver.
///
/// Linear bodies keep fixed variables as columns with fixed bounds. Any
/// other body has fixed values substituted first, which is how
/// [`Model::problem_class`] sees it, so a model classed LP or QP always
/// lowers at that degree.
pub(crate) fn lower_repn(model: &Model, expr: &Expr) -> StandardRepn {
    let repn = expr.standard_repn();
    if repn.is_linear() {
        repn
    } else {
        model.repn(expr)
    }
}

pub(crate) fn column_for(model: &Model, v: Var, name: String) -> LpColumn {
    let data = model.var(v);
    let (lb, ub) = data.effective_bounds();
    let kind = if data.is_binary() {
        ColumnKind::Binary
    } else if data.is_integer() {
        ColumnKind::Integer
    } else {
        ColumnKind::Continuous
    };
    LpColumn {
        name,
        lb,
        ub,
        fixed: if data.fixed { data.value } else { None },
        kind,
    }
}

/// Rows for `lower <= body <= upper`; two rows when the bounds differ.
pub(crate) fn rows_for(
    symbol: &str,
    linear: Vec<(String, f64)>,
    quadratic: Vec<(String, String, f64)>,
    lower: Option<f64>,
    upper: Option<f64>,
) -> Vec<LpRow> {
    let row = |name: String, sense: RowSense, rhs: f64| LpRow {
        name,
        linear: linear.clone(),
        quadratic: quadratic.clone(),
        sense,
        rhs,
    };
    match (lower, upper) {
        (Some(l), Some(u)) if l == u => vec![row(format!("c_e_{}_", symbol), RowSense::Eq, l)],
        (Some(l), Some(u)) => vec![
            row(format!("r_l_{}_", symbol), RowSense::Ge, l),
            row(format!("r_u_{}_", symbol), RowSense::Le, u),
        ],
        (Some(l), None) => vec![row(format!("c_l_{}_", symbol), RowSense::Ge, l)],
        (None, Some(u)) => vec![row(format!("c_u_{}_", symbol), RowSense::Le, u)],
        (None, None) => Vec::new(),
    }
}

impl LpProblem {
    /// Lower the active part of `model`, assigning symbols through `symbol_map`.
    pub fn from_model(
        model: &Model,
        symbol_map: &mut SymbolMap,
        labeler: &mut dyn Labeler,
    ) -> SolverResult<Self> {
        let (objective_id, objective) = model.active_objective()?;
        let objective_repn = lower_repn(model, &objective.expr);
        if objective_repn.is_nonlinear() {
            return Err(format_error(&objective.name, &objective_repn));
        }

        let mut referenced: BTreeSet<Var> = objective_repn.variables().into_iter().collect();
        let mut constraint_repns = Vec::new();
        for (id, c) in model.active_constraints() {
            let repn = lower_repn(model, &c.body);
            if repn.is_nonlinear() {
                return Err(format_error(&c.name, &repn));
            }
            if repn.is_constant() {
                debug!(constraint = %c.name, "skipping constraint without variables");
                continue;
            }
            referenced.extend(repn.variables());
            constraint_repns.push((id, c, repn));
        }

        let mut columns = Vec::with_capacity(referenced.len());
        for &v in &referenced {
            let symbol = symbol_map.get_symbol(model, v, labeler)?;
            columns.push(column_for(model, v, symbol));
        }
        let sym = |map: &SymbolMap, v: Var| -> SolverResult<String> {
            map.symbol(v)
                .map(str::to_string)
                .ok_or_else(|| SolverError::Parse(format!("no symbol for {}", v)))
        };
        let linear = |map: &SymbolMap, repn: &StandardRepn| -> SolverResult<Vec<(String, f64)>> {
            repn.linear
                .iter()
                .map(|(v, c)| Ok((sym(map, *v)?, *c)))
                .collect()
        };
        let quadratic =
            |map: &SymbolMap, repn: &StandardRepn| -> SolverResult<Vec<(String, String, f64)>> {
                repn.quadratic
                    .iter()
                    .map(|((a, b), q)| Ok((sym(map, *a)?, sym(map, *b)?, *q)))
                    .collect()
            };

        let mut rows = Vec::new();
        for (id, c, repn) in &constraint_repns {
            if c.lower.is_none() && c.upper.is_none() {
                debug!(constraint = %c.name, "skipping constraint without bounds");
                continue;
            }
            let symbol = symbol_map.get_symbol(model, *id, labeler)?;
            rows.extend(rows_for(
                &symbol,
                linear(symbol_map, repn)?,
                quadratic(symbol_map, repn)?,
                c.lower.map(|l| l - repn.constant),
                c.upper.map(|u| u - repn.constant),
            ));
        }

        let objective_name = symbol_map.get_symbol(model, ComponentRef::Objective(objective_id), labeler)?;
        let problem = LpProblem {
            name: model.name().to_string(),
            sense: objective.sense,
            objective_name,
            objective_linear: linear(symbol_map, &objective_repn)?,
            objective_quadratic: quadratic(symbol_map, &objective_repn)?,
            objective_constant: objective_repn.constant,
            rows,
            columns,
            sos: Vec::new(),
        };
        debug!(
            model = %problem.name,
            columns = problem.columns.len(),
            rows = problem.rows.len(),
            "lowered model to LP"
        );
        Ok(problem)
    }

    /// Print in CPLEX LP format.
    pub fn write<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(w, "\\* Source model name={} *\\", self.name)?;
        writeln!(w)?;
        writeln!(
            w,
            "{}",
            match self.sense {
                Sense::Minimize => "min",
                Sense::Maximize => "max",
            }
        )?;
        writeln!(w, "{}:", self.objective_name)?;
        for (name, c) in &self.objective_linear {
            writeln!(w, "{:+} {}", c, name)?;
        }
        if !self.objective_quadratic.is_empty() {
            writeln!(w, "+ [")?;
            for (a, b, q) in &self.objective_quadratic {
                write_quadratic_term(w, a, b, 2.0 * q)?;
            }
            writeln!(w, "] / 2")?;
        }
        let needs_constant = self.objective_constant != 0.0
            || (self.objective_linear.is_empty() && self.objective_quadratic.is_empty());
        if needs_constant {
            writeln!(w, "{:+} {}", self.objective_constant, ONE_VAR_CONSTANT)?;
        }
        writeln!(w)?;

        writeln!(w, "s.t.")?;
        writeln!(w)?;
        for row in &self.rows {
            writeln!(w, "{}:", row.name)?;
            for (name, c) in &row.linear {
                writeln!(w, "{:+} {}", c, name)?;
            }
            if !row.quadratic.is_empty() {
                writeln!(w, "+ [")?;
                for (a, b, q) in &row.quadratic {
                    write_quadratic_term(w, a, b, *q)?;
                }
                writeln!(w, "]")?;
            }
            writeln!(w, "{} {}", row.sense.as_str(), row.rhs)?;
            writeln!(w)?;
        }
        if needs_constant {
            // LP files need at least one row mentioning every column.
            writeln!(w, "c_e_{}_:", ONE_VAR_CONSTANT)?;
            writeln!(w, "+1 {}", ONE_VAR_CONSTANT)?;
            writeln!(w, "= 1")?;
            writeln!(w)?;
        }

        writeln!(w, "bounds")?;
        for col in &self.columns {
            match (col.fixed, col.lb, col.ub) {
                (Some(v), _, _) => writeln!(w, "   {} = {}", col.name, v)?,
                (None, lb, ub) => writeln!(
                    w,
                    "   {} <= {} <= {}",
                    lb.map_or("-inf".to_string(), |l| l.to_string()),
                    col.name,
                    ub.map_or("+inf".to_string(), |u| u.to_string())
                )?,
            }
        }
        if needs_constant {
            writeln!(w, "   {} = 1", ONE_VAR_CONSTANT)?;
        }

        let general: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Integer)
            .map(|c| c.name.as_str())
            .collect();
        if !general.is_empty() {
            writeln!(w, "general")?;
            for name in general {
                writeln!(w, "  {}", name)?;
            }
        }
        let binary: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Binary)
            .map(|c| c.name.as_str())
            .collect();
        if !binary.is_empty() {
            writeln!(w, "binary")?;
            for name in binary {
                writeln!(w, "  {}", name)?;
            }
        }

        if !self.sos.is_empty() {
            writeln!(w, "SOS")?;
            for set in &self.sos {
                write!(w, "{}: S{}::", set.name, set.level)?;
                for (name, weight) in &set.members {
                    write!(w, " {}:{}", name, weight)?;
                }
                writeln!(w)?;
            }
        }
        writeln!(w, "end")
    }

    pub fn to_lp_string(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn write_file(&self, path: &Path) -> SolverResult<()> {
        let file = std::fs::File::create(path)?;
        let mut w = std::io::BufWriter::new(file);
        self.write(&mut w)?;
        w.flush()?;
        Ok(())
    }
}

fn write_quadratic_term<W: Write>(w: &mut W, a: &str, b: &str, q: f64) -> std::io::Result<()> {
    if a == b {
        writeln!(w, "{:+} {} ^ 2", q, a)
    } else {
        writeln!(w, "{:+} {} * {}", q, a, b)
    }
}

/// Write the active part of `model` to `path`, returning the symbol map used.
pub fn write_lp_file(
    model: &Model,
    path: &Path,
    labeler: &mut dyn Labeler,
) -> SolverResult<SymbolMap> {
    let mut symbol_map = SymbolMap::new();
    let problem = LpProblem::from_model(model, &mut symbol_map, labeler)?;
    problem.write_file(path)?;
    debug!(path = %path.display(), "wrote LP file");
    Ok(symbol_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use amf_core::{library, Domain, TextLabeler};

    fn lower(m: &Model) -> SolverResult<LpProblem> {
        LpProblem::from_model(m, &mut SymbolMap::new(), &mut TextLabeler)
    }

    #[test]
    fn writes_linear_model() {
        let mut m = Model::new("demo");
        let x = m.add_var("x", Domain::NonNegativeReals, (None, Some(4.0))).unwrap();
        let y = m.add_var("y", Domain::NonNegativeIntegers, (None, None)).unwrap();
        m.add_constraint("c1", (x + y).leq(6.0)).unwrap();
        m.set_objective("obj", 3.0 * x + 2.0 * y, Sense::Maximize).unwrap();

        let text = lower(&m).unwrap().to_lp_string();
        let expected = "\\* Source model name=demo *\\\n\nmax\nobj:\n+3 x\n+2 y\n\ns.t.\n\n\
                        c_u_c1_:\n+1 x\n+1 y\n<= 6\n\nbounds\n   0 <= x <= 4\n   0 <= y <= +inf\n\
                        general\n  y\nend\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn ranged_rows_and_fixed_bounds() {
        let mut m = Model::new("r");
        let x = m.add_var("x", Domain::Reals, (None, None)).unwrap();
        let z = m.add_var("z", Domain::Binary, (None, None)).unwrap();
        m.add_constraint("band", amf_core::Relation::ranged(Some(1.0), x + z, Some(3.0)))
            .unwrap();
        m.set_objective("obj", x + 5.0, Sense::Minimize).unwrap();
        m.fix(z, 1.0);

        let p = lower(&m).unwrap();
        assert_eq!(p.rows.len(), 2);
        assert_eq!(p.rows[0].name, "r_l_band_");
        assert_eq!(p.rows[1].name, "r_u_band_");
        let text = p.to_lp_string();
        assert!(text.contains("   -inf <= x <= +inf\n"));
        assert!(text.contains("   z = 1\n"));
        assert!(text.contains("+5 ONE_VAR_CONSTANT\n"));
        assert!(text.contains("   ONE_VAR_CONSTANT = 1\n"));
        assert!(text.contains("binary\n  z\n"));
    }

    #[test]
    fn quadratic_objective_is_halved() {
        let m = library::lqcp(2).unwrap();
        let text = lower(&m).unwrap().to_lp_string();
        assert!(text.contains("+ [\n"));
        assert!(text.contains("] / 2\n"));
        assert!(text.contains(" ^ 2\n"));
        assert!(text.contains("c_e_pde(0_1)_:"));
    }

    #[test]
    fn rejects_nonlinear_models() {
        let m = library::simple_minlp3().unwrap();
        match lower(&m) {
            Err(SolverError::Format { component, .. }) => assert_eq!(component, "const1"),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_cubic_terms() {
        let mut m = Model::new("cubic");
        let x = m.add_var("x", Domain::Reals, (None, None)).unwrap();
        m.set_objective("obj", x.powi(3), Sense::Minimize).unwrap();
        let err = lower(&m).unwrap_err();
        assert!(err.to_string().contains("degree greater than 2"));
    }

    #[test]
    fn fixed_variables_lower_nonlinear_terms() {
        let mut m = Model::new("fixed");
        let x = m.add_var("x", Domain::NonNegativeReals, (None, None)).unwrap();
        let p = m.add_var("p", Domain::Reals, (None, None)).unwrap();
        let z = m.add_var("z", Domain::Reals, (None, None)).unwrap();
        m.add_constraint("c", (p.exp() * x).geq(1.0)).unwrap();
        m.add_constraint("d", (x * z).leq(6.0)).unwrap();
        m.set_objective("obj", 1.0 * x, Sense::Minimize).unwrap();
        m.fix(p, 0.0);
        m.fix(z, 2.0);
        assert_eq!(m.problem_class(), amf_core::ProblemClass::Lp);

        let problem = lower(&m).unwrap();
        assert!(problem.rows.iter().all(|r| r.quadratic.is_empty()));
        assert_eq!(problem.rows[0].name, "c_l_c_");
        assert_eq!(problem.rows[0].linear, vec![("x".to_string(), 1.0)]);
        assert_eq!(problem.rows[1].linear, vec![("x".to_string(), 2.0)]);
        assert_eq!(problem.columns.len(), 1);
    }

    #[test]
    fn writes_file_and_symbols() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.lp");
        let m = library::lqcp(2).unwrap();
        let map = write_lp_file(&m, &path, &mut TextLabeler).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("end\n"));
        assert_eq!(map.var("y(2_1)"), Some(m.var_by_name("y[2,1]").unwrap()));
    }
}
