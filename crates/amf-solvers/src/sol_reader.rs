//! Readers for solver solution files.
//!
//! # CBC
//!
//! `cbc ... -solu <file>` writes a text file. The first line is a status line such as
//! `Optimal - objective value 16.00000000`; every following line is
//! `index name value reduced_cost`, optionally prefixed by `**` for entries
//! that violate a bound. Rows (`c_e_c1_`, `r_l_band_`, …) carry duals,
//! everything else is a column.
//!
//! # CPLEX
//!
//! The interactive optimizer writes an XML `CPLEXSolution` document with a
//! `header` element (status string, objective value), `constraint` elements
//! carrying duals and `variable` elements carrying values and reduced costs.

use crate::error::{SolverError, SolverResult};
use crate::lp_writer::ONE_VAR_CONSTANT;
use crate::results::{SolverResults, TerminationCondition};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

const ROW_PREFIXES: [&str; 5] = ["c_e_", "c_l_", "c_u_", "r_l_", "r_u_"];

/// Map the status line to a termination condition and objective value.
pub fn parse_status_line(line: &str) -> (TerminationCondition, Option<f64>) {
    let lower = line.trim().to_lowercase();
    let objective = lower
        .split("objective value")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|tok| tok.parse::<f64>().ok());

    let tc = if lower.starts_with("optimal") {
        TerminationCondition::Optimal
    } else if lower.contains("infeasible") {
        TerminationCondition::Infeasible
    } else if lower.starts_with("unbounded") {
        TerminationCondition::Unbounded
    } else if lower.starts_with("stopped on time") {
        TerminationCondition::MaxTimeLimit
    } else if lower.starts_with("stopped on iterations") || lower.starts_with("stopped on nodes") {
        TerminationCondition::MaxIterations
    } else if lower.starts_with("stopped on difficulties") {
        TerminationCondition::Error
    } else if lower.starts_with("stopped") {
        // Solution limit or user interrupt; a solution may be present.
        TerminationCondition::Feasible
    } else {
        TerminationCondition::Unknown
    };
    (tc, objective)
}

/// Strip a row prefix and trailing underscore: `c_u_c1_` becomes `c1`.
fn row_symbol(name: &str) -> Option<&str> {
    ROW_PREFIXES.iter().find_map(|p| {
        name.strip_prefix(p)
            .map(|rest| rest.strip_suffix('_').unwrap_or(rest))
    })
}

/// Parse the contents of a CBC solution file.
pub fn parse_solution(solver: &str, text: &str) -> SolverResult<SolverResults> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let status = lines
        .next()
        .ok_or_else(|| SolverError::Parse("empty solution file".to_string()))?;
    let (termination, objective) = parse_status_line(status);
    let mut results = SolverResults::new(solver, termination);
    results.objective = objective;

    for line in lines {
        let mut tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.first() == Some(&"**") {
            tokens.remove(0);
        }
        if tokens.len() < 3 {
            return Err(SolverError::Parse(format!("malformed solution line '{}'", line)));
        }
        let name = tokens[1];
        let value: f64 = tokens[2]
            .parse()
            .map_err(|_| SolverError::Parse(format!("bad value in line '{}'", line)))?;
        let reduced = tokens.get(3).and_then(|t| t.parse::<f64>().ok()).unwrap_or(0.0);

        if name == ONE_VAR_CONSTANT || name == format!("c_e_{}_", ONE_VAR_CONSTANT) {
            continue;
        }
        match row_symbol(name) {
            Some(symbol) => {
                let entry = results.duals.entry(symbol.to_string()).or_insert(0.0);
                if reduced != 0.0 {
                    *entry = reduced;
                }
            }
            None => {
                results.values.insert(name.to_string(), value);
                results.reduced_costs.insert(name.to_string(), reduced);
            }
        }
    }
    debug!(
        solver,
        termination = %results.termination,
        values = results.values.len(),
        "parsed solution file"
    );
    Ok(results)
}

/// Termination read from a CPLEX log, for runs that end without writing a
/// solution file. `None` when the log does not say why.
pub fn parse_cplex_log(solver: &str, log: &str) -> Option<SolverResults> {
    log.lines().find_map(|line| {
        let lower = line.trim().to_lowercase();
        let termination = if lower.contains("infeasible or unbounded") {
            TerminationCondition::Unknown
        } else if lower.contains("dual infeasible") || lower.contains("unbounded") {
            TerminationCondition::Unbounded
        } else if lower.contains("infeasible") || lower.contains("no solution exists") {
            TerminationCondition::Infeasible
        } else {
            return None;
        };
        let mut results = SolverResults::new(solver, termination);
        results.message = Some(line.trim().to_string());
        Some(results)
    })
}

fn cplex_status(status: &str) -> TerminationCondition {
    let status = status.to_lowercase();
    if status.contains("infeasible") {
        TerminationCondition::Infeasible
    } else if status.contains("unbounded") {
        TerminationCondition::Unbounded
    } else if status.contains("optimal") {
        TerminationCondition::Optimal
    } else if status.contains("time limit") {
        TerminationCondition::MaxTimeLimit
    } else if status.contains("limit") {
        TerminationCondition::MaxIterations
    } else if status.contains("feasible") {
        TerminationCondition::Feasible
    } else {
        TerminationCondition::Unknown
    }
}

fn attribute_value(event: &BytesStart, key: &str) -> SolverResult<Option<String>> {
    for attr in event.attributes().with_checks(false) {
        let attr = attr.map_err(|e| SolverError::Parse(e.to_string()))?;
        if attr.key.local_name().as_ref() == key.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| SolverError::Parse(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn number(event: &BytesStart, key: &str) -> SolverResult<Option<f64>> {
    match attribute_value(event, key)? {
        Some(v) => v
            .parse::<f64>()
            .map(Some)
            .map_err(|_| SolverError::Parse(format!("bad {} '{}'", key, v))),
        None => Ok(None),
    }
}

/// Parse a CPLEX XML solution file.
pub fn parse_cplex_solution(solver: &str, text: &str) -> SolverResult<SolverResults> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut results = SolverResults::new(solver, TerminationCondition::Unknown);
    let mut seen_header = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                match e.local_name().as_ref() {
                    b"header" => {
                        seen_header = true;
                        let status = attribute_value(e, "solutionStatusString")?.unwrap_or_default();
                        let tc = cplex_status(&status);
                        results.termination = tc;
                        results.status = crate::results::SolverStatus::from_termination(tc);
                        results.objective = number(e, "objectiveValue")?;
                        results.message = Some(status);
                    }
                    b"variable" => {
                        let name = attribute_value(e, "name")?
                            .ok_or_else(|| SolverError::Parse("variable without name".to_string()))?;
                        if name == ONE_VAR_CONSTANT {
                            continue;
                        }
                        let value = number(e, "value")?.unwrap_or(0.0);
                        results.values.insert(name.clone(), value);
                        if let Some(rc) = number(e, "reducedCost")? {
                            results.reduced_costs.insert(name, rc);
                        }
                    }
                    b"constraint" => {
                        let name = attribute_value(e, "name")?.unwrap_or_default();
                        if let (Some(symbol), Some(dual)) = (row_symbol(&name), number(e, "dual")?) {
                            let entry = results.duals.entry(symbol.to_string()).or_insert(0.0);
                            if dual != 0.0 {
                                *entry = dual;
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SolverError::Parse(e.to_string())),
            _ => {}
        }
    }
    if !seen_header {
        return Err(SolverError::Parse("CPLEX solution has no header".to_string()));
    }
    debug!(
        solver,
        termination = %results.termination,
        values = results.values.len(),
        "parsed CPLEX solution"
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lines() {
        assert_eq!(
            parse_status_line("Optimal - objective value 16.00000000"),
            (TerminationCondition::Optimal, Some(16.0))
        );
        assert_eq!(
            parse_status_line("Infeasible - objective value 0.00000000").0,
            TerminationCondition::Infeasible
        );
        assert_eq!(
            parse_status_line("Integer infeasible - objective value 0").0,
            TerminationCondition::Infeasible
        );
        assert_eq!(
            parse_status_line("Stopped on time - objective value 12.5").0,
            TerminationCondition::MaxTimeLimit
        );
        assert_eq!(
            parse_status_line("Unbounded - objective value 0").0,
            TerminationCondition::Unbounded
        );
        assert_eq!(parse_status_line("garbage").0, TerminationCondition::Unknown);
    }

    #[test]
    fn columns_rows_and_markers() {
        let text = "Optimal - objective value 16.00000000\n\
                    \x20     0 c_u_c1_              6                      1.5\n\
                    \x20     0 x                    4                      0\n\
                    **   1 y                    2                      0.25\n\
                    \x20     2 ONE_VAR_CONSTANT     1                      0\n";
        let r = parse_solution("cbc", text).unwrap();
        assert_eq!(r.objective, Some(16.0));
        assert_eq!(r.values.get("x"), Some(&4.0));
        assert_eq!(r.values.get("y"), Some(&2.0));
        assert_eq!(r.reduced_costs.get("y"), Some(&0.25));
        assert_eq!(r.duals.get("c1"), Some(&1.5));
        assert!(!r.values.contains_key(ONE_VAR_CONSTANT));
    }

    #[test]
    fn malformed_lines_are_errors() {
        assert!(parse_solution("cbc", "").is_err());
        assert!(parse_solution("cbc", "Optimal - objective value 1\n 0 x\n").is_err());
        assert!(parse_solution("cbc", "Optimal - objective value 1\n 0 x abc 0\n").is_err());
    }

    #[test]
    fn cplex_xml_solution() {
        let text = r#"<?xml version = "1.0" encoding="UTF-8" standalone="yes"?>
<CPLEXSolution version="1.2">
 <header problemName="model.lp" objectiveValue="16" solutionStatusValue="101"
   solutionStatusString="integer optimal solution"/>
 <linearConstraints>
  <constraint name="c_u_c1_" index="0" slack="0" dual="1.5"/>
 </linearConstraints>
 <variables>
  <variable name="x" index="0" value="4" reducedCost="0"/>
  <variable name="y" index="1" value="2"/>
  <variable name="ONE_VAR_CONSTANT" index="2" value="1"/>
 </variables>
</CPLEXSolution>
"#;
        let r = parse_cplex_solution("cplex", text).unwrap();
        assert_eq!(r.termination, TerminationCondition::Optimal);
        assert_eq!(r.objective, Some(16.0));
        assert_eq!(r.values.get("x"), Some(&4.0));
        assert_eq!(r.values.get("y"), Some(&2.0));
        assert_eq!(r.duals.get("c1"), Some(&1.5));
        assert_eq!(r.values.len(), 2);
    }

    #[test]
    fn cplex_log_without_solution() {
        let log = "Tried aggregator 1 time.\nMIP - Integer infeasible.\nSolution time = 0.00 sec.\n";
        let results = parse_cplex_log("cplex", log).unwrap();
        assert_eq!(results.termination, TerminationCondition::Infeasible);
        assert_eq!(results.message.as_deref(), Some("MIP - Integer infeasible."));

        let results = parse_cplex_log("cplex", "Dual infeasible - solution unbounded.").unwrap();
        assert_eq!(results.termination, TerminationCondition::Unbounded);
        let results = parse_cplex_log("cplex", "No solution exists.").unwrap();
        assert_eq!(results.termination, TerminationCondition::Infeasible);
        assert!(parse_cplex_log("cplex", "CPLEX Error  1001: Out of memory.").is_none());
    }

    #[test]
    fn cplex_status_strings() {
        assert_eq!(cplex_status("integer infeasible"), TerminationCondition::Infeasible);
        assert_eq!(cplex_status("time limit exceeded"), TerminationCondition::MaxTimeLimit);
        assert_eq!(cplex_status("node limit exceeded, integer feasible"), TerminationCondition::MaxIterations);
        assert!(parse_cplex_solution("cplex", "<CPLEXSolution/>").is_err());
    }
}
