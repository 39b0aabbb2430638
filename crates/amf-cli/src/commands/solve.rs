use amf_cli::cli::RunFormat;
use amf_cli::config::AmfConfig;
use amf_core::Model;
use amf_solvers::{SolverFactory, SolverResults};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use tabwriter::TabWriter;
use tracing::info;

#[derive(Debug)]
pub struct SolveArgs {
    pub model: PathBuf,
    pub solver: Option<String>,
    pub timeout: Option<u64>,
    pub keepfiles: bool,
    pub options: Vec<String>,
    pub format: RunFormat,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct SolveReport<'a> {
    model: &'a str,
    problem_class: &'static str,
    solver: &'a str,
    status: String,
    termination: String,
    objective: Option<f64>,
    wall_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    values: BTreeMap<String, f64>,
}

pub fn handle(args: &SolveArgs, config: &AmfConfig) -> Result<()> {
    let mut model = Model::read_json(&args.model)
        .with_context(|| format!("reading model {}", args.model.display()))?;
    let solver_name = args
        .solver
        .as_deref()
        .unwrap_or(config.solvers.default_solver.as_str());

    let mut options = config.solver_options();
    if let Some(timeout) = args.timeout {
        options.timeout_seconds = timeout;
    }
    options.keepfiles |= args.keepfiles;
    options
        .parse_assignments(args.options.iter().map(String::as_str))
        .map_err(|err| anyhow!(err))?;

    let mut solver = SolverFactory::with_defaults().create(solver_name, options)?;
    let class = model.problem_class();
    info!(model = model.name(), solver = solver_name, class = %class, "solving");
    let results = solver
        .solve(&mut model)
        .with_context(|| format!("solving {} with {}", args.model.display(), solver_name))?;

    if let Some(path) = &args.output {
        model
            .write_json(path)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    let report = SolveReport {
        model: model.name(),
        problem_class: class.as_str(),
        solver: solver_name,
        status: results.status.to_string(),
        termination: results.termination.to_string(),
        objective: results.objective.or_else(|| {
            results
                .termination
                .has_solution()
                .then(|| model.objective_value().ok())
                .flatten()
        }),
        wall_time: results.wall_time,
        message: results.message.as_deref(),
        values: variable_values(&model, &results),
    };
    match args.format {
        RunFormat::Plain => print_report(&report),
        RunFormat::Json => {
            serde_json::to_writer_pretty(io::stdout(), &report)
                .map_err(|err| anyhow!("serializing results: {err}"))?;
            println!();
            Ok(())
        }
    }
}

/// Values of every variable that has one, by model name.
fn variable_values(model: &Model, results: &SolverResults) -> BTreeMap<String, f64> {
    if !results.termination.has_solution() {
        return BTreeMap::new();
    }
    model
        .vars()
        .filter_map(|(_, data)| data.value.map(|value| (data.name.clone(), value)))
        .collect()
}

fn print_report(report: &SolveReport<'_>) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout()).padding(2);
    writeln!(writer, "Model\t{} ({})", report.model, report.problem_class)?;
    writeln!(writer, "Solver\t{}", report.solver)?;
    writeln!(writer, "Status\t{}", report.status)?;
    writeln!(writer, "Termination\t{}", report.termination)?;
    match report.objective {
        Some(value) => writeln!(writer, "Objective\t{}", value)?,
        None => writeln!(writer, "Objective\t-")?,
    }
    writeln!(writer, "Time (s)\t{:.3}", report.wall_time)?;
    if let Some(message) = report.message {
        writeln!(writer, "Message\t{}", message)?;
    }
    if !report.values.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "VARIABLE\tVALUE")?;
        for (name, value) in &report.values {
            writeln!(writer, "{}\t{}", name, value)?;
        }
    }
    writer.flush()?;
    Ok(())
}
