use amf_cli::config::AmfConfig;
use amf_solvers::SolverFactory;
use anyhow::{bail, Result};
use tracing::info;

/// Report whether `solver` can run; fails when it cannot.
pub fn handle(solver: &str, config: &AmfConfig) -> Result<()> {
    let factory = SolverFactory::with_defaults();
    let instance = factory.create(solver, config.solver_options())?;
    let classes: Vec<&str> = instance
        .supported_classes()
        .iter()
        .map(|c| c.as_str())
        .collect();
    info!(solver, "checking availability");
    if !instance.available()? {
        bail!("solver {} is not available", solver);
    }
    println!("{}: available ({})", solver, classes.join(", "));
    Ok(())
}
