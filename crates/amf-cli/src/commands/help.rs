use amf_cli::cli::build_cli_command;
use amf_cli::config::AmfConfig;
use amf_solvers::{neos, SolverFactory};
use anyhow::Result;
use std::io::{self, Write};
use tabwriter::TabWriter;
use tracing::debug;

pub fn handle(solvers: bool, neos: bool, config: &AmfConfig) -> Result<()> {
    if !solvers && !neos {
        build_cli_command().print_long_help()?;
        return Ok(());
    }
    if solvers {
        print_solvers(config)?;
    }
    if neos {
        if solvers {
            println!();
        }
        print_neos()?;
    }
    Ok(())
}

fn print_solvers(config: &AmfConfig) -> Result<()> {
    let factory = SolverFactory::with_defaults();
    let mut writer = TabWriter::new(io::stdout()).padding(2);
    writeln!(writer, "SOLVER\tAVAILABLE\tDESCRIPTION")?;
    for (name, doc) in factory.list() {
        let solver = factory.create(name, config.solver_options())?;
        let available = solver.available().unwrap_or_else(|err| {
            debug!(solver = name, error = %err, "availability check failed");
            false
        });
        let marker = if available { "yes" } else { "no" };
        let default = if name == config.solvers.default_solver {
            " (default)"
        } else {
            ""
        };
        writeln!(writer, "{}{}\t{}\t{}", name, default, marker, doc)?;
    }
    writer.flush()?;
    Ok(())
}

fn print_neos() -> Result<()> {
    println!("NEOS solver interfaces:");
    let mut writer = TabWriter::new(io::stdout()).padding(2);
    for (name, doc) in neos::list() {
        writeln!(writer, "  {}\t{}", name, doc)?;
    }
    writer.flush()?;
    Ok(())
}
