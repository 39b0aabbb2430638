use amf_cli::cli::{build_cli_command, Cli, Commands, ParmestCommands};
use amf_cli::config::{self, AmfConfig};
use anyhow::Result;
use clap::FromArgMatches;
use std::io;
use std::process;
use tracing::Level;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{check, completions, convert, help, library, parmest, solve};

fn run(cli: Cli, config: &AmfConfig) -> Result<()> {
    match cli.command {
        None => {
            build_cli_command().print_help()?;
            println!();
            Ok(())
        }
        Some(Commands::Check { solver }) => check::handle(&solver, config),
        Some(Commands::Completions { shell, out }) => completions::handle(shell, out.as_deref()),
        Some(Commands::Convert {
            model,
            out,
            labels,
            symbol_map,
        }) => convert::handle(&model, &out, labels, symbol_map.as_deref()),
        Some(Commands::Help { solvers, neos }) => help::handle(solvers, neos, config),
        Some(Commands::Library { name, size, out }) => {
            library::handle(name.as_deref(), size, out.as_deref())
        }
        Some(Commands::Parmest { command }) => match command {
            ParmestCommands::RooneyBiegler {
                data,
                bootstrap,
                seed,
                format,
            } => parmest::rooney_biegler(data.as_deref(), bootstrap, seed, format),
        },
        Some(Commands::Solve {
            model,
            solver,
            timeout,
            keepfiles,
            options,
            format,
            output,
        }) => solve::handle(
            &solve::SolveArgs {
                model,
                solver,
                timeout,
                keepfiles,
                options,
                format,
                output,
            },
            config,
        ),
    }
}

fn main() {
    let matches = build_cli_command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let config = config::load_config();
    let level = cli.log_level.unwrap_or_else(|| {
        config
            .as_ref()
            .map(AmfConfig::log_level)
            .unwrap_or(Level::WARN)
    });
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .init();

    if let Err(err) = config.and_then(|config| run(cli, &config)) {
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }
}
