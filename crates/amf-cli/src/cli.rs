use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::Shell;
use std::path::PathBuf;

const EPILOG: &str = "\
-------------------------------------------------------------------------
amf supports a variety of modeling and optimization capabilities,
which are executed either as subcommands of 'amf' or as separate
commands.  Use the 'help' subcommand to get information about the
capabilities installed with amf.  Additionally, each subcommand
supports independent command-line options.  Use the -h option to
print details for a subcommand.  For example, type

   amf solve -h

to print information about the `solve` subcommand.";

#[derive(Parser, Debug)]
#[command(
    name = "amf",
    author,
    version,
    about = "This is the main driver for the amf optimization software.",
    long_about = None,
    after_help = EPILOG,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Set the logging level (defaults to the configured level)
    #[arg(long, global = true)]
    pub log_level: Option<tracing::Level>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

// Variants are declared in alphabetical order, which is the order clap lists them.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether a solver can run on this machine
    Check {
        /// Registered solver name
        solver: String,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Write a model file in LP format
    Convert {
        /// Model file (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        model: PathBuf,
        /// Output LP file
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: PathBuf,
        /// How rows and columns are labelled
        #[arg(long, value_enum, default_value_t = LabelStyle::Text)]
        labels: LabelStyle,
        /// Also write the symbol map as JSON
        #[arg(long, value_hint = ValueHint::FilePath)]
        symbol_map: Option<PathBuf>,
    },
    /// Print information about amf capabilities
    Help {
        /// List the registered solvers
        #[arg(long)]
        solvers: bool,
        /// List the solvers offered on the NEOS server
        #[arg(long)]
        neos: bool,
    },
    /// List or export the example models
    Library {
        /// Model to export; lists the library when omitted
        name: Option<String>,
        /// Size parameter of sized models
        #[arg(long)]
        size: Option<usize>,
        /// Write the model JSON to a file instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
    /// Parameter estimation
    Parmest {
        #[command(subcommand)]
        command: ParmestCommands,
    },
    /// Solve a model file
    Solve {
        /// Model file (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        model: PathBuf,
        /// Solver name (defaults to the configured solver)
        #[arg(long)]
        solver: Option<String>,
        /// Time limit in seconds, 0 for none
        #[arg(long)]
        timeout: Option<u64>,
        /// Keep the solver's temporary files
        #[arg(long)]
        keepfiles: bool,
        /// Solver option as key=value (repeatable)
        #[arg(short = 'O', long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,
        /// Output format for the results
        #[arg(long, value_enum, default_value_t = RunFormat::Plain)]
        format: RunFormat,
        /// Write the solved model (with values) to this file
        #[arg(long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ParmestCommands {
    /// Fit the Rooney-Biegler BOD model
    RooneyBiegler {
        /// CSV file with `hour,y` columns (defaults to the published data)
        #[arg(long, value_hint = ValueHint::FilePath)]
        data: Option<PathBuf>,
        /// Number of bootstrap samples, 0 to skip
        #[arg(long, default_value_t = 0)]
        bootstrap: usize,
        /// Seed for the bootstrap resampling
        #[arg(long)]
        seed: Option<u64>,
        /// Output format
        #[arg(long, value_enum, default_value_t = RunFormat::Plain)]
        format: RunFormat,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RunFormat {
    Plain,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LabelStyle {
    /// Names derived from the model, e.g. `x(1_2)`
    Text,
    /// Sequential labels `x1`, `c1`, ...
    Numeric,
}

/// The full command, with the version string extended by platform.
pub fn build_cli_command() -> clap::Command {
    Cli::command().version(format!(
        "{} ({} {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_consistent() {
        build_cli_command().debug_assert();
    }

    #[test]
    fn subcommands_are_sorted() {
        let cmd = build_cli_command();
        let names: Vec<&str> = cmd.get_subcommands().map(|c| c.get_name()).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert!(names.contains(&"help"));
    }

    #[test]
    fn parses_solve_options() {
        let cmd = build_cli_command();
        let matches = cmd
            .try_get_matches_from([
                "amf", "solve", "m.json", "--solver", "cbc", "-O", "ratio=0.1", "-O", "sec=5",
                "--format", "json",
            ])
            .unwrap();
        let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches).unwrap();
        match cli.command {
            Some(Commands::Solve {
                solver,
                options,
                format,
                ..
            }) => {
                assert_eq!(solver.as_deref(), Some("cbc"));
                assert_eq!(options, vec!["ratio=0.1", "sec=5"]);
                assert_eq!(format, RunFormat::Json);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
