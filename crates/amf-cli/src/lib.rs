pub mod cli;
pub mod config;

pub use cli::{build_cli_command, Cli, Commands, LabelStyle, ParmestCommands, RunFormat};
pub use config::{load_config, AmfConfig};
