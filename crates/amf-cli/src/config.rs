//! User configuration, read from ~/.amf/config.toml

use amf_solvers::SolverOptions;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main amf configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AmfConfig {
    #[serde(default)]
    pub solvers: SolverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolverConfig {
    /// Solver used by `amf solve` when none is given
    #[serde(default = "default_solver")]
    pub default_solver: String,
    /// Solver timeout in seconds (0 = no timeout)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Keep temporary problem and solution files
    #[serde(default)]
    pub keepfiles: bool,
    /// Directories searched for solver executables before PATH
    #[serde(default)]
    pub search_dirs: Vec<PathBuf>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            default_solver: default_solver(),
            timeout_seconds: default_timeout(),
            keepfiles: false,
            search_dirs: Vec::new(),
        }
    }
}

fn default_solver() -> String {
    "cbc".to_string()
}

fn default_timeout() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl AmfConfig {
    /// Solver options seeded from the `[solvers]` section.
    pub fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            timeout_seconds: self.solvers.timeout_seconds,
            keepfiles: self.solvers.keepfiles,
            search_dirs: self.solvers.search_dirs.clone(),
            ..SolverOptions::default()
        }
    }

    /// Configured log level, falling back to `warn` when it does not parse.
    pub fn log_level(&self) -> tracing::Level {
        self.logging
            .level
            .parse()
            .unwrap_or(tracing::Level::WARN)
    }
}

/// The amf home directory (~/.amf)
pub fn amf_home() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| anyhow!("Cannot determine home directory"))
        .map(|h| h.join(".amf"))
}

/// Location: ~/.amf/config.toml
pub fn config_path() -> Result<PathBuf> {
    Ok(amf_home()?.join("config.toml"))
}

/// Load ~/.amf/config.toml, or the defaults when it does not exist.
pub fn load_config() -> Result<AmfConfig> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<AmfConfig> {
    if !path.exists() {
        return Ok(AmfConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config_to(config: &AmfConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
