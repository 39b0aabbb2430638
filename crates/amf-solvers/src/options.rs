//! Options shared by every solver interface.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Solver options.
///
/// The named fields are understood by every solver; `options` holds
/// solver-specific `key = value` pairs passed through to the executable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Wall clock limit in seconds, `0` for none.
    pub timeout_seconds: u64,
    /// Keep the temporary directory with the problem, solution and log files.
    pub keepfiles: bool,
    /// Directories searched for executables before `~/.amf/solvers` and `PATH`.
    pub search_dirs: Vec<PathBuf>,
    /// Skip availability checks (license probing).
    pub assert_available: bool,
    /// Explicit executable path, overriding the search.
    pub executable: Option<PathBuf>,
    /// Solver specific options.
    pub options: BTreeMap<String, String>,
}

impl SolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_keepfiles(mut self, keep: bool) -> Self {
        self.keepfiles = keep;
        self
    }

    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Set a solver specific option.
    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.options.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Parse `key=value` pairs as given on a command line.
    pub fn parse_assignments<'a, I>(&mut self, pairs: I) -> Result<(), String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for pair in pairs {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected key=value, got '{}'", pair))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(format!("empty option name in '{}'", pair));
            }
            self.set(key, value.trim());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_assignments() {
        let mut opts = SolverOptions::new().with_timeout(30).with_keepfiles(true);
        opts.parse_assignments(["ratioGap=0.01", " threads = 4 "]).unwrap();
        assert_eq!(opts.timeout_seconds, 30);
        assert!(opts.keepfiles);
        assert_eq!(opts.get("ratioGap"), Some("0.01"));
        assert_eq!(opts.get("threads"), Some("4"));
        assert!(opts.parse_assignments(["novalue"]).is_err());
        assert!(opts.parse_assignments(["=3"]).is_err());
    }
}
