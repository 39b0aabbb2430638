//! Solvers licensed through an ILM token server.
//!
//! Availability is decided by running `ilmlist` and inspecting its report
//! before the solver itself is ever started.

use crate::error::{SolverError, SolverResult};
use crate::results::SolverResults;
use crate::shellcmd::{find_executable, SystemCallSolver};
use amf_core::Model;
use std::process::Command;
use tracing::{debug, info, warn};

/// Decide from `ilmlist` output whether a license token can be had.
///
/// Lines are split on runs of spaces and tabs:
/// - `tokens reserved: N x <user>` for the current user answers directly,
///   available unless `N` is `none` or `0`;
/// - `available tokens: N` means unavailable when `N` is `0` and ends the
///   scan otherwise;
/// - `<host> server ... DOWN.` means unavailable.
///
/// Anything else leaves the answer at available.
pub fn interpret_ilmlist(output: &str, user: Option<&str>) -> bool {
    for line in output.lines() {
        let tokens: Vec<&str> = line
            .trim()
            .split([' ', '\t'])
            .filter(|t| !t.is_empty())
            .collect();
        match tokens.as_slice() {
            ["tokens", "reserved:", count, _, owner] if Some(*owner) == user => {
                return !(*count == "none" || *count == "0");
            }
            ["available", "tokens:", count] => {
                if *count == "0" {
                    return false;
                }
                break;
            }
            [_, "server", _, _, _, "DOWN."] => return false,
            _ => {}
        }
    }
    true
}

/// A [`SystemCallSolver`] gated on an ILM license check.
#[derive(Debug)]
pub struct IlmLicensedSolver {
    inner: SystemCallSolver,
}

impl IlmLicensedSolver {
    pub fn new(inner: SystemCallSolver) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &SystemCallSolver {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut SystemCallSolver {
        &mut self.inner
    }

    pub fn into_inner(self) -> SystemCallSolver {
        self.inner
    }

    /// Whether the executable exists and a license token is available.
    ///
    /// With `assert_available` set the license server is not consulted.
    /// A missing `ilmlist` leaves the answer at available; an `ilmlist`
    /// that cannot be run is an error.
    pub fn available(&self) -> SolverResult<bool> {
        if self.inner.options().assert_available {
            return Ok(true);
        }
        if self.inner.executable().is_err() {
            debug!(solver = self.inner.name(), "solver executable not found");
            return Ok(false);
        }
        let Some(ilmlist) = find_executable("ilmlist", &self.inner.options().search_dirs) else {
            debug!("ilmlist not found, assuming a license is available");
            return Ok(true);
        };

        let mut cmd = Command::new(&ilmlist);
        if cfg!(windows) {
            cmd.arg("-batch");
        }
        let output = cmd.output().map_err(SolverError::ProcessStart)?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let user = std::env::var("USER").ok();
        let available = interpret_ilmlist(&text, user.as_deref());
        info!(solver = self.inner.name(), available, "checked ILM license");
        Ok(available)
    }

    /// Check the license, then solve with the wrapped solver.
    pub fn solve(&self, model: &mut Model) -> SolverResult<SolverResults> {
        if !self.available()? {
            let name = self.inner.name().to_string();
            // Report a missing executable before a missing token.
            self.inner.executable()?;
            warn!(solver = %name, "no license token available");
            return Err(SolverError::LicenseUnavailable(name));
        }
        self.inner.solve(model)
    }
}
