//! Solvers driven by an external executable.
//!
//! A [`SystemCallSolver`] writes the model as an LP file into a temporary
//! directory, runs the executable with a [`CommandDialect`]-specific command
//! line, and reads the solution file back:
//!
//! ```text
//! model ──LpProblem──> model.lp ──cbc/cplex──> model.sol ──> SolverResults
//!                                     └──> stdout/stderr (log)
//! ```

use crate::error::{ExitCode, SolverError, SolverResult};
use crate::lp_writer::LpProblem;
use crate::options::SolverOptions;
use crate::results::SolverResults;
use crate::sol_reader;
use amf_core::{Model, SymbolMap, TextLabeler};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Number of log lines kept in error messages.
const LOG_TAIL_LINES: usize = 20;

/// Time after which a solver given `limit_seconds` is killed. Solvers get
/// `max(1s, 1%)` on top of their own limit to write a time-limited result.
pub fn kill_after(limit_seconds: u64) -> Duration {
    let grace = (limit_seconds / 100).max(1);
    Duration::from_secs(limit_seconds + grace)
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, buf: &mut Vec<u8>) -> std::io::Result<()> {
    match pipe {
        Some(mut pipe) => pipe.read_to_end(buf).await.map(|_| ()),
        None => Ok(()),
    }
}

/// How to talk to one family of solver executables.
pub trait CommandDialect: fmt::Debug + Send + Sync {
    /// Executable name looked up on the search path.
    fn executable(&self) -> &str;

    /// Arguments for solving `problem` and writing `solution`.
    fn arguments(
        &self,
        problem: &Path,
        solution: &Path,
        warm_start: Option<&Path>,
        options: &SolverOptions,
    ) -> Vec<String>;

    /// Parse the solution file.
    fn parse_solution(&self, solver: &str, text: &str) -> SolverResult<SolverResults>;

    /// Results recovered from the log when no solution file was written.
    fn parse_log(&self, _solver: &str, _log: &str) -> Option<SolverResults> {
        None
    }

    /// Write a warm start file; `false` if the dialect has no warm starts.
    fn write_warm_start(&self, _path: &Path, _values: &[(String, f64)]) -> std::io::Result<bool> {
        Ok(false)
    }
}

/// COIN-OR CBC command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CbcDialect;

impl CommandDialect for CbcDialect {
    fn executable(&self) -> &str {
        "cbc"
    }

    fn arguments(
        &self,
        problem: &Path,
        solution: &Path,
        warm_start: Option<&Path>,
        options: &SolverOptions,
    ) -> Vec<String> {
        let mut args = vec!["-import".to_string(), problem.display().to_string()];
        if options.timeout_seconds > 0 {
            args.push("-sec".to_string());
            args.push(options.timeout_seconds.to_string());
        }
        for (key, value) in &options.options {
            args.push(format!("-{}", key));
            args.push(value.clone());
        }
        if let Some(path) = warm_start {
            args.push("-mipStart".to_string());
            args.push(path.display().to_string());
        }
        args.extend(["-printingOptions", "all", "-solve", "-solu"].map(String::from));
        args.push(solution.display().to_string());
        args
    }

    fn parse_solution(&self, solver: &str, text: &str) -> SolverResult<SolverResults> {
        sol_reader::parse_solution(solver, text)
    }

    fn write_warm_start(&self, path: &Path, values: &[(String, f64)]) -> std::io::Result<bool> {
        use std::io::Write;
        let mut f = std::io::BufWriter::new(std::fs::File::create(path)?);
        writeln!(f, "Stopped on iterations - objective value 0")?;
        for (k, (name, value)) in values.iter().enumerate() {
            writeln!(f, "{:>7} {:<22} {:<22} 0", k, name, value)?;
        }
        f.flush()?;
        Ok(true)
    }
}

/// IBM ILOG CPLEX interactive optimizer command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CplexDialect;

impl CommandDialect for CplexDialect {
    fn executable(&self) -> &str {
        "cplex"
    }

    fn arguments(
        &self,
        problem: &Path,
        solution: &Path,
        _warm_start: Option<&Path>,
        options: &SolverOptions,
    ) -> Vec<String> {
        let mut args = vec!["-c".to_string(), format!("read {}", problem.display())];
        if options.timeout_seconds > 0 {
            args.push(format!("set timelimit {}", options.timeout_seconds));
        }
        for (key, value) in &options.options {
            args.push(format!("set {} {}", key.replace('_', " "), value));
        }
        args.push("optimize".to_string());
        args.push(format!("write {}", solution.display()));
        args.push("quit".to_string());
        args
    }

    fn parse_solution(&self, solver: &str, text: &str) -> SolverResult<SolverResults> {
        sol_reader::parse_cplex_solution(solver, text)
    }

    fn parse_log(&self, solver: &str, log: &str) -> Option<SolverResults> {
        sol_reader::parse_cplex_log(solver, log)
    }
}

/// Locate an executable: explicit search dirs, `~/.amf/solvers`, then `PATH`.
pub fn find_executable(name: &str, search_dirs: &[PathBuf]) -> Option<PathBuf> {
    for dir in search_dirs {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    if let Some(home) = dirs::home_dir() {
        let candidate = home.join(".amf").join("solvers").join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    which::which(name).ok()
}

fn log_tail(log: &str) -> String {
    let lines: Vec<&str> = log.lines().collect();
    let start = lines.len().saturating_sub(LOG_TAIL_LINES);
    lines[start..].join("\n")
}

/// A solver run as an external process.
#[derive(Debug)]
pub struct SystemCallSolver {
    name: String,
    dialect: Box<dyn CommandDialect>,
    options: SolverOptions,
}

impl SystemCallSolver {
    pub fn new(name: &str, dialect: Box<dyn CommandDialect>, options: SolverOptions) -> Self {
        Self {
            name: name.to_string(),
            dialect,
            options,
        }
    }

    pub fn cbc(options: SolverOptions) -> Self {
        Self::new("cbc", Box::new(CbcDialect), options)
    }

    pub fn cplex(options: SolverOptions) -> Self {
        Self::new("cplex", Box::new(CplexDialect), options)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut SolverOptions {
        &mut self.options
    }

    pub fn dialect(&self) -> &dyn CommandDialect {
        self.dialect.as_ref()
    }

    /// Path of the solver executable.
    pub fn executable(&self) -> SolverResult<PathBuf> {
        if let Some(path) = &self.options.executable {
            if path.is_file() {
                return Ok(path.clone());
            }
            return Err(SolverError::NotInstalled(path.display().to_string()));
        }
        find_executable(self.dialect.executable(), &self.options.search_dirs)
            .ok_or_else(|| SolverError::NotInstalled(self.dialect.executable().to_string()))
    }

    /// True if the executable can be found.
    pub fn available(&self) -> bool {
        self.options.assert_available || self.executable().is_ok()
    }

    /// Solve an already lowered problem.
    pub async fn solve_problem(
        &self,
        problem: &LpProblem,
        warm_start: &[(String, f64)],
    ) -> SolverResult<SolverResults> {
        let start = Instant::now();
        let executable = self.executable()?;
        let workdir = tempfile::Builder::new().prefix("amf_").tempdir()?;
        let problem_path = workdir.path().join("model.lp");
        let solution_path = workdir.path().join("model.sol");
        problem.write_file(&problem_path)?;

        let warm_start_path = workdir.path().join("model.mst");
        let warm_start = if !warm_start.is_empty()
            && self.dialect.write_warm_start(&warm_start_path, warm_start)?
        {
            Some(warm_start_path.as_path())
        } else {
            None
        };

        let args = self
            .dialect
            .arguments(&problem_path, &solution_path, warm_start, &self.options);
        info!(solver = %self.name, executable = %executable.display(), "starting solver");
        debug!(?args, "solver command line");

        let mut child = Command::new(&executable)
            .args(&args)
            .current_dir(workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(SolverError::ProcessStart)?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let run = async {
            let (status, out_read, err_read) =
                tokio::join!(child.wait(), drain(stdout, &mut out), drain(stderr, &mut err));
            out_read.and(err_read).and(status)
        };
        let waited = if self.options.timeout_seconds > 0 {
            timeout(kill_after(self.options.timeout_seconds), run).await
        } else {
            Ok(run.await)
        };

        let mut log = String::from_utf8_lossy(&out).into_owned();
        log.push_str(&String::from_utf8_lossy(&err));
        let status = match waited {
            Ok(status) => status?,
            Err(_) => {
                warn!(solver = %self.name, seconds = self.options.timeout_seconds, "solver timed out");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "could not kill solver");
                }
                let message = log_tail(&log);
                self.finish(workdir, &log);
                return Err(SolverError::Timeout {
                    seconds: self.options.timeout_seconds,
                    message,
                });
            }
        };

        let exit_code = ExitCode::from_raw(status.code().unwrap_or(-1));
        if !exit_code.is_success() {
            self.finish(workdir, &log);
            return Err(SolverError::ProcessFailed {
                exit_code,
                message: log_tail(&log),
            });
        }

        let text = match std::fs::read_to_string(&solution_path) {
            Ok(text) => text,
            Err(_) => {
                if let Some(mut results) = self.dialect.parse_log(&self.name, &log) {
                    results.wall_time = start.elapsed().as_secs_f64();
                    results.log = log;
                    self.finish(workdir, &results.log);
                    info!(
                        solver = %self.name,
                        termination = %results.termination,
                        "no solution file, status read from the log"
                    );
                    return Ok(results);
                }
                let tail = log_tail(&log);
                self.finish(workdir, &log);
                return Err(SolverError::Parse(format!(
                    "solver did not write a solution file\n{}",
                    tail
                )));
            }
        };
        let mut results = self.dialect.parse_solution(&self.name, &text)?;
        results.wall_time = start.elapsed().as_secs_f64();
        results.log = log;
        self.finish(workdir, &results.log);
        info!(
            solver = %self.name,
            termination = %results.termination,
            seconds = results.wall_time,
            "solver finished"
        );
        Ok(results)
    }

    /// Blocking wrapper around [`SystemCallSolver::solve_problem`].
    ///
    /// Must not be called from inside a tokio runtime.
    pub fn solve_problem_blocking(
        &self,
        problem: &LpProblem,
        warm_start: &[(String, f64)],
    ) -> SolverResult<SolverResults> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.solve_problem(problem, warm_start))
    }

    /// Lower `model`, solve it and load the values back.
    pub async fn solve_async(&self, model: &mut Model) -> SolverResult<SolverResults> {
        let mut symbol_map = SymbolMap::new();
        let problem = self.lower(model, &mut symbol_map)?;
        let results = self.solve_problem(&problem, &[]).await?;
        Self::load(&results, model, &symbol_map);
        Ok(results)
    }

    /// Blocking variant of [`SystemCallSolver::solve_async`].
    pub fn solve(&self, model: &mut Model) -> SolverResult<SolverResults> {
        let mut symbol_map = SymbolMap::new();
        let problem = self.lower(model, &mut symbol_map)?;
        let results = self.solve_problem_blocking(&problem, &[])?;
        Self::load(&results, model, &symbol_map);
        Ok(results)
    }

    fn lower(&self, model: &Model, symbol_map: &mut SymbolMap) -> SolverResult<LpProblem> {
        LpProblem::from_model(model, symbol_map, &mut TextLabeler)
    }

    pub(crate) fn load(results: &SolverResults, model: &mut Model, symbol_map: &SymbolMap) {
        if results.termination.has_solution() {
            results.load_into(model, symbol_map);
        } else {
            warn!(
                solver = %results.solver,
                termination = %results.termination,
                "no solution to load"
            );
        }
    }

    fn finish(&self, workdir: tempfile::TempDir, log: &str) {
        if !self.options.keepfiles {
            return;
        }
        let path = workdir.into_path();
        if let Err(e) = std::fs::write(path.join("model.log"), log) {
            warn!(error = %e, "could not write solver log");
        }
        info!(path = %path.display(), "kept solver files");
    }
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use super::*;
    use crate::results::TerminationCondition;
    use amf_core::{Domain, Sense};
    use std::os::unix::fs::PermissionsExt;

    /// Write an executable shell script into `dir`.
    pub(crate) fn fake_solver(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    /// A fake `cbc` writing a fixed solution to the `-solu` argument.
    pub(crate) const FAKE_CBC: &str = r#"sol=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-solu" ]; then sol="$2"; fi
  shift
done
echo "Welcome to the CBC MILP Solver"
cat > "$sol" <<'EOF'
Optimal - objective value 16.00000000
      0 c_u_c1_              6                      1
      0 x                    4                      0
      1 y                    2                      0
EOF"#;

    pub(crate) fn small_model() -> Model {
        let mut m = Model::new("small");
        let x = m.add_var("x", Domain::NonNegativeReals, (None, Some(4.0))).unwrap();
        let y = m.add_var("y", Domain::NonNegativeIntegers, (None, None)).unwrap();
        m.add_constraint("c1", (x + y).leq(6.0)).unwrap();
        m.set_objective("obj", 3.0 * x + 2.0 * y, Sense::Maximize).unwrap();
        m
    }

    #[test]
    fn cbc_arguments() {
        let mut opts = SolverOptions::new().with_timeout(10);
        opts.set("ratioGap", 0.01);
        let args = CbcDialect.arguments(Path::new("m.lp"), Path::new("m.sol"), None, &opts);
        assert_eq!(
            args,
            vec![
                "-import", "m.lp", "-sec", "10", "-ratioGap", "0.01", "-printingOptions", "all",
                "-solve", "-solu", "m.sol"
            ]
        );
    }

    #[test]
    fn cplex_arguments() {
        let mut opts = SolverOptions::new();
        opts.set("mip_tolerances_mipgap", 0.001);
        let args = CplexDialect.arguments(Path::new("m.lp"), Path::new("m.sol"), None, &opts);
        assert_eq!(args[0], "-c");
        assert_eq!(args[1], "read m.lp");
        assert!(args.contains(&"set mip tolerances mipgap 0.001".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("quit"));
    }

    #[test]
    fn solves_with_fake_executable() {
        let dir = tempfile::tempdir().unwrap();
        fake_solver(dir.path(), "cbc", FAKE_CBC);
        let solver = SystemCallSolver::cbc(SolverOptions::new().with_search_dir(dir.path()));
        assert!(solver.available());

        let mut m = small_model();
        let results = solver.solve(&mut m).unwrap();
        assert_eq!(results.termination, TerminationCondition::Optimal);
        assert!(results.log.contains("Welcome to the CBC"));
        assert_eq!(results.duals.get("c1"), Some(&1.0));
        let x = m.var_by_name("x").unwrap();
        assert_eq!(m.value(x).unwrap(), 4.0);
        assert_eq!(m.objective_value().unwrap(), 16.0);
    }

    #[tokio::test]
    async fn async_solve_matches_blocking() {
        let dir = tempfile::tempdir().unwrap();
        fake_solver(dir.path(), "cbc", FAKE_CBC);
        let solver = SystemCallSolver::cbc(SolverOptions::new().with_search_dir(dir.path()));
        let mut m = small_model();
        let results = solver.solve_async(&mut m).await.unwrap();
        assert_eq!(results.objective, Some(16.0));
    }

    #[test]
    fn nonzero_exit_is_an_error_with_log() {
        let dir = tempfile::tempdir().unwrap();
        fake_solver(dir.path(), "cbc", "echo 'license expired'\nexit 2");
        let solver = SystemCallSolver::cbc(SolverOptions::new().with_search_dir(dir.path()));
        match solver.solve(&mut small_model()) {
            Err(SolverError::ProcessFailed { exit_code, message }) => {
                assert_eq!(exit_code, ExitCode::SolverError);
                assert!(message.contains("license expired"));
            }
            other => panic!("expected process failure, got {:?}", other),
        }
    }

    #[test]
    fn missing_solution_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fake_solver(dir.path(), "cbc", "echo nothing to see");
        let solver = SystemCallSolver::cbc(SolverOptions::new().with_search_dir(dir.path()));
        let err = solver.solve(&mut small_model()).unwrap_err();
        assert!(err.to_string().contains("did not write a solution file"));
    }

    #[test]
    fn timeout_kills_the_process() {
        let dir = tempfile::tempdir().unwrap();
        fake_solver(dir.path(), "cbc", "echo 'Cbc0010I started'\nsleep 30");
        let solver = SystemCallSolver::cbc(
            SolverOptions::new().with_search_dir(dir.path()).with_timeout(1),
        );
        let started = Instant::now();
        match solver.solve(&mut small_model()) {
            Err(SolverError::Timeout { seconds, message }) => {
                assert_eq!(seconds, 1);
                assert!(message.contains("Cbc0010I started"));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed.as_secs() < 20);
    }

    #[test]
    fn grace_period_scales_with_limit() {
        assert_eq!(kill_after(1), Duration::from_secs(2));
        assert_eq!(kill_after(300), Duration::from_secs(303));
        assert_eq!(kill_after(50), Duration::from_secs(51));
    }

    #[test]
    fn time_limited_result_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fake_solver(
            dir.path(),
            "cbc",
            r#"sol=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-solu" ]; then sol="$2"; fi
  shift
done
cat > "$sol" <<'EOF'
Stopped on time - objective value 14.00000000
      0 x                    4                      0
      1 y                    1                      0
EOF"#,
        );
        let solver = SystemCallSolver::cbc(
            SolverOptions::new().with_search_dir(dir.path()).with_timeout(1),
        );
        let results = solver.solve(&mut small_model()).unwrap();
        assert_eq!(results.termination, TerminationCondition::MaxTimeLimit);
        assert_eq!(results.objective, Some(14.0));
    }

    #[test]
    fn cplex_infeasible_log_without_solution_file() {
        let dir = tempfile::tempdir().unwrap();
        fake_solver(
            dir.path(),
            "cplex",
            "echo 'Welcome to IBM(R) ILOG(R) CPLEX(R) Interactive Optimizer'\necho 'MIP - Integer infeasible.'",
        );
        let solver = SystemCallSolver::cplex(SolverOptions::new().with_search_dir(dir.path()));
        let mut m = small_model();
        let results = solver.solve(&mut m).unwrap();
        assert_eq!(results.termination, TerminationCondition::Infeasible);
        assert!(results.log.contains("Integer infeasible"));
        let x = m.var_by_name("x").unwrap();
        assert!(m.value(x).is_err());
    }

    #[test]
    fn missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let solver = SystemCallSolver::new(
            "nosuch",
            Box::new(CbcDialect),
            SolverOptions::new().with_executable(dir.path().join("nosuch")),
        );
        assert!(!solver.available());
        assert!(matches!(solver.executable(), Err(SolverError::NotInstalled(_))));
    }
}
