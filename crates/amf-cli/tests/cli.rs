use amf_core::{Domain, Model, Sense};
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// `amf` with HOME pointed at `home`, so no user configuration leaks in.
fn amf(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("amf").unwrap();
    cmd.env("HOME", home).env_remove("RUST_LOG");
    cmd
}

fn small_lp(path: &Path, integer_y: bool) {
    let mut m = Model::new("small");
    let x = m
        .add_var("x", Domain::NonNegativeReals, (None, Some(4.0)))
        .unwrap();
    let domain = if integer_y {
        Domain::NonNegativeIntegers
    } else {
        Domain::NonNegativeReals
    };
    let y = m.add_var("y", domain, (None, None)).unwrap();
    m.add_constraint("c1", (x + y).leq(6.0)).unwrap();
    m.set_objective("obj", 3.0 * x + 2.0 * y, Sense::Maximize)
        .unwrap();
    m.write_json(path).unwrap();
}

#[test]
fn help_shows_description_and_epilog() {
    let home = tempdir().unwrap();
    amf(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "This is the main driver for the amf optimization software.",
        ))
        .stdout(predicate::str::contains("amf solve -h"));
}

#[test]
fn help_lists_subcommands_in_order() {
    let home = tempdir().unwrap();
    let output = amf(home.path()).arg("--help").output().unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let positions: Vec<usize> = [
        "check",
        "completions",
        "convert",
        "help",
        "library",
        "parmest",
        "solve",
    ]
    .iter()
    .map(|name| stdout.find(&format!("  {}", name)).unwrap())
    .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted);
}

#[test]
fn version_includes_platform() {
    let home = tempdir().unwrap();
    amf(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!(
            "amf {} ({}",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS
        )));
}

#[test]
fn help_neos_lists_solvers() {
    let home = tempdir().unwrap();
    amf(home.path())
        .args(["help", "--neos"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NEOS solver interfaces"))
        .stdout(predicate::str::contains("Lipschitz-Continuous Global Optimizer"));
}

#[test]
fn help_solvers_marks_default() {
    let home = tempdir().unwrap();
    amf(home.path())
        .args(["help", "--solvers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cbc (default)"))
        .stdout(predicate::str::contains("cbc_persistent"))
        .stdout(predicate::str::contains("cplex"));
}

#[test]
fn library_lists_models() {
    let home = tempdir().unwrap();
    amf(home.path())
        .arg("library")
        .assert()
        .success()
        .stdout(predicate::str::contains("lqcp"))
        .stdout(predicate::str::contains("simple_minlp3"));
}

#[test]
fn library_export_and_convert() {
    let home = tempdir().unwrap();
    let dir = tempdir().unwrap();
    let model = dir.path().join("lqcp.json");
    let lp = dir.path().join("lqcp.lp");
    let symbols = dir.path().join("symbols.json");

    amf(home.path())
        .args(["library", "lqcp", "--size", "3", "-o"])
        .arg(&model)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote lqcp"));
    assert!(model.exists());

    amf(home.path())
        .arg("convert")
        .arg(&model)
        .arg("-o")
        .arg(&lp)
        .arg("--symbol-map")
        .arg(&symbols)
        .assert()
        .success();
    let text = fs::read_to_string(&lp).unwrap();
    assert!(text.starts_with("\\* Source model name=lqcp *\\"));
    assert!(text.contains("y(3_1)"));

    let map: Value = serde_json::from_str(&fs::read_to_string(&symbols).unwrap()).unwrap();
    assert_eq!(map["y(3_1)"], "y[3,1]");
}

#[test]
fn convert_with_numeric_labels() {
    let home = tempdir().unwrap();
    let dir = tempdir().unwrap();
    let model = dir.path().join("small.json");
    let lp = dir.path().join("small.lp");
    small_lp(&model, true);

    amf(home.path())
        .arg("convert")
        .arg(&model)
        .args(["--labels", "numeric", "-o"])
        .arg(&lp)
        .assert()
        .success();
    let text = fs::read_to_string(&lp).unwrap();
    assert!(text.contains("+3 x1"));
    assert!(text.contains("+2 x2"));
}

#[test]
fn convert_rejects_nonlinear_constraint() {
    let home = tempdir().unwrap();
    let dir = tempdir().unwrap();
    let model = dir.path().join("minlp3.json");
    amf(home.path())
        .args(["library", "simple_minlp3", "-o"])
        .arg(&model)
        .assert()
        .success();

    amf(home.path())
        .arg("convert")
        .arg(&model)
        .arg("-o")
        .arg(dir.path().join("minlp3.lp"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("const1"));
}

#[test]
fn solve_unknown_solver_fails() {
    let home = tempdir().unwrap();
    let dir = tempdir().unwrap();
    let model = dir.path().join("small.json");
    small_lp(&model, false);
    amf(home.path())
        .arg("solve")
        .arg(&model)
        .args(["--solver", "gurobi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown solver 'gurobi'"));
}

#[test]
fn solve_missing_model_fails() {
    let home = tempdir().unwrap();
    amf(home.path())
        .args(["solve", "does-not-exist.json", "--solver", "clarabel"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.json"));
}

#[cfg(feature = "solver-clarabel")]
#[test]
fn solve_with_clarabel_json() {
    let home = tempdir().unwrap();
    let dir = tempdir().unwrap();
    let model = dir.path().join("small.json");
    let solved = dir.path().join("solved.json");
    small_lp(&model, false);

    let output = amf(home.path())
        .arg("solve")
        .arg(&model)
        .args(["--solver", "clarabel", "--format", "json", "--output"])
        .arg(&solved)
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["termination"], "optimal");
    assert_eq!(report["problem_class"], "LP");
    let objective = report["objective"].as_f64().unwrap();
    assert!((objective - 16.0).abs() < 1e-3);
    let x = report["values"]["x"].as_f64().unwrap();
    assert!((x - 4.0).abs() < 1e-4);

    let m = Model::read_json(&solved).unwrap();
    let y = m.var_by_name("y").unwrap();
    assert!((m.value(y).unwrap() - 2.0).abs() < 1e-4);
}

#[cfg(unix)]
#[test]
fn solve_with_configured_cbc() {
    use std::os::unix::fs::PermissionsExt;

    let home = tempdir().unwrap();
    let bin = tempdir().unwrap();
    let script = bin.path().join("cbc");
    fs::write(
        &script,
        r#"#!/bin/sh
sol=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-solu" ]; then sol="$2"; fi
  shift
done
cat > "$sol" <<'EOF'
Optimal - objective value 16.00000000
      0 c_u_c1_              6                      1
      0 x                    4                      0
      1 y                    2                      0
EOF
"#,
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let config_dir = home.path().join(".amf");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        format!(
            "[solvers]\nsearch_dirs = [\"{}\"]\n",
            bin.path().display()
        ),
    )
    .unwrap();

    let dir = tempdir().unwrap();
    let model = dir.path().join("small.json");
    small_lp(&model, true);

    amf(home.path())
        .args(["check", "cbc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cbc: available (LP, MILP)"));

    amf(home.path())
        .arg("solve")
        .arg(&model)
        .args(["-O", "ratioGap=0.01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("optimal"))
        .stdout(predicate::str::contains("16"));
}

#[test]
fn malformed_config_is_reported() {
    let home = tempdir().unwrap();
    let config_dir = home.path().join(".amf");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), "[solvers\n").unwrap();
    amf(home.path())
        .arg("library")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config.toml"));
}

#[test]
fn parmest_rooney_biegler() {
    let home = tempdir().unwrap();
    amf(home.path())
        .args(["parmest", "rooney-biegler"])
        .assert()
        .success()
        .stdout(predicate::str::contains("asymptote"))
        .stdout(predicate::str::contains("19.14"))
        .stdout(predicate::str::contains("0.531"));
}

#[test]
fn parmest_bootstrap_json() {
    let home = tempdir().unwrap();
    let output = amf(home.path())
        .args([
            "parmest",
            "rooney-biegler",
            "--bootstrap",
            "10",
            "--seed",
            "4581",
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["experiments"], 6);
    assert_eq!(report["bootstrap"]["rows"].as_array().unwrap().len(), 10);
}

#[test]
fn completions_to_file() {
    let home = tempdir().unwrap();
    let dir = tempdir().unwrap();
    let out = dir.path().join("amf.bash");
    amf(home.path())
        .args(["completions", "bash", "--out"])
        .arg(&out)
        .assert()
        .success();
    assert!(fs::read_to_string(&out).unwrap().contains("amf"));
}
