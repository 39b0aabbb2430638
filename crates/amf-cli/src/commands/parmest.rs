use amf_cli::cli::RunFormat;
use amf_parmest::{rooney_biegler, BootstrapTheta, Estimate, Estimator};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use tabwriter::TabWriter;
use tracing::info;

#[derive(Debug, Serialize)]
struct ParmestReport {
    experiments: usize,
    estimate: Estimate,
    #[serde(skip_serializing_if = "Option::is_none")]
    bootstrap: Option<BootstrapTheta>,
}

pub fn rooney_biegler(
    data: Option<&Path>,
    bootstrap: usize,
    seed: Option<u64>,
    format: RunFormat,
) -> Result<()> {
    let rows = match data {
        Some(path) => rooney_biegler::read_csv(path)
            .with_context(|| format!("reading data {}", path.display()))?,
        None => rooney_biegler::default_data(),
    };
    let estimator = Estimator::new(rooney_biegler::experiments(&rows));
    let estimate = estimator.theta_est()?;
    info!(
        objective = estimate.objective,
        iterations = estimate.iterations,
        "fitted rooney-biegler"
    );
    let bootstrap = if bootstrap > 0 {
        Some(estimator.theta_est_bootstrap(bootstrap, seed)?)
    } else {
        None
    };

    let report = ParmestReport {
        experiments: rows.len(),
        estimate,
        bootstrap,
    };
    match format {
        RunFormat::Plain => print_report(&report),
        RunFormat::Json => {
            serde_json::to_writer_pretty(io::stdout(), &report)
                .map_err(|err| anyhow!("serializing estimate: {err}"))?;
            println!();
            Ok(())
        }
    }
}

fn print_report(report: &ParmestReport) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout()).padding(2);
    writeln!(writer, "Experiments\t{}", report.experiments)?;
    writeln!(writer, "Objective (SSE)\t{:.6}", report.estimate.objective)?;
    writeln!(writer)?;
    writeln!(writer, "PARAMETER\tESTIMATE")?;
    for (name, value) in &report.estimate.theta {
        writeln!(writer, "{}\t{:.6}", name, value)?;
    }
    if let Some(boot) = &report.bootstrap {
        writeln!(writer)?;
        writeln!(writer, "Bootstrap samples\t{}", boot.len())?;
        writeln!(writer, "PARAMETER\tMEAN\tMEDIAN")?;
        for name in &boot.names {
            let mean = boot.mean(name).unwrap_or(f64::NAN);
            let median = boot.median(name).unwrap_or(f64::NAN);
            writeln!(writer, "{}\t{:.6}\t{:.6}", name, mean, median)?;
        }
    }
    writer.flush()?;
    Ok(())
}
