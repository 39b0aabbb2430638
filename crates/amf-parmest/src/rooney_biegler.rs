//! Rooney–Biegler BOD example.
//!
//! Biochemical oxygen demand `y` measured at time `hour`, fitted by
//! `y = asymptote * (1 - exp(-rate_constant * hour))`.
//!
//! Reference: Rooney & Biegler (2001), "Design for model parameter
//! uncertainty using nonlinear confidence regions", AIChE Journal 47(8).

use crate::error::{EstimationError, EstimationResult};
use crate::experiment::{Experiment, ExperimentOutput, LabeledModel};
use amf_core::{Domain, Model};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;

/// One row of the data set.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RooneyBieglerData {
    pub hour: f64,
    pub y: f64,
}

/// The published six point data set.
pub fn default_data() -> Vec<RooneyBieglerData> {
    [(1.0, 8.3), (2.0, 10.3), (3.0, 19.0), (4.0, 16.0), (5.0, 15.6), (7.0, 19.8)]
        .into_iter()
        .map(|(hour, y)| RooneyBieglerData { hour, y })
        .collect()
}

/// Read `hour,y` rows from a CSV file with a header.
pub fn read_csv(path: &Path) -> EstimationResult<Vec<RooneyBieglerData>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: RooneyBieglerData = result?;
        if !row.hour.is_finite() || !row.y.is_finite() {
            return Err(EstimationError::InvalidData(format!(
                "non-finite value in row {}",
                rows.len() + 1
            )));
        }
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(EstimationError::InvalidData(format!(
            "{} has no data rows",
            path.display()
        )));
    }
    Ok(rows)
}

/// One measurement as an experiment.
#[derive(Debug, Clone, Copy)]
pub struct RooneyBieglerExperiment {
    pub data: RooneyBieglerData,
}

impl RooneyBieglerExperiment {
    pub fn new(data: RooneyBieglerData) -> Self {
        Self { data }
    }
}

impl Experiment for RooneyBieglerExperiment {
    fn labeled_model(&self) -> EstimationResult<LabeledModel> {
        let mut m = Model::new("rooney_biegler");
        let asymptote = m.add_var("asymptote", Domain::Reals, (None, None))?;
        let rate = m.add_var("rate_constant", Domain::Reals, (None, None))?;
        let hour = m.add_var("hour", Domain::Reals, (None, None))?;
        m.set_value(asymptote, 15.0);
        m.set_value(rate, 0.5);
        m.fix(hour, self.data.hour);

        let response = asymptote * (1.0 - (-(rate * hour)).exp());
        Ok(LabeledModel::new(m)
            .with_parameter(asymptote)
            .with_parameter(rate)
            .with_output(ExperimentOutput::new("y", self.data.y, response)))
    }
}

/// Experiments for every row of `data`.
pub fn experiments(data: &[RooneyBieglerData]) -> Vec<RooneyBieglerExperiment> {
    data.iter().copied().map(RooneyBieglerExperiment::new).collect()
}
