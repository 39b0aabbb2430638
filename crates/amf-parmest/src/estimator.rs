//! Least squares parameter estimation.
//!
//! The objective is the sum of squared errors between measured outputs and
//! model responses over all experiments. It is minimised by Gauss–Newton
//! steps with Levenberg–Marquardt damping; the Jacobian comes from symbolic
//! derivatives of the response expressions.

use crate::error::{EstimationError, EstimationResult};
use crate::experiment::{Experiment, LabeledModel};
use amf_core::Expr;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Damping above which no further progress is attempted.
const MAX_DAMPING: f64 = 1e16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorOptions {
    pub max_iterations: usize,
    /// Relative decrease of the objective treated as converged.
    pub tolerance: f64,
    pub initial_damping: f64,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            tolerance: 1e-12,
            initial_damping: 1e-3,
        }
    }
}

/// Result of one fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    /// Sum of squared errors at `theta`.
    pub objective: f64,
    pub theta: Vec<(String, f64)>,
    pub iterations: usize,
}

impl Estimate {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.theta
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

/// One theta row per bootstrap sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BootstrapTheta {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub objectives: Vec<f64>,
}

impl BootstrapTheta {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column of one parameter.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let k = self.names.iter().position(|n| n == name)?;
        Some(self.rows.iter().map(|row| row[k]).collect())
    }

    pub fn mean(&self, name: &str) -> Option<f64> {
        let column = self.column(name)?;
        if column.is_empty() {
            return None;
        }
        Some(column.iter().sum::<f64>() / column.len() as f64)
    }

    pub fn median(&self, name: &str) -> Option<f64> {
        let mut column = self.column(name)?;
        if column.is_empty() {
            return None;
        }
        column.sort_by(|a, b| a.total_cmp(b));
        let mid = column.len() / 2;
        Some(if column.len() % 2 == 0 {
            (column[mid - 1] + column[mid]) / 2.0
        } else {
            column[mid]
        })
    }
}

/// Labelled models of a set of experiments with their derivatives.
struct Fit {
    models: Vec<LabeledModel>,
    /// `jacobian[m][o][p]`: derivative of output `o` of model `m` by parameter `p`.
    jacobian: Vec<Vec<Vec<Expr>>>,
    names: Vec<String>,
    bounds: Vec<(Option<f64>, Option<f64>)>,
}

impl Fit {
    fn new(models: Vec<LabeledModel>) -> EstimationResult<Self> {
        let first = models.first().ok_or(EstimationError::NoExperiments)?;
        let names = first.parameter_names();
        let bounds = first
            .unknown_parameters
            .iter()
            .map(|v| first.model.var(*v).effective_bounds())
            .collect();
        for (index, m) in models.iter().enumerate().skip(1) {
            let found = m.parameter_names();
            if found != names {
                return Err(EstimationError::ParameterMismatch {
                    index,
                    expected: names.join(", "),
                    found: found.join(", "),
                });
            }
        }
        let jacobian = models
            .iter()
            .map(|m| {
                m.outputs
                    .iter()
                    .map(|o| {
                        m.unknown_parameters
                            .iter()
                            .map(|p| o.response.differentiate(*p))
                            .collect()
                    })
                    .collect()
            })
            .collect();
        Ok(Self {
            models,
            jacobian,
            names,
            bounds,
        })
    }

    fn initial_theta(&self) -> EstimationResult<Vec<f64>> {
        let first = &self.models[0];
        first
            .unknown_parameters
            .iter()
            .map(|v| Ok(first.model.value(*v)?))
            .collect()
    }

    fn clamp(&self, theta: &mut [f64]) {
        for (t, (lb, ub)) in theta.iter_mut().zip(&self.bounds) {
            if let Some(lb) = lb {
                *t = t.max(*lb);
            }
            if let Some(ub) = ub {
                *t = t.min(*ub);
            }
        }
    }

    fn set_theta(&mut self, theta: &[f64]) {
        for m in &mut self.models {
            for (v, t) in m.unknown_parameters.iter().zip(theta) {
                m.model.set_value(*v, *t);
            }
        }
    }

    fn sse(&mut self, theta: &[f64]) -> EstimationResult<f64> {
        self.set_theta(theta);
        let mut total = 0.0;
        for m in &self.models {
            total += m.sse()?;
        }
        Ok(total)
    }

    /// Residuals `response - measured` and their Jacobian at `theta`.
    fn linearize(&mut self, theta: &[f64]) -> EstimationResult<(Vec<f64>, Vec<Vec<f64>>)> {
        self.set_theta(theta);
        let mut residuals = Vec::new();
        let mut rows = Vec::new();
        for (m, derivatives) in self.models.iter().zip(&self.jacobian) {
            for (output, grads) in m.outputs.iter().zip(derivatives) {
                residuals.push(m.model.evaluate(&output.response)? - output.measured);
                rows.push(
                    grads
                        .iter()
                        .map(|g| m.model.evaluate(g))
                        .collect::<Result<Vec<f64>, _>>()?,
                );
            }
        }
        Ok((residuals, rows))
    }

    fn solve(&mut self, options: &EstimatorOptions) -> EstimationResult<Estimate> {
        let p = self.names.len();
        let mut theta = self.initial_theta()?;
        self.clamp(&mut theta);
        let mut sse = self.sse(&theta)?;
        let mut damping = options.initial_damping;

        for iteration in 1..=options.max_iterations {
            let (residuals, jac) = self.linearize(&theta)?;

            let mut jtj = vec![vec![0.0; p]; p];
            let mut jte = vec![0.0; p];
            for (row, e) in jac.iter().zip(&residuals) {
                for i in 0..p {
                    jte[i] += row[i] * e;
                    for j in 0..p {
                        jtj[i][j] += row[i] * row[j];
                    }
                }
            }

            let mut improved = None;
            while damping <= MAX_DAMPING {
                let mut a = jtj.clone();
                for (i, row) in a.iter_mut().enumerate() {
                    row[i] += damping * jtj[i][i].max(1e-12);
                }
                let rhs: Vec<f64> = jte.iter().map(|g| -g).collect();
                if let Some(step) = solve_linear(a, rhs) {
                    let mut candidate: Vec<f64> =
                        theta.iter().zip(&step).map(|(t, d)| t + d).collect();
                    self.clamp(&mut candidate);
                    let candidate_sse = self.sse(&candidate)?;
                    if candidate_sse.is_finite() && candidate_sse < sse {
                        improved = Some((candidate, candidate_sse));
                        damping = (damping / 10.0).max(1e-15);
                        break;
                    }
                }
                damping *= 10.0;
            }

            let Some((candidate, candidate_sse)) = improved else {
                // No descent direction left: stationary point.
                self.set_theta(&theta);
                debug!(iteration, sse, "no further improvement");
                return Ok(self.estimate(theta, sse, iteration));
            };
            let decrease = sse - candidate_sse;
            let step_size = theta
                .iter()
                .zip(&candidate)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            let scale = theta.iter().map(|t| t.abs()).fold(1.0, f64::max);
            theta = candidate;
            sse = candidate_sse;
            if decrease <= options.tolerance * (1.0 + sse)
                || step_size <= options.tolerance.sqrt() * scale
            {
                self.set_theta(&theta);
                debug!(iteration, sse, "converged");
                return Ok(self.estimate(theta, sse, iteration));
            }
        }
        Err(EstimationError::NotConverged {
            iterations: options.max_iterations,
            sse,
        })
    }

    fn estimate(&self, theta: Vec<f64>, sse: f64, iterations: usize) -> Estimate {
        Estimate {
            objective: sse,
            theta: self.names.iter().cloned().zip(theta).collect(),
            iterations,
        }
    }
}

/// Gaussian elimination with partial pivoting; `None` if singular.
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-14 || !a[pivot][col].is_finite() {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

/// Parameter estimator over a list of experiments.
pub struct Estimator<E: Experiment> {
    experiments: Vec<E>,
    options: EstimatorOptions,
}

impl<E: Experiment> Estimator<E> {
    pub fn new(experiments: Vec<E>) -> Self {
        Self {
            experiments,
            options: EstimatorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EstimatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn experiments(&self) -> &[E] {
        &self.experiments
    }

    fn fit_for(&self, indices: &[usize]) -> EstimationResult<Fit> {
        let models = indices
            .iter()
            .map(|&i| self.experiments[i].labeled_model())
            .collect::<EstimationResult<Vec<_>>>()?;
        Fit::new(models)
    }

    fn all_indices(&self) -> Vec<usize> {
        (0..self.experiments.len()).collect()
    }

    /// Names of the unknown parameters.
    pub fn theta_names(&self) -> EstimationResult<Vec<String>> {
        let first = self
            .experiments
            .first()
            .ok_or(EstimationError::NoExperiments)?;
        Ok(first.labeled_model()?.parameter_names())
    }

    /// Least squares estimate over all experiments.
    pub fn theta_est(&self) -> EstimationResult<Estimate> {
        let mut fit = self.fit_for(&self.all_indices())?;
        let estimate = fit.solve(&self.options)?;
        info!(
            objective = estimate.objective,
            iterations = estimate.iterations,
            "parameter estimation finished"
        );
        Ok(estimate)
    }

    /// Sum of squared errors over all experiments at a given theta.
    pub fn objective_at(&self, theta: &[(String, f64)]) -> EstimationResult<f64> {
        let mut fit = self.fit_for(&self.all_indices())?;
        let values = fit
            .names
            .iter()
            .map(|name| {
                theta
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| EstimationError::InvalidData(format!("no value for {}", name)))
            })
            .collect::<EstimationResult<Vec<f64>>>()?;
        fit.sse(&values)
    }

    /// Re-estimate on `samples` resamplings of the experiments.
    ///
    /// Each sample draws as many experiments as there are, with
    /// replacement, and must contain more distinct experiments than there
    /// are parameters. Samples whose fit does not converge are redrawn.
    pub fn theta_est_bootstrap(
        &self,
        samples: usize,
        seed: Option<u64>,
    ) -> EstimationResult<BootstrapTheta> {
        let n = self.experiments.len();
        if n == 0 {
            return Err(EstimationError::NoExperiments);
        }
        let names = self.theta_names()?;
        let min_unique = (names.len() + 1).min(n);
        let mut rng = seed
            .map(StdRng::seed_from_u64)
            .unwrap_or_else(StdRng::from_entropy);

        let mut result = BootstrapTheta {
            names,
            rows: Vec::with_capacity(samples),
            objectives: Vec::with_capacity(samples),
        };
        let max_attempts = 100 * samples.max(1);
        let mut attempts = 0;
        while result.rows.len() < samples {
            attempts += 1;
            if attempts > max_attempts {
                return Err(EstimationError::InvalidData(format!(
                    "could only build {} of {} bootstrap samples",
                    result.rows.len(),
                    samples
                )));
            }
            let mut sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            sample.sort_unstable();
            let unique: BTreeSet<usize> = sample.iter().copied().collect();
            if unique.len() < min_unique {
                continue;
            }
            match self.fit_for(&sample)?.solve(&self.options) {
                Ok(estimate) => {
                    debug!(
                        index = result.rows.len(),
                        ?sample,
                        objective = estimate.objective,
                        "bootstrap sample"
                    );
                    result.rows.push(estimate.theta.iter().map(|(_, v)| *v).collect());
                    result.objectives.push(estimate.objective);
                }
                Err(EstimationError::NotConverged { .. }) => {
                    warn!(?sample, "bootstrap fit did not converge, redrawing");
                }
                Err(e) => return Err(e),
            }
        }
        info!(samples, attempts, "bootstrap finished");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::ExperimentOutput;
    use amf_core::{Domain, Model};

    /// `y = a * x + b` measured at one point.
    struct LinePoint {
        x: f64,
        y: f64,
    }

    impl Experiment for LinePoint {
        fn labeled_model(&self) -> EstimationResult<LabeledModel> {
            let mut m = Model::new("line");
            let a = m.add_var("a", Domain::Reals, (None, None))?;
            let b = m.add_var("b", Domain::Reals, (None, None))?;
            m.set_value(a, 0.0);
            m.set_value(b, 0.0);
            Ok(LabeledModel::new(m)
                .with_parameter(a)
                .with_parameter(b)
                .with_output(ExperimentOutput::new("y", self.y, self.x * a + b)))
        }
    }

    fn line_points() -> Vec<LinePoint> {
        [(0.0, 1.0), (1.0, 3.1), (2.0, 4.9), (3.0, 7.0)]
            .into_iter()
            .map(|(x, y)| LinePoint { x, y })
            .collect()
    }

    #[test]
    fn solves_linear_system() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve_linear(a, vec![3.0, 5.0]).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
        assert!(solve_linear(vec![vec![1.0, 2.0], vec![2.0, 4.0]], vec![1.0, 2.0]).is_none());
    }

    #[test]
    fn fits_a_line() {
        let est = Estimator::new(line_points()).theta_est().unwrap();
        // Closed form least squares: a = 1.98, b = 1.03
        assert!((est.get("a").unwrap() - 1.98).abs() < 1e-6);
        assert!((est.get("b").unwrap() - 1.03).abs() < 1e-6);
        let at = Estimator::new(line_points())
            .objective_at(&[("a".into(), 1.98), ("b".into(), 1.03)])
            .unwrap();
        assert!((est.objective - at).abs() < 1e-9);
    }

    #[test]
    fn no_experiments() {
        let est: Estimator<LinePoint> = Estimator::new(Vec::new());
        assert!(matches!(est.theta_est(), Err(EstimationError::NoExperiments)));
        assert!(est.theta_est_bootstrap(3, Some(1)).is_err());
    }

    #[test]
    fn bootstrap_is_reproducible() {
        let est = Estimator::new(line_points());
        let first = est.theta_est_bootstrap(10, Some(7)).unwrap();
        let second = est.theta_est_bootstrap(10, Some(7)).unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first.names, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(first, second);
        let median = first.median("a").unwrap();
        assert!((median - 1.98).abs() < 0.2);
    }

    #[test]
    fn median_and_mean() {
        let b = BootstrapTheta {
            names: vec!["t".into()],
            rows: vec![vec![3.0], vec![1.0], vec![2.0], vec![10.0]],
            objectives: vec![0.0; 4],
        };
        assert_eq!(b.median("t"), Some(2.5));
        assert_eq!(b.mean("t"), Some(4.0));
        assert_eq!(b.column("u"), None);
    }
}
