//! Parameter estimation for AMF models.
//!
//! Each [`Experiment`] builds a labelled model: the unknown parameters
//! (theta), the measured outputs and the expressions predicting them. The
//! [`Estimator`] fits theta by least squares over all experiments and can
//! bootstrap the fit by resampling experiments.
//!
//! ```no_run
//! use amf_parmest::{rooney_biegler, Estimator};
//!
//! let data = rooney_biegler::default_data();
//! let estimator = Estimator::new(rooney_biegler::experiments(&data));
//! let fit = estimator.theta_est()?;
//! let bootstrap = estimator.theta_est_bootstrap(50, Some(4581))?;
//! println!("{:?} {}", fit.theta, bootstrap.len());
//! # Ok::<(), amf_parmest::EstimationError>(())
//! ```

pub mod error;
pub mod estimator;
pub mod experiment;
pub mod rooney_biegler;

pub use error::{EstimationError, EstimationResult};
pub use estimator::{BootstrapTheta, Estimate, Estimator, EstimatorOptions};
pub use experiment::{Experiment, ExperimentOutput, LabeledModel};
