//! Fitting membrane tension and drag against a measured trajectory.
//!
//! Every trial point runs the trajectory runner from the reference's initial
//! condition with the trial `(T, c)`, then scores the sum of squared distances
//! between reference samples and the simulated positions at the same
//! timestamps. The baseline parameters are never modified.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calibration::optimizer::{NelderMead, OptimizerConfig};
use crate::calibration::reference::ReferenceTrajectory;
use crate::error::{SimError, SimResult};
use crate::simulation::engine::SimulationConfig;
use crate::simulation::params::PhysicalParameters;
use crate::simulation::runner::run;
use crate::simulation::states::NVec2;

/// The calibrated subset of the physical parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitParameters {
    pub tension: f64,
    pub drag: f64,
}

impl FitParameters {
    pub fn new(tension: f64, drag: f64) -> Self {
        Self { tension, drag }
    }
}

/// Inclusive search box for the fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitBounds {
    pub tension: (f64, f64),
    pub drag: (f64, f64),
}

impl FitBounds {
    pub fn new(tension: (f64, f64), drag: (f64, f64)) -> Self {
        Self { tension, drag }
    }

    pub fn validate(&self) -> SimResult<()> {
        let (t_lo, t_hi) = self.tension;
        let (c_lo, c_hi) = self.drag;
        if !(t_lo > 0.0 && t_lo <= t_hi && t_hi.is_finite()) {
            return Err(SimError::config(format!("tension bounds {:?} must satisfy 0 < lo <= hi", self.tension)));
        }
        if !(c_lo >= 0.0 && c_lo <= c_hi && c_hi.is_finite()) {
            return Err(SimError::config(format!("drag bounds {:?} must satisfy 0 <= lo <= hi", self.drag)));
        }
        Ok(())
    }

    pub fn contains(&self, p: &FitParameters) -> bool {
        p.tension >= self.tension.0 && p.tension <= self.tension.1 && p.drag >= self.drag.0 && p.drag <= self.drag.1
    }
}

impl Default for FitBounds {
    fn default() -> Self {
        Self {
            tension: (0.1, 100.0),
            drag: (0.0, 1.0),
        }
    }
}

/// Outcome of a calibration run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationResult {
    pub fit: FitParameters,
    /// Baseline parameters with the fitted tension and drag.
    pub params: PhysicalParameters,
    /// Sum of squared position errors at the best point.
    pub residual: f64,
    pub converged: bool,
    pub iterations: usize,
    /// Best residual after each iteration.
    pub history: Vec<f64>,
}

/// Tension/drag fitter around a fixed baseline.
#[derive(Debug, Clone)]
pub struct Calibrator {
    pub baseline: PhysicalParameters,
    pub config: SimulationConfig,
    pub optimizer: OptimizerConfig,
    /// Initial velocity of the reference; estimated from the samples if `None`.
    pub initial_velocity: Option<NVec2>,
}

impl Calibrator {
    pub fn new(baseline: PhysicalParameters, config: SimulationConfig) -> Self {
        Self {
            baseline,
            config,
            optimizer: OptimizerConfig::default(),
            initial_velocity: None,
        }
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_initial_velocity(mut self, velocity: NVec2) -> Self {
        self.initial_velocity = Some(velocity);
        self
    }

    /// Sum of squared distances between `reference` and the trajectory
    /// simulated with `trial`. Reference times past an early collision or
    /// escape compare against the terminal position.
    pub fn objective(&self, reference: &ReferenceTrajectory, trial: &FitParameters) -> SimResult<f64> {
        let params = self.baseline.with_fit(trial.tension, trial.drag);
        let config = SimulationConfig {
            t_max: reference.duration(),
            ..self.config
        };
        let initial = reference.initial_state(self.initial_velocity);

        let trajectory = run(&params, &config, initial)?;

        Ok(reference
            .samples()
            .iter()
            .map(|s| (s.position() - trajectory.position_at(s.t)).norm_squared())
            .sum())
    }

    /// Fit `(T, c)` to `reference` starting from `guess`.
    pub fn fit(
        &self,
        reference: &ReferenceTrajectory,
        guess: FitParameters,
        bounds: FitBounds,
    ) -> SimResult<CalibrationResult> {
        self.baseline.validate()?;
        self.config.validate()?;
        bounds.validate()?;
        if !bounds.contains(&guess) {
            return Err(SimError::config(format!("initial guess {guess:?} lies outside {bounds:?}")));
        }

        let search = NelderMead::new(self.optimizer.clone(), [bounds.tension, bounds.drag]);
        let minimum = search.minimize([guess.tension, guess.drag], |x| {
            self.objective(reference, &FitParameters::new(x[0], x[1]))
        })?;

        let fit = FitParameters::new(minimum.point[0], minimum.point[1]);
        if minimum.converged {
            info!(tension = fit.tension, drag = fit.drag, residual = minimum.value, iterations = minimum.iterations, "calibration converged");
        } else {
            warn!(tension = fit.tension, drag = fit.drag, residual = minimum.value, "calibration budget exhausted before convergence");
        }

        Ok(CalibrationResult {
            fit,
            params: self.baseline.with_fit(fit.tension, fit.drag),
            residual: minimum.value,
            converged: minimum.converged,
            iterations: minimum.iterations,
            history: minimum.history,
        })
    }
}

/// Fit `(T, c)` with default optimizer settings and an estimated initial velocity.
pub fn fit(
    baseline: &PhysicalParameters,
    config: &SimulationConfig,
    reference: &ReferenceTrajectory,
    guess: FitParameters,
    bounds: FitBounds,
) -> SimResult<CalibrationResult> {
    Calibrator::new(*baseline, *config).fit(reference, guess, bounds)
}
