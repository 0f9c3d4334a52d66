//! Runtime engine settings
//!
//! Selects step size, horizon, integration scheme and the boundary radii
//! used by the event detector

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::simulation::events::Boundaries;
use crate::simulation::integrator::Scheme;
use crate::simulation::params::PhysicalParameters;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub dt: f64,    // time step
    pub t_max: f64, // simulated duration, measured from the initial state
    pub scheme: Scheme, // euler or rk4
    pub escape_radius: Option<f64>, // defaults to R
    pub collision_radius: Option<f64>, // defaults to r_c
    pub refine_tolerance: f64, // event localisation tolerance, as a fraction of R
    pub max_refinements: usize, // bisection cap
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            t_max: 8.0,
            scheme: Scheme::Euler,
            escape_radius: None,
            collision_radius: None,
            refine_tolerance: 1e-6,
            max_refinements: 20,
        }
    }
}

impl SimulationConfig {
    pub fn new(dt: f64, t_max: f64, scheme: Scheme) -> Self {
        Self {
            dt,
            t_max,
            scheme,
            ..Self::default()
        }
    }

    /// Override the boundary radii
    pub fn with_boundaries(mut self, collision: f64, escape: f64) -> Self {
        self.collision_radius = Some(collision);
        self.escape_radius = Some(escape);
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimError::config(format!("time step must be positive, got {}", self.dt)));
        }
        if !(self.t_max.is_finite() && self.t_max > 0.0) {
            return Err(SimError::config(format!("t_max must be positive, got {}", self.t_max)));
        }
        if !(self.refine_tolerance.is_finite() && self.refine_tolerance > 0.0) {
            return Err(SimError::config(format!(
                "refine tolerance must be positive, got {}",
                self.refine_tolerance
            )));
        }
        if self.max_refinements == 0 {
            return Err(SimError::config("max_refinements must be at least 1"));
        }
        Ok(())
    }

    /// Resolve the boundary radii against `params`
    pub fn boundaries(&self, params: &PhysicalParameters) -> SimResult<Boundaries> {
        let collision = self.collision_radius.unwrap_or(params.central_radius);
        let escape = self.escape_radius.unwrap_or(params.membrane_radius);
        // the field is undefined inside r_c / 2; negated so NaN radii are rejected too
        if !(collision >= 0.5 * params.central_radius && collision < escape && escape.is_finite()) {
            return Err(SimError::InvalidBoundary { collision, escape });
        }
        Ok(Boundaries {
            collision,
            escape,
            tolerance: self.refine_tolerance * params.membrane_radius,
            max_refinements: self.max_refinements,
        })
    }
}
