//! Physical parameters of the membrane system
//!
//! `PhysicalParameters` is immutable for the duration of a run:
//! - central body: mass and radius,
//! - membrane: radius and tension,
//! - gravity, ball mass and linear drag coefficient

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalParameters {
    pub central_mass: f64,   // m_c
    pub central_radius: f64, // r_c, collision radius by default
    pub membrane_radius: f64, // R, escape radius by default
    pub tension: f64,        // T
    pub gravity: f64,        // g
    pub ball_mass: f64,      // m_p
    pub drag: f64,           // c, zero means frictionless
}

impl PhysicalParameters {
    /// Check the invariants `T > 0`, `R > r_c > 0`, `m_p > 0`, `c >= 0`
    pub fn validate(&self) -> SimResult<()> {
        let fields = [
            ("central_mass", self.central_mass),
            ("central_radius", self.central_radius),
            ("membrane_radius", self.membrane_radius),
            ("tension", self.tension),
            ("gravity", self.gravity),
            ("ball_mass", self.ball_mass),
            ("drag", self.drag),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SimError::parameters(format!("{name} is not finite ({value})")));
        }

        if self.tension <= 0.0 {
            return Err(SimError::parameters(format!("tension must be positive, got {}", self.tension)));
        }
        if self.central_radius <= 0.0 {
            return Err(SimError::parameters(format!(
                "central radius must be positive, got {}",
                self.central_radius
            )));
        }
        if self.membrane_radius <= self.central_radius {
            return Err(SimError::parameters(format!(
                "membrane radius {} must exceed central radius {}",
                self.membrane_radius, self.central_radius
            )));
        }
        if self.ball_mass <= 0.0 {
            return Err(SimError::parameters(format!("ball mass must be positive, got {}", self.ball_mass)));
        }
        if self.drag < 0.0 {
            return Err(SimError::parameters(format!("drag must be non-negative, got {}", self.drag)));
        }
        if self.central_mass < 0.0 || self.gravity < 0.0 {
            return Err(SimError::parameters("central mass and gravity must be non-negative"));
        }
        Ok(())
    }

    /// Field strength `k = m_c g / (2 pi T)`
    pub fn field_coefficient(&self) -> f64 {
        self.central_mass * self.gravity / (2.0 * PI * self.tension)
    }

    /// Copy with the calibrated subset (tension, drag) replaced
    pub fn with_fit(&self, tension: f64, drag: f64) -> Self {
        Self {
            tension,
            drag,
            ..*self
        }
    }
}
