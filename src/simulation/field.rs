//! Analytic deformation field of the membrane
//!
//! The central mass pushes the membrane into an axisymmetric well:
//!
//! ```text
//! z(r)  = -k ln(R / r),        k = m_c g / (2 pi T)
//! dz/dx =  k x / r^2,   dz/dy = k y / r^2
//! ```
//!
//! `z` is zero on the rim and negative inside, so `-g grad z` points toward the
//! central mass. The field is singular at the origin; evaluating deeper than
//! `r_c / 2` is a caller bug and fails with [`SimError::Domain`].

use crate::error::{SimError, SimResult};
use crate::simulation::params::PhysicalParameters;
use crate::simulation::states::{NVec2, State};

fn checked_radius(params: &PhysicalParameters, x: f64, y: f64) -> SimResult<f64> {
    let r = x.hypot(y);
    let limit = 0.5 * params.central_radius;
    // `!(r >= limit)` also rejects NaN positions
    if !(r >= limit) {
        return Err(SimError::Domain { r, limit });
    }
    Ok(r)
}

/// Membrane height at `(x, y)`
pub fn height(params: &PhysicalParameters, x: f64, y: f64) -> SimResult<f64> {
    let r = checked_radius(params, x, y)?;
    Ok(-params.field_coefficient() * (params.membrane_radius / r).ln())
}

/// Analytic gradient `(dz/dx, dz/dy)` at `(x, y)`
pub fn gradient(params: &PhysicalParameters, x: f64, y: f64) -> SimResult<NVec2> {
    let r = checked_radius(params, x, y)?;
    let coef = params.field_coefficient() / (r * r);
    Ok(NVec2::new(coef * x, coef * y))
}

/// Gravitational potential energy `m_p g z` of the ball
pub fn potential_energy(params: &PhysicalParameters, state: &State) -> SimResult<f64> {
    Ok(params.ball_mass * params.gravity * height(params, state.pos.x, state.pos.y)?)
}

/// Total mechanical energy `1/2 m_p v^2 + m_p g z`
pub fn mechanical_energy(params: &PhysicalParameters, state: &State) -> SimResult<f64> {
    let kinetic = 0.5 * params.ball_mass * state.vel.norm_squared();
    Ok(kinetic + potential_energy(params, state)?)
}
