//! Fixed-step time integrators for the ball
//!
//! Two schemes, dispatched by [`Scheme`]:
//! - semi-implicit (symplectic) Euler, the default
//! - classical 4th-order Runge-Kutta on `(x, y, vx, vy)`
//!
//! Both are pure: the same forces, state and step always produce the same
//! bits.

use serde::{Deserialize, Serialize};

use crate::error::SimResult;
use crate::simulation::engine::SimulationConfig;
use crate::simulation::forces::AccelSet;
use crate::simulation::params::PhysicalParameters;
use crate::simulation::states::{NVec2, State, StepResult};

/// Which integrator advances the state
/// `scheme: "euler"` or `scheme: "rk4"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scheme {
    #[default]
    #[serde(rename = "euler")] // velocity first, then position with the new velocity
    Euler,

    #[serde(rename = "rk4")] // classical Runge-Kutta, higher accuracy per step, not symplectic
    Rk4,
}

/// Advance `state` by exactly `config.dt`
pub fn step(params: &PhysicalParameters, config: &SimulationConfig, state: &State) -> SimResult<StepResult> {
    let forces = AccelSet::for_params(params);
    advance(&forces, config.scheme, state, config.dt)
}

/// Advance `state` by an arbitrary step `h` with the given scheme
pub fn advance(forces: &AccelSet, scheme: Scheme, state: &State, h: f64) -> SimResult<StepResult> {
    let next = match scheme {
        Scheme::Euler => semi_implicit_euler(forces, state, h)?,
        Scheme::Rk4 => rk4(forces, state, h)?,
    };
    Ok(StepResult::from(next))
}

fn semi_implicit_euler(forces: &AccelSet, state: &State, h: f64) -> SimResult<State> {
    let a = forces.accumulate(state)?;

    // Kick: v_n+1 = v_n + h a_n
    let vel = state.vel + h * a;

    // Drift with the updated velocity: x_n+1 = x_n + h v_n+1
    let pos = state.pos + h * vel;

    Ok(State::new(state.t + h, pos, vel))
}

fn rk4(forces: &AccelSet, state: &State, h: f64) -> SimResult<State> {
    let half_h = 0.5 * h;

    // derivative of (x, v) is (v, a(x, v))
    let deriv = |s: &State| -> SimResult<(NVec2, NVec2)> { Ok((s.vel, forces.accumulate(s)?)) };
    let offset = |dt: f64, (dx, dv): (NVec2, NVec2)| {
        State::new(state.t + dt, state.pos + dt * dx, state.vel + dt * dv)
    };

    let k1 = deriv(state)?;
    let k2 = deriv(&offset(half_h, k1))?;
    let k3 = deriv(&offset(half_h, k2))?;
    let k4 = deriv(&offset(h, k3))?;

    let sixth_h = h / 6.0;
    let pos = state.pos + sixth_h * (k1.0 + 2.0 * k2.0 + 2.0 * k3.0 + k4.0);
    let vel = state.vel + sixth_h * (k1.1 + 2.0 * k2.1 + 2.0 * k3.1 + k4.1);

    Ok(State::new(state.t + h, pos, vel))
}
