//! Core state types for the ball on the membrane.
//!
//! - `State`: immutable snapshot of time, position and velocity
//! - `StepResult`: state after one integration step plus its radius
//!
//! States are never mutated in place; every step produces a new value.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

pub type NVec2 = Vector2<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub t: f64,     // time
    pub pos: NVec2, // position (x, y)
    pub vel: NVec2, // velocity (vx, vy)
}

impl State {
    pub fn new(t: f64, pos: NVec2, vel: NVec2) -> Self {
        Self { t, pos, vel }
    }

    pub fn at_rest(t: f64, pos: NVec2) -> Self {
        Self::new(t, pos, NVec2::zeros())
    }

    /// Build a state from a launch speed and an angle in degrees measured from
    /// the inward radial unit vector, counter-clockwise positive.
    ///
    /// `angle_deg = 0` aims straight at the central mass, `90` launches along
    /// the counter-clockwise tangent. At the origin the inward direction is
    /// taken as `-x`.
    pub fn from_speed_angle(t: f64, pos: NVec2, speed: f64, angle_deg: f64) -> Self {
        let r = pos.norm();
        let (inward, tangent) = if r > 1e-12 {
            (-pos / r, NVec2::new(-pos.y, pos.x) / r)
        } else {
            (NVec2::new(-1.0, 0.0), NVec2::new(0.0, 1.0))
        };
        let theta = angle_deg.to_radians();
        let vel = speed * (theta.cos() * inward + theta.sin() * tangent);
        Self::new(t, pos, vel)
    }

    /// Radial distance from the centre of the membrane
    pub fn radius(&self) -> f64 {
        self.pos.norm()
    }

    pub fn speed(&self) -> f64 {
        self.vel.norm()
    }

    /// Componentwise linear blend, `alpha = 0` gives `self`
    pub(crate) fn lerp(&self, other: &State, alpha: f64) -> State {
        State {
            t: self.t + alpha * (other.t - self.t),
            pos: self.pos.lerp(&other.pos, alpha),
            vel: self.vel.lerp(&other.vel, alpha),
        }
    }
}

/// State after one integration step, with the radius computed once so the
/// event detector can reuse it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepResult {
    pub state: State,
    pub r: f64,
}

impl From<State> for StepResult {
    fn from(state: State) -> Self {
        let r = state.radius();
        Self { state, r }
    }
}
