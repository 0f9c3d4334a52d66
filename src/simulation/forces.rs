//! Acceleration contributors for the ball
//!
//! The force model is a small set of acceleration terms:
//! - `MembraneSlope`: gravity projected through the membrane gradient
//! - `LinearDrag`: drag proportional to velocity
//!
//! `AccelSet` sums them; it is built once per run from the parameters and is
//! a pure function of the state afterwards.

use crate::error::SimResult;
use crate::simulation::field;
use crate::simulation::params::PhysicalParameters;
use crate::simulation::states::{NVec2, State};

/// Acceleration source acting on the ball
pub trait Acceleration {
    fn acceleration(&self, state: &State) -> SimResult<NVec2>;
}

/// Collection of acceleration terms whose contributions are summed
pub struct AccelSet {
    terms: Vec<Box<dyn Acceleration + Send + Sync>>,
}

impl AccelSet {
    /// Create an empty acceleration set
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Add an acceleration term
    pub fn with<T>(mut self, term: T) -> Self
    where
        T: Acceleration + Send + Sync + 'static,
    {
        self.terms.push(Box::new(term));
        self
    }

    /// Slope gravity plus linear drag for `params`
    pub fn for_params(params: &PhysicalParameters) -> Self {
        Self::new()
            .with(MembraneSlope { params: *params })
            .with(LinearDrag {
                rate: params.drag / params.ball_mass,
            })
    }

    /// Total acceleration of the ball in `state`
    pub fn accumulate(&self, state: &State) -> SimResult<NVec2> {
        let mut total = NVec2::zeros();
        for term in &self.terms {
            total += term.acceleration(state)?;
        }
        Ok(total)
    }
}

impl Default for AccelSet {
    fn default() -> Self {
        Self::new()
    }
}

/// `-g grad z`, pulls the ball down the well
pub struct MembraneSlope {
    pub params: PhysicalParameters,
}

impl Acceleration for MembraneSlope {
    fn acceleration(&self, state: &State) -> SimResult<NVec2> {
        let grad = field::gradient(&self.params, state.pos.x, state.pos.y)?;
        Ok(-self.params.gravity * grad)
    }
}

/// `-(c / m_p) v`
pub struct LinearDrag {
    pub rate: f64,
}

impl Acceleration for LinearDrag {
    fn acceleration(&self, state: &State) -> SimResult<NVec2> {
        Ok(-self.rate * state.vel)
    }
}

/// Acceleration `a = -g grad z - (c / m_p) v` of the ball in `state`
pub fn acceleration(params: &PhysicalParameters, state: &State) -> SimResult<NVec2> {
    AccelSet::for_params(params).accumulate(state)
}
