//! Trajectory runner
//!
//! [`Simulation`] is the step-by-step state machine
//! (`Running -> Running | Escaped | Collided | TimedOut`); [`run`] drives one
//! to completion and hands back the finished [`Trajectory`].
//!
//! A host that wants to cancel simply stops calling [`Simulation::advance`].

use serde::Serialize;
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::simulation::engine::SimulationConfig;
use crate::simulation::events::{attempt, detect, detect_blocked, Boundaries, Outcome, OutcomeKind};
use crate::simulation::field;
use crate::simulation::forces::AccelSet;
use crate::simulation::params::PhysicalParameters;
use crate::simulation::states::{NVec2, State};

/// Time-ordered states plus the terminal outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    pub states: Vec<State>,
    pub outcome: Outcome,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }

    pub fn initial_state(&self) -> &State {
        &self.states[0]
    }

    pub fn final_state(&self) -> &State {
        &self.outcome.state
    }

    /// Position at time `t`, linearly interpolated between recorded states.
    /// Times outside the recorded span clamp to the first or last state.
    pub fn position_at(&self, t: f64) -> NVec2 {
        let states = &self.states;
        let idx = states.partition_point(|s| s.t <= t);
        if idx == 0 {
            return states[0].pos;
        }
        if idx == states.len() {
            return states[idx - 1].pos;
        }
        let (a, b) = (&states[idx - 1], &states[idx]);
        let span = b.t - a.t;
        if span <= 0.0 {
            return b.pos;
        }
        a.pos.lerp(&b.pos, (t - a.t) / span)
    }

    pub fn radii(&self) -> Vec<f64> {
        self.states.iter().map(State::radius).collect()
    }

    pub fn min_radius(&self) -> f64 {
        self.states.iter().map(State::radius).fold(f64::INFINITY, f64::min)
    }

    pub fn max_radius(&self) -> f64 {
        self.states.iter().map(State::radius).fold(0.0, f64::max)
    }

    /// Mechanical energy of every recorded state
    pub fn energies(&self, params: &PhysicalParameters) -> SimResult<Vec<f64>> {
        self.states.iter().map(|s| field::mechanical_energy(params, s)).collect()
    }
}

/// Where a [`Simulation`] currently stands
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    Running,
    Finished(Outcome),
}

/// Step-by-step trajectory runner owning the states produced so far
pub struct Simulation {
    config: SimulationConfig,
    boundaries: Boundaries,
    forces: AccelSet,
    t_end: f64,
    current: State,
    states: Vec<State>,
    status: Status,
}

impl Simulation {
    /// Validate the inputs and record the initial state.
    ///
    /// A ball already on a boundary finishes immediately at its initial time.
    pub fn new(params: &PhysicalParameters, config: &SimulationConfig, initial: State) -> SimResult<Self> {
        params.validate()?;
        config.validate()?;
        let boundaries = config.boundaries(params)?;

        let r0 = initial.radius();
        // negated so that NaN positions are rejected as well
        if !(r0 >= params.central_radius && r0 <= params.membrane_radius) {
            return Err(SimError::InvalidInitialState {
                r: r0,
                min: params.central_radius,
                max: params.membrane_radius,
            });
        }

        let status = match boundaries.classify(r0) {
            Some(kind) => Status::Finished(Outcome::new(kind, initial)),
            None => Status::Running,
        };

        debug!(r0, dt = config.dt, t_max = config.t_max, scheme = ?config.scheme, "simulation start");

        Ok(Self {
            config: *config,
            boundaries,
            forces: AccelSet::for_params(params),
            t_end: initial.t + config.t_max,
            current: initial,
            states: vec![initial],
            status,
        })
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn current(&self) -> &State {
        &self.current
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Take one step and check it for a boundary crossing.
    /// Does nothing once the simulation has finished.
    pub fn advance(&mut self) -> SimResult<Status> {
        if let Status::Finished(_) = self.status {
            return Ok(self.status);
        }

        let prev = self.current;
        // last step is resized so the run ends exactly at t_end, without
        // leaving a sliver step behind from accumulated rounding
        let remaining = self.t_end - prev.t;
        let last = remaining <= self.config.dt * (1.0 + 1e-9);
        let h = if last { remaining } else { self.config.dt };
        let Some(next) = attempt(&self.forces, self.config.scheme, &prev, h)? else {
            // a stage reached the forbidden core, so the ball is falling in
            let outcome = detect_blocked(&self.forces, self.config.scheme, &self.boundaries, &prev, h)?;
            return Ok(self.conclude(outcome));
        };

        if let Some(outcome) = detect(&self.forces, self.config.scheme, &self.boundaries, &prev, &next)? {
            return Ok(self.conclude(outcome));
        }

        self.current = next.state;
        self.states.push(next.state);
        if last {
            self.status = Status::Finished(Outcome::new(OutcomeKind::TimedOut, next.state));
        }
        Ok(self.status)
    }

    fn conclude(&mut self, outcome: Outcome) -> Status {
        self.current = outcome.state;
        self.states.push(outcome.state);
        self.status = Status::Finished(outcome);
        self.status
    }

    /// Step until a terminal outcome is reached
    pub fn finish(mut self) -> SimResult<Trajectory> {
        loop {
            if let Status::Finished(outcome) = self.advance()? {
                debug!(kind = ?outcome.kind, t = outcome.time, steps = self.states.len() - 1, "simulation finished");
                return Ok(Trajectory {
                    states: self.states,
                    outcome,
                });
            }
        }
    }
}

/// Run a full trajectory from `initial` until escape, collision or `t_max`
pub fn run(params: &PhysicalParameters, config: &SimulationConfig, initial: State) -> SimResult<Trajectory> {
    Simulation::new(params, config, initial)?.finish()
}
