//! Boundary-crossing detection and localisation
//!
//! After every step the detector compares the radius before and after:
//! - escape: `r_prev < escape <= r_next`
//! - collision: `r_next <= collision < r_prev`, or the path of the step dips
//!   inside the collision radius even though both endpoints stay outside
//!
//! The in-step path is a cubic Hermite curve through both endpoints and their
//! velocities, so a coarse step cannot carry the ball straight through the
//! central mass. A step whose integrator stages reach the forbidden core is
//! also an inward crossing.
//!
//! A crossing is refined by bisection on the sub-step length, re-integrating
//! from the previous state with the shrinking step until the radius is within
//! tolerance of the boundary or the iteration cap is hit. The reported outcome
//! carries the refined time and state, not the coarse endpoint.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::simulation::engine::SimulationConfig;
use crate::simulation::forces::AccelSet;
use crate::simulation::integrator::{advance, Scheme};
use crate::simulation::params::PhysicalParameters;
use crate::simulation::states::{NVec2, State, StepResult};

/// Segments used to trace the Hermite path of one step
const PATH_SEGMENTS: usize = 16;

/// Terminal classification of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeKind {
    Escaped,
    Collided,
    TimedOut,
}

/// Terminal outcome with its time and state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Outcome {
    pub kind: OutcomeKind,
    pub time: f64,
    pub state: State,
}

impl Outcome {
    pub fn new(kind: OutcomeKind, state: State) -> Self {
        Self {
            kind,
            time: state.t,
            state,
        }
    }
}

/// Resolved event boundaries, `r_c / 2 <= collision < escape`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundaries {
    pub collision: f64,
    pub escape: f64,
    pub tolerance: f64, // absolute radius tolerance for refinement
    pub max_refinements: usize,
}

impl Boundaries {
    /// Which boundary, if any, the step `prev -> next` crosses
    pub fn crossing(&self, prev: &State, next: &State) -> Option<(OutcomeKind, f64)> {
        let (r_prev, r_next) = (prev.radius(), next.radius());
        if r_prev > self.collision && (r_next <= self.collision || path_min_radius(prev, next) <= self.collision) {
            Some((OutcomeKind::Collided, self.collision))
        } else if r_prev < self.escape && r_next >= self.escape {
            Some((OutcomeKind::Escaped, self.escape))
        } else {
            None
        }
    }

    /// Classification of a state that already sits on or past a boundary
    pub fn classify(&self, r: f64) -> Option<OutcomeKind> {
        if r <= self.collision {
            Some(OutcomeKind::Collided)
        } else if r >= self.escape {
            Some(OutcomeKind::Escaped)
        } else {
            None
        }
    }
}

/// Position on the cubic Hermite curve through `a` and `b` at fraction `s` of the step
fn hermite(a: &State, b: &State, s: f64) -> NVec2 {
    let h = b.t - a.t;
    let s2 = s * s;
    let s3 = s2 * s;
    let h00 = 1.0 - 3.0 * s2 + 2.0 * s3;
    let h10 = s - 2.0 * s2 + s3;
    let h01 = 3.0 * s2 - 2.0 * s3;
    let h11 = s3 - s2;
    h00 * a.pos + (h10 * h) * a.vel + h01 * b.pos + (h11 * h) * b.vel
}

/// Distance from the origin to the segment `a -> b`
fn segment_min_radius(a: &NVec2, b: &NVec2) -> f64 {
    let d = b - a;
    let len2 = d.norm_squared();
    if len2 == 0.0 {
        return a.norm();
    }
    let s = (-a.dot(&d) / len2).clamp(0.0, 1.0);
    (a + s * d).norm()
}

/// Smallest radius along the Hermite path of the step `a -> b`
fn path_min_radius(a: &State, b: &State) -> f64 {
    let mut last = a.pos;
    let mut min = f64::INFINITY;
    for i in 1..=PATH_SEGMENTS {
        let p = if i == PATH_SEGMENTS {
            b.pos
        } else {
            hermite(a, b, i as f64 / PATH_SEGMENTS as f64)
        };
        min = min.min(segment_min_radius(&last, &p));
        last = p;
    }
    min
}

/// Advance by `h`, mapping a stage that strays into the forbidden core to `None`
pub(crate) fn attempt(forces: &AccelSet, scheme: Scheme, state: &State, h: f64) -> SimResult<Option<StepResult>> {
    match advance(forces, scheme, state, h) {
        Ok(next) => Ok(Some(next)),
        Err(SimError::Domain { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Test the step `prev -> next` for a boundary crossing and localise it
pub fn check(
    params: &PhysicalParameters,
    config: &SimulationConfig,
    prev: &State,
    next: &StepResult,
) -> SimResult<Option<Outcome>> {
    let boundaries = config.boundaries(params)?;
    let forces = AccelSet::for_params(params);
    detect(&forces, config.scheme, &boundaries, prev, next)
}

pub(crate) fn detect(
    forces: &AccelSet,
    scheme: Scheme,
    boundaries: &Boundaries,
    prev: &State,
    next: &StepResult,
) -> SimResult<Option<Outcome>> {
    let Some((kind, boundary)) = boundaries.crossing(prev, &next.state) else {
        return Ok(None);
    };
    let h = next.state.t - prev.t;
    let state = refine(forces, scheme, boundaries, prev, h, Some(next), kind, boundary)?;
    debug!(?kind, t = state.t, r = state.radius(), "boundary crossing refined");
    Ok(Some(Outcome::new(kind, state)))
}

/// Localise the collision of a step of length `h` that could not be taken
/// because its stages reached the forbidden core
pub(crate) fn detect_blocked(
    forces: &AccelSet,
    scheme: Scheme,
    boundaries: &Boundaries,
    prev: &State,
    h: f64,
) -> SimResult<Outcome> {
    let boundary = boundaries.collision;
    let state = refine(forces, scheme, boundaries, prev, h, None, OutcomeKind::Collided, boundary)?;
    debug!(t = state.t, r = state.radius(), "blocked step refined to collision");
    Ok(Outcome::new(OutcomeKind::Collided, state))
}

#[allow(clippy::too_many_arguments)]
fn refine(
    forces: &AccelSet,
    scheme: Scheme,
    boundaries: &Boundaries,
    prev: &State,
    h: f64,
    next: Option<&StepResult>,
    kind: OutcomeKind,
    boundary: f64,
) -> SimResult<State> {
    let tol = boundaries.tolerance;
    let escaping = kind == OutcomeKind::Escaped;

    // `None` is a sub-step blocked by the core, which only happens inward
    let crossed = |step: Option<&StepResult>| match step {
        None => true,
        Some(s) if escaping => s.r >= boundary,
        Some(s) => s.r <= boundary || path_min_radius(prev, &s.state) <= boundary,
    };
    // on the boundary, and for collisions not already through it
    let settled = |s: &StepResult| {
        (s.r - boundary).abs() <= tol && (escaping || path_min_radius(prev, &s.state) >= boundary - tol)
    };

    if let Some(next) = next {
        if settled(next) && (escaping || next.r <= boundary) {
            return Ok(next.state);
        }
    }

    // Bracket: `inside` has not crossed yet, `outside` has
    let (mut h_lo, mut h_hi) = (0.0, h);
    let mut inside = StepResult::from(*prev);
    let mut outside = next.copied();

    for _ in 0..boundaries.max_refinements {
        let h_mid = 0.5 * (h_lo + h_hi);
        let mid = attempt(forces, scheme, prev, h_mid)?;
        if let Some(m) = &mid {
            if settled(m) {
                return Ok(m.state);
            }
        }
        if crossed(mid.as_ref()) {
            h_hi = h_mid;
            if mid.is_some() {
                outside = mid;
            }
        } else if let Some(m) = mid {
            h_lo = h_mid;
            inside = m;
        }
    }

    // Cap reached: interpolate inside the final bracket at the boundary radius
    let Some(outside) = outside else {
        return Ok(inside.state);
    };
    let span = outside.r - inside.r;
    let alpha = if span.abs() > 0.0 {
        ((boundary - inside.r) / span).clamp(0.0, 1.0)
    } else {
        1.0
    };
    Ok(inside.state.lerp(&outside.state, alpha))
}
