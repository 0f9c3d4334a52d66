//! Reference trajectories measured outside the engine.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::simulation::runner::Trajectory;
use crate::simulation::states::{NVec2, State};

/// A single tracked position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSample {
    /// Timestamp in seconds.
    pub t: f64,
    pub x: f64,
    pub y: f64,
}

impl ReferenceSample {
    pub fn new(t: f64, x: f64, y: f64) -> Self {
        Self { t, x, y }
    }

    pub fn position(&self) -> NVec2 {
        NVec2::new(self.x, self.y)
    }
}

/// Time-ordered reference samples, at least two of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceTrajectory {
    samples: Vec<ReferenceSample>,
}

impl ReferenceTrajectory {
    /// Validate and wrap `samples`.
    ///
    /// Fails with [`SimError::EmptyReference`] below two samples and with
    /// [`SimError::InvalidReference`] on non-finite values or timestamps that
    /// are not strictly increasing.
    pub fn new(samples: Vec<ReferenceSample>) -> SimResult<Self> {
        if samples.len() < 2 {
            return Err(SimError::EmptyReference {
                samples: samples.len(),
            });
        }
        if let Some(i) = samples
            .iter()
            .position(|s| !(s.t.is_finite() && s.x.is_finite() && s.y.is_finite()))
        {
            return Err(SimError::reference(format!("sample {i} is not finite")));
        }
        if let Some(i) = samples.windows(2).position(|w| w[1].t <= w[0].t) {
            return Err(SimError::reference(format!(
                "timestamps must be strictly increasing (sample {} at t = {})",
                i + 1,
                samples[i + 1].t
            )));
        }
        Ok(Self { samples })
    }

    /// Sample every `stride`-th state of a simulated trajectory, always
    /// keeping the last one.
    pub fn from_trajectory(trajectory: &Trajectory, stride: usize) -> SimResult<Self> {
        let stride = stride.max(1);
        let last = trajectory.len().saturating_sub(1);
        let samples = trajectory
            .iter()
            .enumerate()
            .filter(|(i, _)| i % stride == 0 || *i == last)
            .map(|(_, s)| ReferenceSample::new(s.t, s.pos.x, s.pos.y))
            .collect();
        Self::new(samples)
    }

    pub fn samples(&self) -> &[ReferenceSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> &ReferenceSample {
        &self.samples[0]
    }

    pub fn last(&self) -> &ReferenceSample {
        &self.samples[self.samples.len() - 1]
    }

    /// Time spanned by the samples.
    pub fn duration(&self) -> f64 {
        self.last().t - self.first().t
    }

    /// Velocity at the first sample from finite differences.
    ///
    /// Uses the second-order one-sided difference on the first three samples
    /// (non-uniform spacing allowed), or a forward difference when only two
    /// exist.
    pub fn estimated_initial_velocity(&self) -> NVec2 {
        let s = &self.samples;
        let (p0, p1) = (s[0].position(), s[1].position());
        let h1 = s[1].t - s[0].t;
        if s.len() < 3 {
            return (p1 - p0) / h1;
        }
        let p2 = s[2].position();
        let h2 = s[2].t - s[1].t;
        // derivative at t0 of the quadratic through the first three samples
        let c0 = -(2.0 * h1 + h2) / (h1 * (h1 + h2));
        let c1 = (h1 + h2) / (h1 * h2);
        let c2 = -h1 / (h2 * (h1 + h2));
        c0 * p0 + c1 * p1 + c2 * p2
    }

    /// Initial state of the reference, with the given or estimated velocity.
    pub fn initial_state(&self, velocity: Option<NVec2>) -> State {
        let first = self.first();
        let vel = velocity.unwrap_or_else(|| self.estimated_initial_velocity());
        State::new(first.t, first.position(), vel)
    }
}
