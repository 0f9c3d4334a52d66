//! Bounded Nelder-Mead minimizer for low-dimensional parameter fits.
//!
//! Points outside the box score `+inf` without being evaluated, so the simplex
//! only ever accepts feasible vertices (contractions and shrinks stay inside
//! the convex box).

use tracing::trace;

use crate::error::{SimError, SimResult};

/// Configuration for the optimizer.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Maximum number of simplex iterations.
    pub max_iterations: usize,
    /// Minimum relative improvement of the best value over `patience` iterations.
    pub relative_tolerance: f64,
    /// Window, in iterations, over which the relative improvement is measured.
    pub patience: usize,
    /// Objective value treated as an exact fit.
    pub objective_floor: f64,
    /// Initial simplex offset as a fraction of each bound width.
    pub initial_step: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 400,
            relative_tolerance: 1e-4,
            patience: 10,
            objective_floor: 1e-18,
            initial_step: 0.1,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.max_iterations == 0 || self.patience == 0 {
            return Err(SimError::config("max_iterations and patience must be at least 1"));
        }
        if !(self.relative_tolerance > 0.0 && self.objective_floor >= 0.0) {
            return Err(SimError::config("tolerances must be positive"));
        }
        if !(self.initial_step > 0.0 && self.initial_step <= 1.0) {
            return Err(SimError::config(format!(
                "initial_step must lie in (0, 1], got {}",
                self.initial_step
            )));
        }
        Ok(())
    }
}

/// Result of a minimization.
#[derive(Debug, Clone)]
pub struct Minimum<const N: usize> {
    pub point: [f64; N],
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
    /// Best value after each iteration.
    pub history: Vec<f64>,
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;
const COLLAPSE: f64 = 1e-12;

/// Nelder-Mead simplex search inside an axis-aligned box.
pub struct NelderMead<const N: usize> {
    pub config: OptimizerConfig,
    pub bounds: [(f64, f64); N],
}

impl<const N: usize> NelderMead<N> {
    pub fn new(config: OptimizerConfig, bounds: [(f64, f64); N]) -> Self {
        Self { config, bounds }
    }

    fn feasible(&self, x: &[f64; N]) -> bool {
        x.iter().zip(&self.bounds).all(|(v, (lo, hi))| *v >= *lo && *v <= *hi)
    }

    /// Minimize `objective` starting from `start`, which must be inside the bounds.
    pub fn minimize<F>(&self, start: [f64; N], mut objective: F) -> SimResult<Minimum<N>>
    where
        F: FnMut(&[f64; N]) -> SimResult<f64>,
    {
        self.config.validate()?;
        if !self.feasible(&start) {
            return Err(SimError::config(format!("start point {start:?} lies outside the bounds")));
        }

        let mut eval = |x: &[f64; N]| -> SimResult<f64> {
            if !self.feasible(x) {
                return Ok(f64::INFINITY);
            }
            let v = objective(x)?;
            Ok(if v.is_nan() { f64::INFINITY } else { v })
        };

        // Initial simplex: step each coordinate inward by a fraction of its width
        let mut simplex: Vec<([f64; N], f64)> = Vec::with_capacity(N + 1);
        simplex.push((start, eval(&start)?));
        for i in 0..N {
            let (lo, hi) = self.bounds[i];
            let step = self.config.initial_step * (hi - lo);
            let mut x = start;
            x[i] = if start[i] + step <= hi { start[i] + step } else { start[i] - step };
            simplex.push((x, eval(&x)?));
        }

        let mut history = Vec::with_capacity(self.config.max_iterations);

        for iter in 0..self.config.max_iterations {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
            let worst = simplex[N];

            // Centroid of every vertex but the worst
            let mut centroid = [0.0; N];
            for (x, _) in &simplex[..N] {
                for (c, v) in centroid.iter_mut().zip(x) {
                    *c += v / N as f64;
                }
            }
            let toward = |from: &[f64; N], coef: f64| -> [f64; N] {
                std::array::from_fn(|k| centroid[k] + coef * (from[k] - centroid[k]))
            };

            let reflected = toward(&worst.0, -REFLECT);
            let f_reflected = eval(&reflected)?;

            if f_reflected < simplex[0].1 {
                let expanded = toward(&worst.0, -REFLECT * EXPAND);
                let f_expanded = eval(&expanded)?;
                simplex[N] = if f_expanded < f_reflected {
                    (expanded, f_expanded)
                } else {
                    (reflected, f_reflected)
                };
            } else if f_reflected < simplex[N - 1].1 {
                simplex[N] = (reflected, f_reflected);
            } else {
                // Outside contraction if the reflection beat the worst, inside otherwise
                let (contracted, limit) = if f_reflected < worst.1 {
                    (toward(&reflected, CONTRACT), f_reflected)
                } else {
                    (toward(&worst.0, CONTRACT), worst.1)
                };
                let f_contracted = eval(&contracted)?;
                if f_contracted < limit {
                    simplex[N] = (contracted, f_contracted);
                } else {
                    let best = simplex[0].0;
                    for vertex in simplex.iter_mut().skip(1) {
                        let x: [f64; N] = std::array::from_fn(|k| best[k] + SHRINK * (vertex.0[k] - best[k]));
                        *vertex = (x, eval(&x)?);
                    }
                }
            }

            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
            let best = simplex[0].1;
            history.push(best);
            trace!(iteration = iter, best, "simplex iteration");

            if self.converged(&simplex, &history) {
                return Ok(Minimum {
                    point: simplex[0].0,
                    value: best,
                    iterations: iter + 1,
                    converged: true,
                    history,
                });
            }
        }

        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        Ok(Minimum {
            point: simplex[0].0,
            value: simplex[0].1,
            iterations: self.config.max_iterations,
            converged: false,
            history,
        })
    }

    fn converged(&self, simplex: &[([f64; N], f64)], history: &[f64]) -> bool {
        let best = simplex[0].1;
        if best <= self.config.objective_floor {
            return true;
        }

        let n = history.len();
        if n > self.config.patience {
            let earlier = history[n - 1 - self.config.patience];
            if earlier.is_finite() {
                let improvement = (earlier - best) / earlier.abs().max(f64::MIN_POSITIVE);
                if improvement < self.config.relative_tolerance {
                    return true;
                }
            }
        }

        // Simplex collapsed to a point relative to the bounds
        simplex.iter().skip(1).all(|(x, _)| {
            x.iter()
                .zip(&simplex[0].0)
                .zip(&self.bounds)
                .all(|((a, b), (lo, hi))| (a - b).abs() <= COLLAPSE * (hi - lo).max(b.abs()).max(1.0))
        })
    }
}
