//! Configuration types for loading membrane scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! scenario. A scenario consists of:
//!
//! - [`PhysicalConfig`]     – central mass, membrane and ball properties
//! - [`SimulationSettings`] – step size, horizon, integrator, boundary overrides
//! - [`InitialConfig`]      – initial position and velocity of the ball
//! - [`CalibrationConfig`]  – optional optimizer settings for fitting `T` and `c`
//! - [`ScenarioConfig`]     – top-level wrapper
//!
//! # YAML format
//!
//! ```yaml
//! physical:
//!   central_mass: 0.5       # m_c
//!   central_radius: 0.05    # r_c
//!   membrane_radius: 0.5    # R
//!   tension: 10.0           # T
//!   gravity: 9.81           # g
//!   ball_mass: 0.01         # m_p
//!   drag: 0.003             # c
//!
//! simulation:
//!   dt: 0.001
//!   t_max: 8.0
//!   scheme: "rk4"           # or "euler"
//!
//! initial:
//!   position: [0.49, 0.0]
//!   speed: 0.5              # or `velocity: [vx, vy]`
//!   angle_deg: 45.0         # from the inward radial direction, CCW positive
//! ```
//!
//! The caller owns opening files; this module only parses text or readers.

use std::io::Read;

use serde::Deserialize;

use crate::error::SimResult;
use crate::simulation::integrator::Scheme;

/// Physical constants of the membrane system
#[derive(Deserialize, Debug, Clone)]
pub struct PhysicalConfig {
    pub central_mass: f64,
    pub central_radius: f64,
    pub membrane_radius: f64,
    pub tension: f64,
    pub gravity: f64,
    pub ball_mass: f64,
    #[serde(default)]
    pub drag: f64, // omitted means frictionless
}

/// Numerical settings; every field falls back to the engine defaults
#[derive(Deserialize, Debug, Clone, Default)]
pub struct SimulationSettings {
    pub dt: Option<f64>,
    pub t_max: Option<f64>,
    pub scheme: Option<Scheme>,
    pub escape_radius: Option<f64>,
    pub collision_radius: Option<f64>,
    pub refine_tolerance: Option<f64>,
    pub max_refinements: Option<usize>,
}

/// Initial velocity, either cartesian or as speed plus launch angle
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum VelocityConfig {
    Cartesian { velocity: [f64; 2] },
    Polar { speed: f64, angle_deg: f64 },
}

/// Initial state of the ball
#[derive(Deserialize, Debug, Clone)]
pub struct InitialConfig {
    #[serde(default)]
    pub t: f64,
    pub position: [f64; 2],
    #[serde(flatten)]
    pub velocity: VelocityConfig,
}

/// Optimizer settings for fitting tension and drag
#[derive(Deserialize, Debug, Clone, Default)]
pub struct CalibrationConfig {
    pub max_iterations: Option<usize>,
    pub relative_tolerance: Option<f64>,
    pub patience: Option<usize>,
    pub objective_floor: Option<f64>,
    pub initial_step: Option<f64>,
    pub tension_bounds: Option<[f64; 2]>,
    pub drag_bounds: Option<[f64; 2]>,
}

/// Top-level scenario configuration loaded from YAML
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioConfig {
    pub physical: PhysicalConfig,
    #[serde(default)]
    pub simulation: SimulationSettings,
    pub initial: InitialConfig,
    pub calibration: Option<CalibrationConfig>,
}

impl ScenarioConfig {
    pub fn from_yaml_str(text: &str) -> SimResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> SimResult<Self> {
        Ok(serde_yaml::from_reader(reader)?)
    }
}
