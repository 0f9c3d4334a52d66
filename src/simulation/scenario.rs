//! Build fully-initialized simulation scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces the runtime bundle
//! `Scenario` containing:
//! - physical parameters (`PhysicalParameters`)
//! - engine settings (`SimulationConfig`)
//! - the initial state of the ball
//! - optional calibration settings (`Calibrator` plus search bounds)
//!
//! Every piece is validated here, so a built scenario is ready to run

use crate::calibration::calibrator::{Calibrator, FitBounds};
use crate::calibration::optimizer::OptimizerConfig;
use crate::configuration::config::{CalibrationConfig, InitialConfig, ScenarioConfig, SimulationSettings, VelocityConfig};
use crate::error::SimResult;
use crate::simulation::engine::SimulationConfig;
use crate::simulation::params::PhysicalParameters;
use crate::simulation::runner::{run, Simulation, Trajectory};
use crate::simulation::states::{NVec2, State};

/// Runtime bundle built from a [`ScenarioConfig`]
#[derive(Debug, Clone)]
pub struct Scenario {
    pub parameters: PhysicalParameters,
    pub config: SimulationConfig,
    pub initial: State,
    pub calibration: Option<(Calibrator, FitBounds)>,
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> SimResult<Self> {
        // Parameters (runtime) from PhysicalConfig
        let p_cfg = cfg.physical;
        let parameters = PhysicalParameters {
            central_mass: p_cfg.central_mass,
            central_radius: p_cfg.central_radius,
            membrane_radius: p_cfg.membrane_radius,
            tension: p_cfg.tension,
            gravity: p_cfg.gravity,
            ball_mass: p_cfg.ball_mass,
            drag: p_cfg.drag,
        };
        parameters.validate()?;

        let config = engine_from(&cfg.simulation);
        config.validate()?;
        config.boundaries(&parameters)?;

        let initial = initial_from(&cfg.initial);

        let calibration = cfg
            .calibration
            .map(|c_cfg| calibration_from(&c_cfg, parameters, config))
            .transpose()?;

        Ok(Self {
            parameters,
            config,
            initial,
            calibration,
        })
    }

    /// Stepper positioned at the initial state
    pub fn simulation(&self) -> SimResult<Simulation> {
        Simulation::new(&self.parameters, &self.config, self.initial)
    }

    /// Run the scenario to its terminal outcome
    pub fn run(&self) -> SimResult<Trajectory> {
        run(&self.parameters, &self.config, self.initial)
    }
}

fn engine_from(s: &SimulationSettings) -> SimulationConfig {
    let defaults = SimulationConfig::default();
    SimulationConfig {
        dt: s.dt.unwrap_or(defaults.dt),
        t_max: s.t_max.unwrap_or(defaults.t_max),
        scheme: s.scheme.unwrap_or(defaults.scheme),
        escape_radius: s.escape_radius,
        collision_radius: s.collision_radius,
        refine_tolerance: s.refine_tolerance.unwrap_or(defaults.refine_tolerance),
        max_refinements: s.max_refinements.unwrap_or(defaults.max_refinements),
    }
}

fn initial_from(i: &InitialConfig) -> State {
    let pos = NVec2::new(i.position[0], i.position[1]);
    match i.velocity {
        VelocityConfig::Cartesian { velocity } => State::new(i.t, pos, NVec2::new(velocity[0], velocity[1])),
        VelocityConfig::Polar { speed, angle_deg } => State::from_speed_angle(i.t, pos, speed, angle_deg),
    }
}

fn calibration_from(
    c: &CalibrationConfig,
    parameters: PhysicalParameters,
    config: SimulationConfig,
) -> SimResult<(Calibrator, FitBounds)> {
    let defaults = OptimizerConfig::default();
    let optimizer = OptimizerConfig {
        max_iterations: c.max_iterations.unwrap_or(defaults.max_iterations),
        relative_tolerance: c.relative_tolerance.unwrap_or(defaults.relative_tolerance),
        patience: c.patience.unwrap_or(defaults.patience),
        objective_floor: c.objective_floor.unwrap_or(defaults.objective_floor),
        initial_step: c.initial_step.unwrap_or(defaults.initial_step),
    };
    optimizer.validate()?;

    let default_bounds = FitBounds::default();
    let bounds = FitBounds {
        tension: c.tension_bounds.map_or(default_bounds.tension, |[lo, hi]| (lo, hi)),
        drag: c.drag_bounds.map_or(default_bounds.drag, |[lo, hi]| (lo, hi)),
    };
    bounds.validate()?;

    Ok((Calibrator::new(parameters, config).with_optimizer(optimizer), bounds))
}
