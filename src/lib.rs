pub mod error;
pub mod simulation;
pub mod calibration;
pub mod configuration;

pub use error::{SimError, SimResult};

pub use simulation::states::{State, StepResult, NVec2};
pub use simulation::params::PhysicalParameters;
pub use simulation::engine::SimulationConfig;
pub use simulation::field::{height, gradient, mechanical_energy};
pub use simulation::forces::{acceleration, Acceleration, AccelSet};
pub use simulation::integrator::{step, Scheme};
pub use simulation::events::{check, Outcome, OutcomeKind};
pub use simulation::runner::{run, Simulation, Status, Trajectory};
pub use simulation::scenario::Scenario;

pub use calibration::reference::{ReferenceSample, ReferenceTrajectory};
pub use calibration::optimizer::OptimizerConfig;
pub use calibration::calibrator::{fit, CalibrationResult, Calibrator, FitBounds, FitParameters};

pub use configuration::config::ScenarioConfig;
