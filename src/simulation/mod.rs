pub mod states;
pub mod params;
pub mod engine;
pub mod field;
pub mod forces;
pub mod integrator;
pub mod events;
pub mod runner;
pub mod scenario;
