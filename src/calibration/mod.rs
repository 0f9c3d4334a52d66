pub mod reference;
pub mod optimizer;
pub mod calibrator;
