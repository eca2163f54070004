pub mod detectors;
pub mod factory;
pub mod runner;
