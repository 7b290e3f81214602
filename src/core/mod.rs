pub mod catalog;
pub mod coil_performance;
pub mod curves;
pub mod derivation;
pub mod solvers;
pub mod units;
