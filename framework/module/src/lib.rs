#![deny(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error_codes;
pub mod params;
pub mod safety;
pub mod supervisor;

pub use config::EngineConfig;
pub use engine::{ChargeController, EngineEvent};
pub use params::VcuParameters;
pub use safety::{Limits, SafetyEvent, SafetyMonitor};
pub use supervisor::SupervisorSnapshot;
